//! fleet-health: per-provider health tracking.
//!
//! Wraps one [`fleet_core::Provider`] in a [`HealthTrackedProvider`] that
//! adds an administrator exclusion flag, a consecutive-success counter,
//! and an in-flight request counter. Status is derived, never stored:
//!
//! ```text
//! excluded                          → Excluded
//! checks < IN_SERVICE_THRESHOLD     → NoHeartbeat
//! checks ≥ threshold, in-flight = 0 → Alive
//! checks ≥ threshold, in-flight > 0 → Busy
//! ```
//!
//! A single failed probe resets the counter, so demotion is immediate
//! while promotion needs `IN_SERVICE_THRESHOLD` good probes in a row.
//! Health is polled by the orchestrator's heartbeat; nothing here runs
//! on its own timer.

pub mod status;
pub mod tracker;

pub use status::{ProbeResult, ProviderSnapshot, ProviderStatus};
pub use tracker::{HealthTrackedProvider, IN_SERVICE_THRESHOLD};
