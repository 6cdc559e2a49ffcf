//! fleet-balancer: the fleet orchestrator.
//!
//! Ties provider registration, candidate selection, admission control,
//! and periodic health checking together.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   ├── registry: DashMap<ProviderId, Arc<HealthTrackedProvider>>
//!   ├── selection lock ── SelectionStrategy<ProviderId> (in-service ids)
//!   ├── admission counters (atomics)
//!   │   concurrent_requests ≤ in_service × max_parallel_requests_per_provider
//!   └── heartbeat task
//!       sleep(interval) → probe all (fan-out, join all) → refresh membership
//! ```
//!
//! # Dispatch
//!
//! ```text
//! lock → in_service == 0 ? NoProvidersInService
//!      → select id → look up wrapper
//!      → concurrent += 1 → over quota ? (concurrent -= 1, ClusterCapacityExceeded)
//! unlock → wrapper.fetch_value() → concurrent -= 1
//! ```
//!
//! Provider failures during dispatch propagate to the caller unchanged.
//! Failures during health checks only reset that provider's streak.

pub mod config;
pub mod error;
mod heartbeat;
pub mod orchestrator;
pub mod status;

pub use config::FleetConfig;
pub use error::{FleetError, FleetResult};
pub use orchestrator::{Orchestrator, SweepSummary};
pub use status::FleetStatus;

pub use fleet_core::{Provider, ProviderError, ProviderId};
pub use fleet_health::{ProbeResult, ProviderSnapshot, ProviderStatus};
pub use fleet_select::SelectionPolicy;
