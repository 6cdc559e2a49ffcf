//! fleetsim: drive a fleet orchestrator with simulated providers.
//!
//! - [`providers`]: `SimulatedProvider` with fixed latency and a scripted
//!   health behaviour
//! - [`scenario`]: which providers to register and how dispatch outcomes
//!   are tallied
//!
//! The `fleetsim` binary wires both to an `Orchestrator` and prints the
//! fleet status while a burst of requests runs.

pub mod providers;
pub mod scenario;

pub use providers::{HealthMode, SimulatedProvider};
pub use scenario::{FleetPlan, RunSummary};
