//! fleet-core: shared types for the fleet load balancer.
//!
//! Defines the contract every backend provider implements and the
//! identifier type the rest of the workspace keys on:
//!
//! - [`ProviderId`]: opaque, totally ordered provider identifier
//! - [`Provider`]: `id()` / `fetch_value()` / `health_check()`
//! - [`ProviderError`]: failure or timeout reported by a provider call
//!
//! Providers are in-process abstractions. Their futures are boxed so
//! they can be stored as `Arc<dyn Provider>` inside the registry.

pub mod error;
pub mod provider;
pub mod types;

pub use error::{ProviderError, ProviderResult};
pub use provider::{BoxFuture, Provider};
pub use types::ProviderId;
