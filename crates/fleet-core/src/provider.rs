//! The provider contract.
//!
//! A provider is a unit of work execution: it produces a value on request
//! and answers health probes. The balancer only ever holds providers
//! behind `Arc<dyn Provider>` and never mutates them.

use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderResult;
use crate::types::ProviderId;

/// Boxed, sendable future returned by provider calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A backend service provider.
pub trait Provider: Send + Sync {
    /// Stable identifier, unique within one orchestrator.
    fn id(&self) -> ProviderId;

    /// Produce one value, or fail.
    fn fetch_value(&self) -> BoxFuture<'_, ProviderResult<String>>;

    /// Report whether the provider can take traffic.
    ///
    /// `Ok(false)` and `Err(_)` are both treated as a failed check.
    fn health_check(&self) -> BoxFuture<'_, ProviderResult<bool>>;
}
