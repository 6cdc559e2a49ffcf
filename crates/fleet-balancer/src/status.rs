//! Read-only fleet status snapshot.

use std::fmt;

use serde::Serialize;

use fleet_health::ProviderSnapshot;
use fleet_select::SelectionPolicy;

/// Counters and per-provider state captured at one instant.
///
/// `Display` prints a one-line summary; the alternate form (`{:#}`)
/// adds one line per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetStatus {
    pub capacity: usize,
    pub selection_policy: SelectionPolicy,
    pub total_providers: usize,
    pub providers_in_service: usize,
    pub concurrent_requests: usize,
    pub max_parallel_requests_per_provider: usize,
    /// Sorted by provider id.
    pub providers: Vec<ProviderSnapshot>,
}

impl FleetStatus {
    /// Admission ceiling implied by the captured counters.
    pub fn request_quota(&self) -> usize {
        self.providers_in_service
            .saturating_mul(self.max_parallel_requests_per_provider)
    }
}

impl fmt::Display for FleetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "providers {}/{} in service (capacity {}), requests {}/{} ({})",
            self.providers_in_service,
            self.total_providers,
            self.capacity,
            self.concurrent_requests,
            self.request_quota(),
            self.selection_policy,
        )?;
        if f.alternate() {
            for provider in &self.providers {
                write!(f, "\n  {provider}")?;
            }
        }
        Ok(())
    }
}
