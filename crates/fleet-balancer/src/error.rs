//! Orchestrator error types.

use thiserror::Error;

use fleet_core::{ProviderError, ProviderId};
use fleet_select::SelectError;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FleetError {
    #[error("invalid selection policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(ProviderId),

    #[error("selected provider vanished from the registry: {0}")]
    ProviderVanished(ProviderId),

    #[error("no providers in service")]
    NoProvidersInService,

    #[error("cluster capacity exceeded: at most {quota} concurrent requests admitted")]
    ClusterCapacityExceeded { quota: usize },

    #[error("no tokio runtime available for the heartbeat loop")]
    NoRuntime,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<SelectError> for FleetError {
    fn from(err: SelectError) -> Self {
        match err {
            SelectError::InvalidPolicy(name) => Self::InvalidPolicy(name),
            SelectError::EmptyCandidates => Self::NoProvidersInService,
        }
    }
}

pub type FleetResult<T> = Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidates_surface_as_no_providers() {
        assert_eq!(FleetError::from(SelectError::EmptyCandidates), FleetError::NoProvidersInService);
    }

    #[test]
    fn provider_errors_pass_through_unchanged() {
        let err = FleetError::from(ProviderError::failed("boom"));
        assert_eq!(err.to_string(), "provider failed: boom");
    }
}
