//! Orchestrator configuration.

use std::time::Duration;

use serde::Serialize;

use fleet_select::SelectionPolicy;

use crate::error::{FleetError, FleetResult};

/// Construction parameters for an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetConfig {
    /// Maximum number of registered providers.
    pub capacity: usize,
    pub selection_policy: SelectionPolicy,
    /// Pause between heartbeat sweeps.
    pub heartbeat_interval: Duration,
    /// Admission ceiling per in-service provider. Tunable at runtime.
    pub max_parallel_requests_per_provider: usize,
    /// Bound on each `fetch_value` call. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    /// Bound on each health probe. `None` waits indefinitely.
    pub health_check_timeout: Option<Duration>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            selection_policy: SelectionPolicy::RoundRobin,
            heartbeat_interval: Duration::from_secs(2),
            max_parallel_requests_per_provider: 2,
            fetch_timeout: None,
            health_check_timeout: Some(Duration::from_secs(1)),
        }
    }
}

impl FleetConfig {
    pub fn new(capacity: usize, selection_policy: SelectionPolicy, heartbeat_interval: Duration) -> Self {
        Self {
            capacity,
            selection_policy,
            heartbeat_interval,
            ..Default::default()
        }
    }

    pub fn with_max_parallel_requests_per_provider(mut self, max: usize) -> Self {
        self.max_parallel_requests_per_provider = max;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_health_check_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Set the selection policy by name (`"random"`, `"round-robin"`).
    pub fn with_policy_name(mut self, name: &str) -> FleetResult<Self> {
        self.selection_policy = name.parse::<SelectionPolicy>()?;
        Ok(self)
    }

    /// Check the invariants the orchestrator relies on.
    pub fn validate(&self) -> FleetResult<()> {
        if self.capacity == 0 {
            return Err(FleetError::InvalidConfig("capacity must be greater than zero".into()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(FleetError::InvalidConfig("heartbeat interval must be non-zero".into()));
        }
        if self.max_parallel_requests_per_provider == 0 {
            return Err(FleetError::InvalidConfig(
                "max parallel requests per provider must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
