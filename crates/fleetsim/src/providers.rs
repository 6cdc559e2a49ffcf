//! Simulated providers for driving an orchestrator without real backends.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use fleet_core::{BoxFuture, Provider, ProviderError, ProviderId, ProviderResult};

/// How a simulated provider answers health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthMode {
    /// Always healthy.
    Healthy,
    /// Always answers unhealthy.
    Failing,
    /// Unhealthy for the first `n` checks, healthy afterwards.
    RecoverAfter(u32),
    /// The check itself fails with an error.
    Erroring,
}

impl fmt::Display for HealthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Failing => f.write_str("failing"),
            Self::RecoverAfter(n) => write!(f, "recover-after:{n}"),
            Self::Erroring => f.write_str("erroring"),
        }
    }
}

impl FromStr for HealthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "healthy" => Ok(Self::Healthy),
            "failing" => Ok(Self::Failing),
            "erroring" => Ok(Self::Erroring),
            other => match other.strip_prefix("recover-after:") {
                Some(n) => n
                    .parse()
                    .map(Self::RecoverAfter)
                    .map_err(|e| format!("invalid recovery count '{n}': {e}")),
                None => Err(format!("unknown health mode '{s}'")),
            },
        }
    }
}

/// A provider that answers with its own id after a fixed latency.
pub struct SimulatedProvider {
    id: ProviderId,
    latency: Duration,
    health: HealthMode,
    fail_fetch: bool,
    checks: AtomicU32,
    fetches: AtomicU64,
}

impl SimulatedProvider {
    pub fn new(id: impl Into<ProviderId>, latency: Duration) -> Self {
        Self {
            id: id.into(),
            latency,
            health: HealthMode::Healthy,
            fail_fetch: false,
            checks: AtomicU32::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn with_health(mut self, health: HealthMode) -> Self {
        self.health = health;
        self
    }

    /// Make every fetch fail after the usual latency.
    pub fn with_failing_fetch(mut self, fail: bool) -> Self {
        self.fail_fetch = fail;
        self
    }

    pub fn health_mode(&self) -> HealthMode {
        self.health
    }

    /// Health checks answered so far.
    pub fn checks(&self) -> u32 {
        self.checks.load(Ordering::Relaxed)
    }

    /// Fetches started so far.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Provider for SimulatedProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn fetch_value(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.fail_fetch {
                return Err(ProviderError::failed(format!("{} rejected the request", self.id)));
            }
            Ok(self.id.to_string())
        })
    }

    fn health_check(&self) -> BoxFuture<'_, ProviderResult<bool>> {
        Box::pin(async move {
            let previous = self.checks.fetch_add(1, Ordering::Relaxed);
            match self.health {
                HealthMode::Healthy => Ok(true),
                HealthMode::Failing => Ok(false),
                HealthMode::RecoverAfter(n) => Ok(previous >= n),
                HealthMode::Erroring => Err(ProviderError::failed("health endpoint unavailable")),
            }
        })
    }
}

impl fmt::Debug for SimulatedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedProvider")
            .field("id", &self.id)
            .field("latency", &self.latency)
            .field("health", &self.health)
            .field("fail_fetch", &self.fail_fetch)
            .finish()
    }
}
