//! Health-tracked provider wrapper.
//!
//! Counters are atomics so they can move while a provider call is
//! outstanding. No lock is ever held across a provider call.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, warn};

use fleet_core::{Provider, ProviderError, ProviderId, ProviderResult};

use crate::status::{ProbeResult, ProviderSnapshot, ProviderStatus};

/// Consecutive successful checks needed before a provider is in service.
pub const IN_SERVICE_THRESHOLD: u32 = 2;

/// One provider plus its exclusion flag and health/in-flight counters.
pub struct HealthTrackedProvider {
    id: ProviderId,
    provider: Arc<dyn Provider>,
    excluded: AtomicBool,
    consecutive_successes: AtomicU32,
    in_flight: AtomicUsize,
    fetch_timeout: Option<Duration>,
    check_timeout: Option<Duration>,
    last_probe: RwLock<Option<ProbeResult>>,
}

impl HealthTrackedProvider {
    /// Wrap a provider. It starts not excluded with zero successful checks.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            id: provider.id(),
            provider,
            excluded: AtomicBool::new(false),
            consecutive_successes: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            fetch_timeout: None,
            check_timeout: None,
            last_probe: RwLock::new(None),
        }
    }

    /// Bound every `fetch_value` call by `timeout`.
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Bound every health probe by `timeout`.
    pub fn with_check_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn id(&self) -> &ProviderId {
        &self.id
    }

    /// Call the wrapped provider, counting the call as in flight until it
    /// completes, fails, times out, or is dropped.
    pub async fn fetch_value(&self) -> ProviderResult<String> {
        let _in_flight = InFlightGuard::enter(&self.in_flight);

        match self.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.provider.fetch_value()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(provider_id = %self.id, timeout = ?limit, "fetch timed out");
                    Err(ProviderError::Timeout(limit))
                }
            },
            None => self.provider.fetch_value().await,
        }
    }

    /// Probe the provider and apply the outcome to the success counter.
    ///
    /// Excluded providers are not probed; the counter is reset instead.
    pub async fn probe(&self) -> ProbeResult {
        if self.is_excluded() {
            return self.record(ProbeResult::Excluded);
        }

        let outcome = match self.check_timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.health_check())
                .await
                .unwrap_or(Err(ProviderError::Timeout(limit))),
            None => self.provider.health_check().await,
        };

        let result = match outcome {
            Ok(true) => ProbeResult::Healthy,
            Ok(false) => ProbeResult::Unhealthy,
            Err(ProviderError::Timeout(_)) => ProbeResult::TimedOut,
            Err(ProviderError::Failed(reason)) => ProbeResult::Failed(reason),
        };
        self.record(result)
    }

    /// Run one health check; `true` only for a healthy answer.
    pub async fn health_check(&self) -> bool {
        self.probe().await.is_healthy()
    }

    /// Count a check that never produced an answer (for example a probe
    /// task that panicked) as failed.
    pub fn record_failure(&self, reason: impl Into<String>) -> ProbeResult {
        self.record(ProbeResult::Failed(reason.into()))
    }

    /// Apply a probe outcome: healthy increments the streak, anything
    /// else resets it to zero.
    pub(crate) fn record(&self, result: ProbeResult) -> ProbeResult {
        let was_in_service = self.is_in_service();

        if result.is_healthy() {
            let _ = self
                .consecutive_successes
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_add(1)));
        } else {
            self.consecutive_successes.store(0, Ordering::Release);
            match &result {
                ProbeResult::Failed(reason) => {
                    warn!(provider_id = %self.id, %reason, "health probe failed");
                }
                ProbeResult::TimedOut => {
                    warn!(provider_id = %self.id, timeout = ?self.check_timeout, "health probe timed out");
                }
                _ => {}
            }
        }

        if let Ok(mut last) = self.last_probe.write() {
            *last = Some(result.clone());
        }

        let in_service = self.is_in_service();
        if in_service && !was_in_service {
            debug!(provider_id = %self.id, "provider entered service");
        } else if was_in_service && !in_service {
            warn!(provider_id = %self.id, probe = ?result, "provider left service");
        }

        result
    }

    /// Administrator override. Leaves the success counter untouched.
    pub fn set_excluded(&self, excluded: bool) {
        self.excluded.store(excluded, Ordering::Release);
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded.load(Ordering::Acquire)
    }

    pub fn consecutive_successful_checks(&self) -> u32 {
        self.consecutive_successes.load(Ordering::Acquire)
    }

    pub fn in_flight_requests(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Eligible for selection: not excluded and past the check threshold.
    pub fn is_in_service(&self) -> bool {
        !self.is_excluded() && self.consecutive_successful_checks() >= IN_SERVICE_THRESHOLD
    }

    pub fn status(&self) -> ProviderStatus {
        if self.is_excluded() {
            ProviderStatus::Excluded
        } else if self.consecutive_successful_checks() < IN_SERVICE_THRESHOLD {
            ProviderStatus::NoHeartbeat
        } else if self.in_flight_requests() == 0 {
            ProviderStatus::Alive
        } else {
            ProviderStatus::Busy
        }
    }

    pub fn last_probe(&self) -> Option<ProbeResult> {
        self.last_probe.read().ok().and_then(|last| last.clone())
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            id: self.id.clone(),
            status: self.status(),
            excluded: self.is_excluded(),
            consecutive_successful_checks: self.consecutive_successful_checks(),
            in_flight_requests: self.in_flight_requests(),
            last_probe: self.last_probe(),
        }
    }
}

impl std::fmt::Debug for HealthTrackedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthTrackedProvider")
            .field("id", &self.id)
            .field("excluded", &self.is_excluded())
            .field("consecutive_successes", &self.consecutive_successful_checks())
            .field("in_flight", &self.in_flight_requests())
            .finish()
    }
}

/// Increments a counter on creation and decrements it on drop.
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
