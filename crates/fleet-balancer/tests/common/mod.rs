//! Shared provider doubles and helpers for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use fleet_balancer::{FleetConfig, Orchestrator, Provider, ProviderError, ProviderId, SelectionPolicy};
use fleet_core::{BoxFuture, ProviderResult};

/// Provider double with switchable health, fetch failure, and an
/// optional gate that holds `fetch_value` until opened.
pub struct TestProvider {
    id: String,
    healthy: AtomicBool,
    fail_fetch: AtomicBool,
    probe_delay: Duration,
    gate: Option<watch::Receiver<bool>>,
    pub fetches: AtomicUsize,
    pub probes: AtomicUsize,
}

impl TestProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            healthy: AtomicBool::new(true),
            fail_fetch: AtomicBool::new(false),
            probe_delay: Duration::ZERO,
            gate: None,
            fetches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn gated(id: impl Into<String>, gate: watch::Receiver<bool>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(id)
        }
    }

    pub fn unhealthy(id: impl Into<String>) -> Self {
        let provider = Self::new(id);
        provider.set_healthy(false);
        provider
    }

    pub fn hanging_probe(id: impl Into<String>, delay: Duration) -> Self {
        Self {
            probe_delay: delay,
            ..Self::new(id)
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }
}

impl Provider for TestProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(self.id.clone())
    }

    fn fetch_value(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let mut gate = gate.clone();
                let _ = gate.wait_for(|open| *open).await;
            }
            if self.fail_fetch.load(Ordering::SeqCst) {
                Err(ProviderError::failed(format!("{} refused", self.id)))
            } else {
                Ok(self.id.clone())
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'_, ProviderResult<bool>> {
        Box::pin(async move {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if !self.probe_delay.is_zero() {
                tokio::time::sleep(self.probe_delay).await;
            }
            Ok(self.healthy.load(Ordering::SeqCst))
        })
    }
}

/// Config whose heartbeat loop never fires during a test; health is
/// driven through `heartbeat_sweep` instead.
pub fn manual_config(capacity: usize, policy: SelectionPolicy) -> FleetConfig {
    FleetConfig::new(capacity, policy, Duration::from_secs(3600))
}

pub fn simple_providers<I, S>(ids: I) -> Vec<Arc<dyn Provider>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter()
        .map(|id| Arc::new(TestProvider::new(id)) as Arc<dyn Provider>)
        .collect()
}

pub fn numbered(range: std::ops::Range<usize>) -> Vec<Arc<dyn Provider>> {
    simple_providers(range.map(|i| i.to_string()))
}

/// Two sweeps: enough for healthy providers to enter service.
pub async fn warm_up(orchestrator: &Orchestrator) {
    orchestrator.heartbeat_sweep().await;
    orchestrator.heartbeat_sweep().await;
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub fn ids(raw: &[&str]) -> Vec<ProviderId> {
    raw.iter().map(|id| ProviderId::from(*id)).collect()
}
