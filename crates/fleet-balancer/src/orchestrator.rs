//! Orchestrator: registry, selection, admission control.
//!
//! The `Orchestrator`:
//! - Owns every `HealthTrackedProvider`, keyed by provider id
//! - Keeps the selection strategy's candidate set equal to the in-service
//!   subset of the registry
//! - Admits at most `in_service * max_parallel_requests_per_provider`
//!   concurrent dispatches, rejecting the rest immediately
//! - Runs a heartbeat loop that probes every provider each interval
//!
//! One selection lock serializes registration, exclusion changes,
//! membership refresh, and candidate selection. Provider calls are made
//! after the lock is released.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use fleet_core::{Provider, ProviderId};
use fleet_health::{HealthTrackedProvider, ProviderSnapshot};
use fleet_select::{SelectionPolicy, SelectionStrategy};

use crate::config::FleetConfig;
use crate::error::{FleetError, FleetResult};
use crate::heartbeat::run_heartbeat_loop;
use crate::status::FleetStatus;

/// Outcome of one heartbeat sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Providers probed in this sweep.
    pub checked: usize,
    /// Probes that came back healthy.
    pub healthy: usize,
    /// Providers in service after the membership refresh.
    pub in_service: usize,
}

/// State shared between the orchestrator handle and its heartbeat task.
pub(crate) struct Fleet {
    config: FleetConfig,
    registry: DashMap<ProviderId, Arc<HealthTrackedProvider>>,
    /// The selection lock. Only path to the strategy.
    selector: Mutex<SelectionStrategy<ProviderId>>,
    concurrent_requests: AtomicUsize,
    providers_in_service: AtomicUsize,
    max_parallel_per_provider: AtomicUsize,
}

impl Fleet {
    fn new(config: FleetConfig) -> Self {
        let selector = SelectionStrategy::new(config.selection_policy, Vec::new());
        Self {
            max_parallel_per_provider: AtomicUsize::new(config.max_parallel_requests_per_provider),
            config,
            registry: DashMap::new(),
            selector: Mutex::new(selector),
            concurrent_requests: AtomicUsize::new(0),
            providers_in_service: AtomicUsize::new(0),
        }
    }

    /// Recompute the candidate set and in-service count from the registry.
    ///
    /// Takes the strategy by `&mut` so it can only run under the selection lock.
    fn refresh_membership(&self, selector: &mut SelectionStrategy<ProviderId>) -> usize {
        let ids: Vec<ProviderId> = self
            .registry
            .iter()
            .filter(|entry| entry.value().is_in_service())
            .map(|entry| entry.key().clone())
            .collect();

        selector.update_values(ids);
        let in_service = selector.size();
        self.providers_in_service.store(in_service, Ordering::Release);
        in_service
    }

    /// Probe every registered provider concurrently, then refresh membership.
    pub(crate) async fn sweep(&self) -> SweepSummary {
        let started = Instant::now();
        let wrappers: Vec<Arc<HealthTrackedProvider>> =
            self.registry.iter().map(|entry| Arc::clone(entry.value())).collect();

        // One task per probe: a hung provider only holds up its own slot,
        // and a panicking one cannot take the sweep down with it.
        let probes = wrappers.iter().map(|wrapper| {
            let wrapper = Arc::clone(wrapper);
            tokio::spawn(async move { wrapper.probe().await })
        });
        let results = join_all(probes).await;

        let mut healthy = 0;
        for (wrapper, joined) in wrappers.iter().zip(results) {
            match joined {
                Ok(result) if result.is_healthy() => healthy += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(provider_id = %wrapper.id(), error = %e, "health probe task aborted");
                    wrapper.record_failure(format!("probe task aborted: {e}"));
                }
            }
        }

        let in_service = {
            let mut selector = self.selector.lock().await;
            self.refresh_membership(&mut selector)
        };

        let summary = SweepSummary {
            checked: wrappers.len(),
            healthy,
            in_service,
        };
        debug!(
            checked = summary.checked,
            healthy = summary.healthy,
            in_service = summary.in_service,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "heartbeat sweep completed"
        );
        summary
    }

    fn wrap(&self, provider: Arc<dyn Provider>) -> Arc<HealthTrackedProvider> {
        Arc::new(
            HealthTrackedProvider::new(provider)
                .with_fetch_timeout(self.config.fetch_timeout)
                .with_check_timeout(self.config.health_check_timeout),
        )
    }
}

/// Releases one admission slot on drop.
struct AdmissionSlot<'a> {
    counter: &'a AtomicUsize,
    /// Concurrent request count including this slot.
    count: usize,
}

impl<'a> AdmissionSlot<'a> {
    fn acquire(counter: &'a AtomicUsize) -> Self {
        let count = counter.fetch_add(1, Ordering::AcqRel) + 1;
        Self { counter, count }
    }
}

impl Drop for AdmissionSlot<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Load-balancing fleet manager.
///
/// Must be created inside a Tokio runtime. The heartbeat task is aborted
/// when the orchestrator is dropped.
pub struct Orchestrator {
    fleet: Arc<Fleet>,
    heartbeat: JoinHandle<()>,
}

impl Orchestrator {
    /// Validate `config`, build an empty fleet, and start the heartbeat loop.
    pub fn new(config: FleetConfig) -> FleetResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FleetError::NoRuntime)?;

        let interval = config.heartbeat_interval;
        info!(
            capacity = config.capacity,
            policy = %config.selection_policy,
            heartbeat_interval = ?interval,
            "orchestrator starting"
        );

        let fleet = Arc::new(Fleet::new(config));
        let heartbeat = runtime.spawn(run_heartbeat_loop(Arc::clone(&fleet), interval));

        Ok(Self { fleet, heartbeat })
    }

    /// Register providers, up to the remaining capacity.
    ///
    /// A provider whose id is already registered replaces the existing
    /// wrapper (health counters start over) and does not use capacity.
    /// New providers past the capacity are dropped silently. Returns the
    /// number of providers admitted, replacements included.
    pub async fn register<I>(&self, providers: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Provider>>,
    {
        let mut selector = self.fleet.selector.lock().await;

        let mut room = self.fleet.config.capacity.saturating_sub(self.fleet.registry.len());
        let mut admitted = 0;
        let mut discarded = 0;

        for provider in providers {
            let id = provider.id();
            let replacing = self.fleet.registry.contains_key(&id);
            if !replacing {
                if room == 0 {
                    discarded += 1;
                    continue;
                }
                room -= 1;
            }

            self.fleet.registry.insert(id.clone(), self.fleet.wrap(provider));
            admitted += 1;
            if replacing {
                info!(provider_id = %id, "provider replaced");
            } else {
                info!(provider_id = %id, "provider registered");
            }
        }

        if discarded > 0 {
            warn!(
                discarded,
                capacity = self.fleet.config.capacity,
                "registry full, providers discarded"
            );
        }

        self.fleet.refresh_membership(&mut selector);
        admitted
    }

    /// Exclude or re-include a provider and refresh membership at once.
    pub async fn set_excluded(&self, id: &str, excluded: bool) -> FleetResult<()> {
        let mut selector = self.fleet.selector.lock().await;

        let wrapper = self.tracked(id)?;
        wrapper.set_excluded(excluded);
        info!(provider_id = %id, excluded, "provider exclusion changed");

        self.fleet.refresh_membership(&mut selector);
        Ok(())
    }

    pub fn is_excluded(&self, id: &str) -> FleetResult<bool> {
        Ok(self.tracked(id)?.is_excluded())
    }

    /// Route one request to an in-service provider.
    ///
    /// Selection and admission happen under the selection lock; the
    /// provider call does not. Admission increments first and rolls back
    /// if the ceiling is exceeded, so overload fails fast instead of
    /// queueing.
    pub async fn dispatch(&self) -> FleetResult<String> {
        let (wrapper, _slot) = {
            let mut selector = self.fleet.selector.lock().await;

            let in_service = self.fleet.providers_in_service.load(Ordering::Acquire);
            if in_service == 0 {
                return Err(FleetError::NoProvidersInService);
            }

            let id = selector.select()?;
            let wrapper = self
                .fleet
                .registry
                .get(&id)
                .map(|entry| Arc::clone(entry.value()))
                .ok_or_else(|| {
                    error!(provider_id = %id, "selected provider missing from registry");
                    FleetError::ProviderVanished(id.clone())
                })?;

            let slot = AdmissionSlot::acquire(&self.fleet.concurrent_requests);
            let quota = in_service.saturating_mul(self.max_parallel_requests_per_provider());
            if slot.count > quota {
                warn!(quota, requested = slot.count, "cluster capacity exceeded");
                return Err(FleetError::ClusterCapacityExceeded { quota });
            }

            debug!(provider_id = %id, concurrent = slot.count, quota, "request admitted");
            (wrapper, slot)
        };

        Ok(wrapper.fetch_value().await?)
    }

    /// Run one heartbeat sweep now, independent of the background loop.
    pub async fn heartbeat_sweep(&self) -> SweepSummary {
        self.fleet.sweep().await
    }

    /// Stop the heartbeat loop. Health state stops changing afterwards.
    pub fn shutdown(&self) {
        if !self.heartbeat.is_finished() {
            self.heartbeat.abort();
            info!("heartbeat loop stopped");
        }
    }

    pub fn capacity(&self) -> usize {
        self.fleet.config.capacity
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        self.fleet.config.selection_policy
    }

    pub fn config(&self) -> &FleetConfig {
        &self.fleet.config
    }

    pub fn total_providers_count(&self) -> usize {
        self.fleet.registry.len()
    }

    pub fn providers_in_service_count(&self) -> usize {
        self.fleet.providers_in_service.load(Ordering::Acquire)
    }

    pub fn concurrent_request_count(&self) -> usize {
        self.fleet.concurrent_requests.load(Ordering::Acquire)
    }

    pub fn max_parallel_requests_per_provider(&self) -> usize {
        self.fleet.max_parallel_per_provider.load(Ordering::Acquire)
    }

    /// Change the per-provider admission ceiling. Applies to the next dispatch.
    pub fn set_max_parallel_requests_per_provider(&self, max: usize) -> FleetResult<()> {
        if max == 0 {
            return Err(FleetError::InvalidConfig(
                "max parallel requests per provider must be at least 1".into(),
            ));
        }
        self.fleet.max_parallel_per_provider.store(max, Ordering::Release);
        info!(max, "max parallel requests per provider updated");
        Ok(())
    }

    /// Current candidate set, in selection order.
    pub async fn candidates(&self) -> Vec<ProviderId> {
        self.fleet.selector.lock().await.values().to_vec()
    }

    pub fn provider_status(&self, id: &str) -> FleetResult<ProviderSnapshot> {
        Ok(self.tracked(id)?.snapshot())
    }

    /// Snapshot of counters and every provider's state.
    pub fn status(&self) -> FleetStatus {
        let mut providers: Vec<ProviderSnapshot> = self
            .fleet
            .registry
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        providers.sort_by(|a, b| a.id.cmp(&b.id));

        FleetStatus {
            capacity: self.capacity(),
            selection_policy: self.selection_policy(),
            total_providers: providers.len(),
            providers_in_service: self.providers_in_service_count(),
            concurrent_requests: self.concurrent_request_count(),
            max_parallel_requests_per_provider: self.max_parallel_requests_per_provider(),
            providers,
        }
    }

    fn tracked(&self, id: &str) -> FleetResult<Arc<HealthTrackedProvider>> {
        self.fleet
            .registry
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| FleetError::UnknownProvider(ProviderId::from(id)))
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}
