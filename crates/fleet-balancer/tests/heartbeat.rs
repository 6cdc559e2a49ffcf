//! Heartbeat sweeps and the background health loop.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use fleet_balancer::{FleetConfig, Orchestrator, ProbeResult, Provider, ProviderStatus, SelectionPolicy};

use common::*;

#[tokio::test]
async fn failed_check_leaves_service_after_one_sweep() {
    let orchestrator = Orchestrator::new(manual_config(3, SelectionPolicy::RoundRobin)).unwrap();
    let flaky = Arc::new(TestProvider::new("b"));
    let mut providers = simple_providers(["a", "c"]);
    providers.push(flaky.clone());
    orchestrator.register(providers).await;
    warm_up(&orchestrator).await;
    assert_eq!(orchestrator.providers_in_service_count(), 3);

    flaky.set_healthy(false);
    let summary = orchestrator.heartbeat_sweep().await;

    assert_eq!(summary.healthy, 2);
    assert_eq!(summary.in_service, 2);
    assert_eq!(orchestrator.candidates().await, ids(&["a", "c"]));
    let snapshot = orchestrator.provider_status("b").unwrap();
    assert_eq!(snapshot.status, ProviderStatus::NoHeartbeat);
    assert_eq!(snapshot.last_probe, Some(ProbeResult::Unhealthy));
}

#[tokio::test]
async fn recovery_requires_two_consecutive_checks() {
    let orchestrator = Orchestrator::new(manual_config(2, SelectionPolicy::Random)).unwrap();
    let provider = Arc::new(TestProvider::unhealthy("a"));
    orchestrator.register([provider.clone() as Arc<dyn Provider>]).await;

    warm_up(&orchestrator).await;
    assert_eq!(orchestrator.providers_in_service_count(), 0);

    provider.set_healthy(true);
    orchestrator.heartbeat_sweep().await;
    assert_eq!(orchestrator.provider_status("a").unwrap().consecutive_successful_checks, 1);
    assert_eq!(orchestrator.providers_in_service_count(), 0);

    orchestrator.heartbeat_sweep().await;
    assert_eq!(orchestrator.providers_in_service_count(), 1);
    assert_eq!(orchestrator.dispatch().await, Ok("a".to_string()));
}

#[tokio::test]
async fn interrupted_streak_starts_over() {
    let orchestrator = Orchestrator::new(manual_config(1, SelectionPolicy::RoundRobin)).unwrap();
    let provider = Arc::new(TestProvider::new("a"));
    orchestrator.register([provider.clone() as Arc<dyn Provider>]).await;

    orchestrator.heartbeat_sweep().await;
    provider.set_healthy(false);
    orchestrator.heartbeat_sweep().await;
    provider.set_healthy(true);
    orchestrator.heartbeat_sweep().await;

    assert_eq!(orchestrator.provider_status("a").unwrap().consecutive_successful_checks, 1);
    assert_eq!(orchestrator.providers_in_service_count(), 0);
}

#[tokio::test]
async fn background_loop_tracks_health() {
    let config = FleetConfig::new(3, SelectionPolicy::RoundRobin, Duration::from_millis(30));
    let orchestrator = Orchestrator::new(config).unwrap();
    let flaky = Arc::new(TestProvider::new("b"));
    let mut providers = simple_providers(["a"]);
    providers.push(flaky.clone());
    orchestrator.register(providers).await;

    assert!(
        wait_until(Duration::from_secs(3), || orchestrator.providers_in_service_count() == 2).await,
        "providers never entered service"
    );

    flaky.set_healthy(false);
    assert!(
        wait_until(Duration::from_secs(3), || orchestrator.providers_in_service_count() == 1).await,
        "unhealthy provider never left service"
    );
    assert_eq!(orchestrator.candidates().await, ids(&["a"]));

    orchestrator.shutdown();
}

#[tokio::test]
async fn hanging_probe_does_not_stall_sweep() {
    let config = manual_config(3, SelectionPolicy::RoundRobin).with_health_check_timeout(Some(Duration::from_millis(50)));
    let orchestrator = Orchestrator::new(config).unwrap();
    let mut providers = simple_providers(["a", "b"]);
    providers.push(Arc::new(TestProvider::hanging_probe("slow", Duration::from_secs(30))));
    orchestrator.register(providers).await;

    let started = Instant::now();
    orchestrator.heartbeat_sweep().await;
    let summary = orchestrator.heartbeat_sweep().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(summary.checked, 3);
    assert_eq!(summary.in_service, 2);
    assert_eq!(
        orchestrator.provider_status("slow").unwrap().last_probe,
        Some(ProbeResult::TimedOut)
    );
}

#[tokio::test]
async fn sweep_skips_probing_excluded_providers() {
    let orchestrator = Orchestrator::new(manual_config(2, SelectionPolicy::RoundRobin)).unwrap();
    let provider = Arc::new(TestProvider::new("a"));
    orchestrator.register([provider.clone() as Arc<dyn Provider>]).await;
    orchestrator.set_excluded("a", true).await.unwrap();

    let summary = orchestrator.heartbeat_sweep().await;

    assert_eq!(summary.checked, 1);
    assert_eq!(summary.healthy, 0);
    assert_eq!(provider.probes.load(Ordering::SeqCst), 0);
    assert_eq!(
        orchestrator.provider_status("a").unwrap().last_probe,
        Some(ProbeResult::Excluded)
    );
}

#[tokio::test]
async fn shutdown_freezes_health_state() {
    let config = FleetConfig::new(1, SelectionPolicy::RoundRobin, Duration::from_millis(20));
    let orchestrator = Orchestrator::new(config).unwrap();
    let provider = Arc::new(TestProvider::new("a"));
    orchestrator.register([provider.clone() as Arc<dyn Provider>]).await;

    orchestrator.shutdown();
    // Let any sweep that was already running finish.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let probes = provider.probes.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(provider.probes.load(Ordering::SeqCst), probes);
}
