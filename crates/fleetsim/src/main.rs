//! fleetsim: fleet load-balancer simulator.
//!
//! Registers simulated providers, waits for them to pass their warm-up
//! health checks, then fires a burst of requests and reports how each one
//! was handled.
//!
//! # Usage
//!
//! ```text
//! fleetsim run --providers 5 --failing 1 --recovering 1 --requests 40
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use tracing::{info, warn};

use fleet_balancer::{FleetConfig, FleetResult, FleetStatus, Orchestrator, SelectionPolicy};
use fleetsim::{FleetPlan, RunSummary};

#[derive(Parser)]
#[command(name = "fleetsim", about = "Fleet load-balancer simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulated fleet and fire a burst of requests at it.
    Run {
        /// Maximum number of registered providers.
        #[arg(long, default_value = "10")]
        capacity: usize,

        /// Selection policy: random or round-robin.
        #[arg(long, default_value = "round-robin")]
        policy: SelectionPolicy,

        /// Heartbeat interval in milliseconds.
        #[arg(long, default_value = "200")]
        heartbeat_ms: u64,

        /// Number of providers to register.
        #[arg(long, default_value = "5")]
        providers: usize,

        /// How many of them never pass a health check.
        #[arg(long, default_value = "0")]
        failing: usize,

        /// How many of them recover after `--recover-after` failed checks.
        #[arg(long, default_value = "0")]
        recovering: usize,

        #[arg(long, default_value = "3")]
        recover_after: u32,

        /// How many of them error out on health checks.
        #[arg(long, default_value = "0")]
        erroring: usize,

        /// Number of requests to dispatch.
        #[arg(long, default_value = "20")]
        requests: usize,

        /// Pause between request launches in milliseconds.
        #[arg(long, default_value = "0")]
        stagger_ms: u64,

        /// Simulated provider latency in milliseconds.
        #[arg(long, default_value = "250")]
        latency_ms: u64,

        /// Admission ceiling per in-service provider.
        #[arg(long, default_value = "2")]
        max_parallel: usize,

        /// Per-request timeout in milliseconds.
        #[arg(long)]
        fetch_timeout_ms: Option<u64>,

        /// Status print interval in milliseconds.
        #[arg(long, default_value = "500")]
        status_interval_ms: u64,

        /// Print status and summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

struct RunArgs {
    config: FleetConfig,
    plan: FleetPlan,
    requests: usize,
    stagger: Duration,
    status_interval: Duration,
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,fleetsim=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            capacity,
            policy,
            heartbeat_ms,
            providers,
            failing,
            recovering,
            recover_after,
            erroring,
            requests,
            stagger_ms,
            latency_ms,
            max_parallel,
            fetch_timeout_ms,
            status_interval_ms,
            json,
        } => {
            let config = FleetConfig::new(capacity, policy, Duration::from_millis(heartbeat_ms))
                .with_max_parallel_requests_per_provider(max_parallel)
                .with_fetch_timeout(fetch_timeout_ms.map(Duration::from_millis));
            let plan = FleetPlan {
                providers,
                failing,
                recovering,
                recover_after,
                erroring,
                latency: Duration::from_millis(latency_ms),
            };
            run(RunArgs {
                config,
                plan,
                requests,
                stagger: Duration::from_millis(stagger_ms),
                status_interval: Duration::from_millis(status_interval_ms.max(1)),
                json,
            })
            .await
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    args.plan.validate()?;
    let heartbeat = args.config.heartbeat_interval;

    let orchestrator = Arc::new(Orchestrator::new(args.config)?);
    let registered = orchestrator.register(args.plan.build()).await;
    info!(registered, requested = args.plan.providers, "providers registered");

    warm_up(&orchestrator, &args.plan, heartbeat).await;
    print_status(&orchestrator.status(), args.json)?;

    let started = Instant::now();
    let mut tasks = Vec::with_capacity(args.requests);
    for _ in 0..args.requests {
        let orchestrator = Arc::clone(&orchestrator);
        tasks.push(tokio::spawn(async move { orchestrator.dispatch().await }));
        if !args.stagger.is_zero() {
            tokio::time::sleep(args.stagger).await;
        }
    }

    let all = join_all(tasks);
    tokio::pin!(all);
    let mut ticker = tokio::time::interval(args.status_interval);
    ticker.tick().await;

    let joined = loop {
        tokio::select! {
            joined = &mut all => break joined,
            _ = ticker.tick() => print_status(&orchestrator.status(), args.json)?,
        }
    };

    let mut summary = RunSummary::default();
    for outcome in joined {
        let outcome: FleetResult<String> = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "dispatch task failed");
                summary.other_errors += 1;
                continue;
            }
        };
        summary.record(&outcome);
    }
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "all requests finished");

    orchestrator.shutdown();
    print_status(&orchestrator.status(), args.json)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}

/// Wait until the expected providers are in service, or give up after a
/// bounded number of heartbeats.
async fn warm_up(orchestrator: &Orchestrator, plan: &FleetPlan, heartbeat: Duration) {
    let expected = plan.eventually_healthy().min(orchestrator.total_providers_count());
    let budget = heartbeat.saturating_mul(plan.warm_up_rounds());
    let started = Instant::now();

    while orchestrator.providers_in_service_count() < expected {
        if started.elapsed() >= budget {
            warn!(
                in_service = orchestrator.providers_in_service_count(),
                expected, "warm-up incomplete, dispatching anyway"
            );
            return;
        }
        tokio::time::sleep(heartbeat / 4).await;
    }
    info!(in_service = expected, "fleet warmed up");
}

fn print_status(status: &FleetStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(status)?);
    } else {
        println!("{status:#}");
    }
    Ok(())
}
