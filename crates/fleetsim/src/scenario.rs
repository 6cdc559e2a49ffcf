//! Scenario planning and outcome accounting for simulator runs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use fleet_balancer::{FleetError, FleetResult, Provider};

use crate::providers::{HealthMode, SimulatedProvider};

/// The simulated fleet to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetPlan {
    pub providers: usize,
    /// Providers that never pass a health check.
    pub failing: usize,
    /// Providers that fail `recover_after` checks before turning healthy.
    pub recovering: usize,
    pub recover_after: u32,
    /// Providers whose health endpoint errors out.
    pub erroring: usize,
    pub latency: Duration,
}

impl FleetPlan {
    pub fn validate(&self) -> anyhow::Result<()> {
        let special = self
            .failing
            .saturating_add(self.recovering)
            .saturating_add(self.erroring);
        if special > self.providers {
            anyhow::bail!(
                "{} failing/recovering/erroring providers requested but only {} providers in total",
                special,
                self.providers
            );
        }
        Ok(())
    }

    /// Providers expected to be in service once warm-up is over.
    pub fn eventually_healthy(&self) -> usize {
        self.providers - self.failing - self.erroring
    }

    /// Heartbeats to wait for warm-up: two sweeps plus slack, plus the
    /// failed checks recovering providers go through first.
    pub fn warm_up_rounds(&self) -> u32 {
        let recovery = if self.recovering > 0 { self.recover_after } else { 0 };
        4u32.saturating_add(recovery)
    }

    fn health_for(&self, index: usize) -> HealthMode {
        if index < self.failing {
            HealthMode::Failing
        } else if index < self.failing + self.erroring {
            HealthMode::Erroring
        } else if index < self.failing + self.erroring + self.recovering {
            HealthMode::RecoverAfter(self.recover_after)
        } else {
            HealthMode::Healthy
        }
    }

    /// Build the providers, ids `provider-00`, `provider-01`, ...
    pub fn build(&self) -> Vec<Arc<dyn Provider>> {
        (0..self.providers)
            .map(|i| {
                let provider = SimulatedProvider::new(format!("provider-{i:02}"), self.latency)
                    .with_health(self.health_for(i));
                Arc::new(provider) as Arc<dyn Provider>
            })
            .collect()
    }
}

/// Tally of dispatch outcomes over one run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Successful responses per provider id.
    pub served: BTreeMap<String, usize>,
    pub rejected_capacity: usize,
    pub rejected_no_providers: usize,
    pub provider_failures: usize,
    pub other_errors: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &FleetResult<String>) {
        match outcome {
            Ok(value) => *self.served.entry(value.clone()).or_default() += 1,
            Err(FleetError::ClusterCapacityExceeded { .. }) => self.rejected_capacity += 1,
            Err(FleetError::NoProvidersInService) => self.rejected_no_providers += 1,
            Err(FleetError::Provider(_)) => self.provider_failures += 1,
            Err(_) => self.other_errors += 1,
        }
    }

    pub fn served_total(&self) -> usize {
        self.served.values().sum()
    }

    pub fn total(&self) -> usize {
        self.served_total()
            + self.rejected_capacity
            + self.rejected_no_providers
            + self.provider_failures
            + self.other_errors
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} requests", self.total())?;
        writeln!(f, "  served:              {}", self.served_total())?;
        for (provider, count) in &self.served {
            writeln!(f, "    {provider:<16}{count}")?;
        }
        writeln!(f, "  capacity exceeded:   {}", self.rejected_capacity)?;
        writeln!(f, "  no provider:         {}", self.rejected_no_providers)?;
        writeln!(f, "  provider failures:   {}", self.provider_failures)?;
        write!(f, "  other errors:        {}", self.other_errors)
    }
}

#[cfg(test)]
mod tests {
    use fleet_balancer::ProviderError;

    use super::*;

    fn plan() -> FleetPlan {
        FleetPlan {
            providers: 5,
            failing: 1,
            recovering: 1,
            recover_after: 3,
            erroring: 1,
            latency: Duration::ZERO,
        }
    }

    #[test]
    fn rejects_oversubscribed_plan() {
        let mut plan = plan();
        plan.failing = 4;
        assert!(plan.validate().is_err());
        assert!(self::plan().validate().is_ok());
    }

    #[test]
    fn assigns_health_modes_in_order() {
        let plan = plan();
        let modes: Vec<HealthMode> = (0..plan.providers).map(|i| plan.health_for(i)).collect();
        assert_eq!(
            modes,
            vec![
                HealthMode::Failing,
                HealthMode::Erroring,
                HealthMode::RecoverAfter(3),
                HealthMode::Healthy,
                HealthMode::Healthy,
            ]
        );
        assert_eq!(plan.eventually_healthy(), 3);
    }

    #[test]
    fn warm_up_rounds_cover_recovery() {
        assert_eq!(plan().warm_up_rounds(), 7);

        let mut plan = plan();
        plan.recover_after = u32::MAX;
        assert_eq!(plan.warm_up_rounds(), u32::MAX);

        plan.recovering = 0;
        assert_eq!(plan.warm_up_rounds(), 4);
    }

    #[test]
    fn builds_zero_padded_ids() {
        let ids: Vec<String> = plan().build().iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids[0], "provider-00");
        assert_eq!(ids[4], "provider-04");
    }

    #[test]
    fn summary_counts_each_outcome() {
        let mut summary = RunSummary::default();
        summary.record(&Ok("a".to_string()));
        summary.record(&Ok("a".to_string()));
        summary.record(&Ok("b".to_string()));
        summary.record(&Err(FleetError::ClusterCapacityExceeded { quota: 4 }));
        summary.record(&Err(FleetError::NoProvidersInService));
        summary.record(&Err(FleetError::Provider(ProviderError::failed("boom"))));

        assert_eq!(summary.served.get("a"), Some(&2));
        assert_eq!(summary.served_total(), 3);
        assert_eq!(summary.rejected_capacity, 1);
        assert_eq!(summary.rejected_no_providers, 1);
        assert_eq!(summary.provider_failures, 1);
        assert_eq!(summary.total(), 6);
        assert!(summary.to_string().starts_with("6 requests"));
    }
}
