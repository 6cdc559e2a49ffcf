//! Derived provider status and probe outcomes.

use std::fmt;

use serde::Serialize;

use fleet_core::ProviderId;

/// Discrete status derived from a tracked provider's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Manually excluded by an administrator.
    Excluded,
    /// Not enough consecutive successful checks yet.
    NoHeartbeat,
    /// In service with no outstanding requests.
    Alive,
    /// In service and serving at least one request.
    Busy,
}

impl ProviderStatus {
    /// Whether a provider in this status may be selected.
    pub fn is_in_service(self) -> bool {
        matches!(self, Self::Alive | Self::Busy)
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excluded => "excluded",
            Self::NoHeartbeat => "no-heartbeat",
            Self::Alive => "alive",
            Self::Busy => "busy",
        };
        f.pad(label)
    }
}

/// Outcome of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeResult {
    /// The provider reported healthy.
    Healthy,
    /// The provider answered but reported unhealthy.
    Unhealthy,
    /// The probe itself failed.
    Failed(String),
    /// The probe did not answer within the check timeout.
    TimedOut,
    /// Skipped: the provider is excluded.
    Excluded,
}

impl ProbeResult {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Point-in-time view of one tracked provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSnapshot {
    pub id: ProviderId,
    pub status: ProviderStatus,
    pub excluded: bool,
    pub consecutive_successful_checks: u32,
    pub in_flight_requests: usize,
    pub last_probe: Option<ProbeResult>,
}

impl fmt::Display for ProviderSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} {:<13} checks={:<3} in_flight={}",
            self.id, self.status, self.consecutive_successful_checks, self.in_flight_requests
        )?;
        match &self.last_probe {
            Some(ProbeResult::Failed(reason)) => write!(f, " last_probe=failed({reason})"),
            Some(ProbeResult::TimedOut) => f.write_str(" last_probe=timed-out"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_alive_and_busy_are_in_service() {
        assert!(ProviderStatus::Alive.is_in_service());
        assert!(ProviderStatus::Busy.is_in_service());
        assert!(!ProviderStatus::NoHeartbeat.is_in_service());
        assert!(!ProviderStatus::Excluded.is_in_service());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ProviderStatus::NoHeartbeat).unwrap();
        assert_eq!(json, "\"no_heartbeat\"");
    }

    #[test]
    fn snapshot_display_mentions_failed_probe() {
        let snapshot = ProviderSnapshot {
            id: ProviderId::new("p1"),
            status: ProviderStatus::NoHeartbeat,
            excluded: false,
            consecutive_successful_checks: 0,
            in_flight_requests: 0,
            last_probe: Some(ProbeResult::Failed("refused".to_string())),
        };
        let line = snapshot.to_string();
        assert!(line.starts_with("p1"));
        assert!(line.contains("no-heartbeat"));
        assert!(line.contains("failed(refused)"));
    }
}
