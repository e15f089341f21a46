use chrono::{DateTime, Utc};
use nodefleet_api::prelude::*;

/// Reference instant the built-in scenarios are evaluated at.
pub const REFERENCE_NOW: &str = "2026-01-15T12:00:00Z";

const OVERRIDE_WALLET: &str = "OVERRIDE_WALLET";
const OVERRIDE_INSTANT: &str = "2025-12-12T00:00:00Z";
const NORMAL_WALLET: &str = "NORMAL_WALLET";

/// Earnings tolerance when comparing against expectations.
const TOLERANCE: f64 = 0.1;

pub struct Scenario {
    pub name: &'static str,
    pub created_at: &'static str,
    pub wallet: &'static str,
    pub now: Option<&'static str>,
    pub node_count: i64,
    pub expected_status: LifecycleStatus,
    pub expected_earnings: f64,
}

pub struct Outcome {
    pub name: &'static str,
    pub expected_status: LifecycleStatus,
    pub expected_earnings: f64,
    pub result: LifecycleResult,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.result.status == self.expected_status
            && (self.result.earnings - self.expected_earnings).abs() < TOLERANCE
    }
}

/// Known-good cases for the default lifecycle (119.72/day, 24h delay, 30 days).
pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "Just created",
            created_at: "2026-01-15T10:00:00Z",
            wallet: NORMAL_WALLET,
            now: None,
            node_count: 1,
            expected_status: LifecycleStatus::Provisioning,
            expected_earnings: 0.0,
        },
        Scenario {
            // Earning since 2026-01-14T10:00, 26 hours before the reference instant.
            name: "Active, two days old",
            created_at: "2026-01-13T10:00:00Z",
            wallet: NORMAL_WALLET,
            now: None,
            node_count: 1,
            expected_status: LifecycleStatus::Active,
            expected_earnings: 119.72 * 26.0 / 24.0,
        },
        Scenario {
            name: "Completed, earnings capped",
            created_at: "2025-12-10T00:00:00Z",
            wallet: NORMAL_WALLET,
            now: None,
            node_count: 1,
            expected_status: LifecycleStatus::Completed,
            expected_earnings: 30.0 * 119.72,
        },
        Scenario {
            // Clamped to Dec 12, earning from Dec 13, completed Jan 12.
            name: "Override, created before launch",
            created_at: "2025-11-01T00:00:00Z",
            wallet: OVERRIDE_WALLET,
            now: None,
            node_count: 1,
            expected_status: LifecycleStatus::Completed,
            expected_earnings: 30.0 * 119.72,
        },
        Scenario {
            name: "Override, shortly after launch",
            created_at: "2025-11-01T00:00:00Z",
            wallet: OVERRIDE_WALLET,
            now: Some("2025-12-20T12:00:00Z"),
            node_count: 1,
            expected_status: LifecycleStatus::Active,
            expected_earnings: 119.72 * 7.5,
        },
        Scenario {
            name: "Override, created exactly at launch",
            created_at: OVERRIDE_INSTANT,
            wallet: OVERRIDE_WALLET,
            now: Some("2025-12-14T00:00:00Z"),
            node_count: 1,
            expected_status: LifecycleStatus::Active,
            expected_earnings: 119.72,
        },
        Scenario {
            name: "Multi-node deployment",
            created_at: "2025-12-29T10:00:00Z",
            wallet: NORMAL_WALLET,
            now: Some("2025-12-31T10:00:00Z"),
            node_count: 9,
            expected_status: LifecycleStatus::Active,
            expected_earnings: 119.72 * 9.0,
        },
    ]
}

/// Evaluate every scenario against the default lifecycle.
pub fn run() -> Result<Vec<Outcome>, anyhow::Error> {
    let config = LifecycleConfig::default();
    let overrides = LaunchOverrides::from_rfc3339([(OVERRIDE_WALLET, OVERRIDE_INSTANT)])?;
    let reference = parse_instant(REFERENCE_NOW)?;

    scenarios()
        .into_iter()
        .enumerate()
        .map(|(i, scenario)| -> Result<Outcome, anyhow::Error> {
            let now: DateTime<Utc> = match scenario.now {
                Some(now) => parse_instant(now)?,
                None => reference,
            };
            let deployment = Deployment::parse(
                i as u64 + 1,
                scenario.created_at,
                scenario.node_count,
                scenario.wallet,
            )?;
            let result = compute_lifecycle(&deployment, &overrides, &config, now)?;
            Ok(Outcome {
                name: scenario.name,
                expected_status: scenario.expected_status,
                expected_earnings: scenario.expected_earnings,
                result,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_pass() {
        let outcomes = run().unwrap();
        assert_eq!(outcomes.len(), scenarios().len());
        for outcome in &outcomes {
            assert!(
                outcome.passed(),
                "{}: expected {} {:.2}, got {} {:.2}",
                outcome.name,
                outcome.expected_status,
                outcome.expected_earnings,
                outcome.result.status,
                outcome.result.earnings
            );
        }
    }

    #[test]
    fn test_override_scenario_reports_clamp() {
        let outcomes = run().unwrap();
        let clamped = outcomes
            .iter()
            .find(|o| o.name == "Override, created before launch")
            .unwrap();
        assert!(clamped.result.overridden);
        assert_eq!(
            clamped.result.effective_start,
            parse_instant("2025-12-13T00:00:00Z").unwrap()
        );
        let exact = outcomes
            .iter()
            .find(|o| o.name == "Override, created exactly at launch")
            .unwrap();
        assert!(!exact.result.overridden);
    }

    #[test]
    fn test_outcome_detects_mismatch() {
        let mut outcomes = run().unwrap();
        let outcome = &mut outcomes[1];
        outcome.expected_earnings += 1.0;
        assert!(!outcome.passed());
        outcome.expected_earnings -= 1.0;
        outcome.expected_status = LifecycleStatus::Completed;
        assert!(!outcome.passed());
    }
}
