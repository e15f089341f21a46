use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::{
    consts::*,
    error::LifecycleError,
    state::{Deployment, LaunchOverrides},
};

/// Parameters of the earnings lifecycle. All values must be positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LifecycleConfig {
    /// Amount one node earns per day while active.
    pub rate_per_day_per_node: f64,

    /// Time between a deployment's start and the moment it begins earning.
    pub activation_delay: TimeDelta,

    /// Time a deployment keeps earning once active.
    pub lifecycle_duration: TimeDelta,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            rate_per_day_per_node: DEFAULT_RATE_PER_DAY_PER_NODE,
            activation_delay: TimeDelta::hours(DEFAULT_ACTIVATION_DELAY_HOURS),
            lifecycle_duration: TimeDelta::days(DEFAULT_LIFECYCLE_DAYS),
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<(), LifecycleError> {
        let rate = self.rate_per_day_per_node;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(LifecycleError::InvalidConfig(format!(
                "rate_per_day_per_node must be positive, got {rate}"
            )));
        }
        if self.activation_delay <= TimeDelta::zero() {
            return Err(LifecycleError::InvalidConfig(format!(
                "activation_delay must be positive, got {}",
                self.activation_delay
            )));
        }
        if self.lifecycle_duration <= TimeDelta::zero() {
            return Err(LifecycleError::InvalidConfig(format!(
                "lifecycle_duration must be positive, got {}",
                self.lifecycle_duration
            )));
        }
        Ok(())
    }

    /// Length of the lifecycle in fractional days.
    pub fn lifecycle_days(&self) -> f64 {
        fractional_days(self.lifecycle_duration)
    }

    /// Earnings of a deployment that ran its full lifecycle. This is the cap.
    pub fn full_lifecycle_earnings(&self, node_count: i64) -> f64 {
        self.lifecycle_days() * self.rate_per_day_per_node * node_count as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleStatus {
    /// Waiting out the activation delay. Nothing accrues yet.
    Provisioning,

    /// Accruing earnings.
    Active,

    /// Lifecycle finished. Earnings are capped.
    Completed,
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleStatus::Provisioning => "Provisioning",
            LifecycleStatus::Active => "Active",
            LifecycleStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

/// Lifecycle of one deployment as seen at a particular instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LifecycleResult {
    pub status: LifecycleStatus,

    /// Accrued earnings, never negative and never above the full-lifecycle amount.
    pub earnings: f64,

    /// Lifecycle start before the activation delay: the creation instant, or
    /// the wallet's launch floor when that is later.
    pub start: DateTime<Utc>,

    /// The instant earnings begin accruing.
    pub effective_start: DateTime<Utc>,

    /// The instant earnings stop accruing.
    pub completion_instant: DateTime<Utc>,

    /// Whether the start was clamped to a launch override.
    pub overridden: bool,
}

impl LifecycleResult {
    pub fn is_earning(&self) -> bool {
        self.status == LifecycleStatus::Active
    }

    /// Time left until completion, zero once the lifecycle has ended.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        if now >= self.completion_instant {
            TimeDelta::zero()
        } else {
            self.completion_instant - now
        }
    }

    pub fn time_remaining_days(&self, now: DateTime<Utc>) -> f64 {
        fractional_days(self.time_remaining(now))
    }
}

/// Derive the lifecycle status and accrued earnings of a deployment at `now`.
///
/// Earnings accrue continuously from `effective_start` at
/// `rate_per_day_per_node * node_count` per day and stop at
/// `completion_instant`. Past completion the full-lifecycle amount is reported
/// no matter how much later `now` is.
pub fn compute_lifecycle(
    deployment: &Deployment,
    overrides: &LaunchOverrides,
    config: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Result<LifecycleResult, LifecycleError> {
    config.validate()?;
    deployment.validate()?;

    // Only purchases strictly before the launch floor are clamped.
    let (start, overridden) = match overrides.get(&deployment.wallet_address) {
        Some(launch) if deployment.created_at < launch => (launch, true),
        _ => (deployment.created_at, false),
    };
    if overridden {
        tracing::trace!(
            id = deployment.id,
            wallet = %deployment.wallet_address,
            %start,
            "start clamped to launch override"
        );
    }

    let effective_start = start
        .checked_add_signed(config.activation_delay)
        .ok_or_else(|| out_of_range(deployment))?;
    let completion_instant = effective_start
        .checked_add_signed(config.lifecycle_duration)
        .ok_or_else(|| out_of_range(deployment))?;

    let (status, earnings) = if now < effective_start {
        (LifecycleStatus::Provisioning, 0.0)
    } else if now <= completion_instant {
        let days_active = fractional_days(now - effective_start);
        let earnings = days_active * config.rate_per_day_per_node * deployment.node_count as f64;
        (LifecycleStatus::Active, earnings)
    } else {
        (
            LifecycleStatus::Completed,
            config.full_lifecycle_earnings(deployment.node_count),
        )
    };

    Ok(LifecycleResult {
        status,
        earnings,
        start,
        effective_start,
        completion_instant,
        overridden,
    })
}

/// Totals across a set of deployments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub total_nodes: u64,
    pub total_earnings: f64,
}

/// Sum node counts and earnings across deployments.
///
/// The result does not depend on the order of `deployments`: per-deployment
/// earnings are summed in ascending order, so any permutation yields the same
/// bits. Fails on the first invalid deployment without a partial result.
pub fn aggregate<'a, I>(
    deployments: I,
    overrides: &LaunchOverrides,
    config: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Result<Aggregate, LifecycleError>
where
    I: IntoIterator<Item = &'a Deployment>,
{
    let mut total_nodes = 0u64;
    let mut earnings = Vec::new();
    for deployment in deployments {
        let result = compute_lifecycle(deployment, overrides, config, now)?;
        total_nodes = total_nodes
            .checked_add(deployment.node_count as u64)
            .ok_or_else(|| {
                LifecycleError::InvalidDeployment(format!(
                    "deployment #{}: total node count overflows",
                    deployment.id
                ))
            })?;
        earnings.push(result.earnings);
    }
    earnings.sort_by(f64::total_cmp);
    let total_earnings: f64 = earnings.iter().sum();
    tracing::debug!(total_nodes, total_earnings, "aggregated deployments");
    Ok(Aggregate {
        total_nodes,
        total_earnings,
    })
}

/// A deployment paired with its lifecycle at the evaluation instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeRow<'a> {
    pub deployment: &'a Deployment,
    pub lifecycle: LifecycleResult,
}

/// Evaluate every deployment at `now`, newest first.
pub fn evaluate<'a, I>(
    deployments: I,
    overrides: &LaunchOverrides,
    config: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Result<Vec<NodeRow<'a>>, LifecycleError>
where
    I: IntoIterator<Item = &'a Deployment>,
{
    let mut rows = deployments
        .into_iter()
        .map(|deployment| {
            compute_lifecycle(deployment, overrides, config, now)
                .map(|lifecycle| NodeRow { deployment, lifecycle })
        })
        .collect::<Result<Vec<_>, _>>()?;
    rows.sort_by(|a, b| {
        b.deployment
            .created_at
            .cmp(&a.deployment.created_at)
            .then_with(|| b.deployment.id.cmp(&a.deployment.id))
    });
    Ok(rows)
}

/// Convert a duration to fractional days at millisecond precision.
pub fn fractional_days(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / MS_PER_DAY as f64
}

fn out_of_range(deployment: &Deployment) -> LifecycleError {
    LifecycleError::InvalidDeployment(format!(
        "deployment #{}: lifecycle of {} falls outside the representable time range",
        deployment.id, deployment.created_at
    ))
}
