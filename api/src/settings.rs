use std::path::Path;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{
    consts::*,
    error::LifecycleError,
    lifecycle::LifecycleConfig,
    state::LaunchOverrides,
};

/// Externally loaded lifecycle configuration.
///
/// ```json
/// {
///   "rate_per_day_per_node": 119.72,
///   "activation_delay_hours": 24,
///   "lifecycle_days": 30,
///   "overrides": { "<wallet>": "2025-12-12T00:00:00Z" }
/// }
/// ```
///
/// Missing fields take the defaults in [`crate::consts`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub rate_per_day_per_node: f64,
    pub activation_delay_hours: i64,
    pub lifecycle_days: i64,

    /// Wallet address → launch floor. Bad instants fail the whole document.
    pub overrides: LaunchOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate_per_day_per_node: DEFAULT_RATE_PER_DAY_PER_NODE,
            activation_delay_hours: DEFAULT_ACTIVATION_DELAY_HOURS,
            lifecycle_days: DEFAULT_LIFECYCLE_DAYS,
            overrides: LaunchOverrides::new(),
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, LifecycleError> {
        serde_json::from_str(json).map_err(|e| LifecycleError::Settings(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LifecycleError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LifecycleError::Settings(format!("{}: {e}", path.display())))?;
        let settings = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            overrides = settings.overrides.len(),
            "loaded settings"
        );
        Ok(settings)
    }

    /// The validated lifecycle parameters.
    pub fn lifecycle_config(&self) -> Result<LifecycleConfig, LifecycleError> {
        let activation_delay = TimeDelta::try_hours(self.activation_delay_hours).ok_or_else(|| {
            LifecycleError::InvalidConfig(format!(
                "activation_delay_hours out of range: {}",
                self.activation_delay_hours
            ))
        })?;
        let lifecycle_duration = TimeDelta::try_days(self.lifecycle_days).ok_or_else(|| {
            LifecycleError::InvalidConfig(format!(
                "lifecycle_days out of range: {}",
                self.lifecycle_days
            ))
        })?;
        let config = LifecycleConfig {
            rate_per_day_per_node: self.rate_per_day_per_node,
            activation_delay,
            lifecycle_duration,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn overrides(&self) -> &LaunchOverrides {
        &self.overrides
    }
}
