use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{clock::parse_instant, error::LifecycleError};

/// Per-wallet launch floors.
///
/// A wallet whose purchases predate the public launch has its lifecycle start
/// moved forward to the launch instant listed here. Deployments created at or
/// after the floor are unaffected.
///
/// Serializes as a plain wallet → RFC 3339 object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchOverrides(BTreeMap<String, DateTime<Utc>>);

impl LaunchOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from wallet → RFC 3339 timestamp pairs.
    pub fn from_rfc3339<I, K, V>(entries: I) -> Result<Self, LifecycleError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut overrides = Self::new();
        for (wallet, instant) in entries {
            let wallet = wallet.into();
            let instant = instant.as_ref();
            let parsed = parse_instant(instant).map_err(|e| {
                LifecycleError::InvalidOverride(format!("{wallet}: {instant:?} ({e})"))
            })?;
            overrides.insert(wallet, parsed);
        }
        Ok(overrides)
    }

    pub fn insert(
        &mut self,
        wallet: impl Into<String>,
        launch: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        self.0.insert(wallet.into(), launch)
    }

    /// The launch floor for a wallet, if it has one.
    pub fn get(&self, wallet: &str) -> Option<DateTime<Utc>> {
        self.0.get(wallet).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.0.iter().map(|(wallet, launch)| (wallet.as_str(), *launch))
    }
}

impl<K: Into<String>> FromIterator<(K, DateTime<Utc>)> for LaunchOverrides {
    fn from_iter<T: IntoIterator<Item = (K, DateTime<Utc>)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
