use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{clock::parse_instant, error::LifecycleError};

/// A single purchase provisioning one or more nodes for a wallet.
///
/// Mirrors a row of the deployment store. Records are immutable once written;
/// lifecycle status and earnings are always derived from them at query time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// Store-assigned identifier.
    pub id: u64,

    /// The instant the deployment was recorded.
    pub created_at: DateTime<Utc>,

    /// The number of nodes provisioned. Signed so malformed rows decode and are
    /// rejected by validation instead.
    pub node_count: i64,

    /// The wallet that paid for this deployment.
    pub wallet_address: String,

    /// SOL paid for the deployment, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_sol: Option<f64>,

    /// Signature of the payment transaction, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_signature: Option<String>,
}

impl Deployment {
    pub fn new(
        id: u64,
        created_at: DateTime<Utc>,
        node_count: i64,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            created_at,
            node_count,
            wallet_address: wallet_address.into(),
            amount_sol: None,
            transaction_signature: None,
        }
    }

    /// Build a deployment from a raw RFC 3339 creation timestamp.
    pub fn parse(
        id: u64,
        created_at: &str,
        node_count: i64,
        wallet_address: impl Into<String>,
    ) -> Result<Self, LifecycleError> {
        let created_at = parse_instant(created_at).map_err(|e| {
            LifecycleError::InvalidDeployment(format!(
                "deployment #{id}: created_at {created_at:?} is not a valid instant ({e})"
            ))
        })?;
        let deployment = Self::new(id, created_at, node_count, wallet_address);
        deployment.validate()?;
        Ok(deployment)
    }

    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.node_count <= 0 {
            return Err(LifecycleError::InvalidDeployment(format!(
                "deployment #{}: node_count must be positive, got {}",
                self.id, self.node_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse() {
        let d = Deployment::parse(7, "2025-12-29T10:00:00.000Z", 9, "wallet").unwrap();
        assert_eq!(d.id, 7);
        assert_eq!(d.node_count, 9);
        assert_eq!(d.wallet_address, "wallet");
        assert_eq!(d.created_at, Utc.with_ymd_and_hms(2025, 12, 29, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_bad_timestamp() {
        let err = Deployment::parse(1, "not a date", 1, "wallet").unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidDeployment(_)));
    }

    #[test]
    fn test_non_positive_node_count() {
        for node_count in [0, -3] {
            let err = Deployment::parse(1, "2025-12-29T10:00:00Z", node_count, "wallet").unwrap_err();
            assert!(matches!(err, LifecycleError::InvalidDeployment(_)));
        }
    }

    #[test]
    fn test_deserialize_store_row() {
        let row = r#"{
            "id": 2,
            "created_at": "2025-12-20T08:30:00.123456+00:00",
            "node_count": 3,
            "amount_sol": 1.5,
            "transaction_signature": "5xSig",
            "wallet_address": "GkWMf255xX2chqNgnV8B2djGa2eSsFBBC8ASdgtohFUb"
        }"#;
        let d: Deployment = serde_json::from_str(row).unwrap();
        assert_eq!(d.id, 2);
        assert_eq!(d.node_count, 3);
        assert_eq!(d.amount_sol, Some(1.5));
        assert_eq!(d.transaction_signature.as_deref(), Some("5xSig"));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_deserialize_minimal_row() {
        let row = r#"{"id": 1, "created_at": "2025-12-01T10:00:00Z", "node_count": 0, "wallet_address": "w"}"#;
        let d: Deployment = serde_json::from_str(row).unwrap();
        assert_eq!(d.amount_sol, None);
        assert!(d.validate().is_err());
    }
}
