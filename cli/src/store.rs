use std::path::Path;

use anyhow::Context;
use nodefleet_api::prelude::*;
use serde::de::IgnoredAny;

const DEPLOYMENTS_TABLE: &str = "deployments";

/// Where deployment records are read from.
pub enum DeploymentSource {
    /// A PostgREST-compatible deployment store.
    Remote(StoreClient),

    /// A JSON array of store rows on disk.
    File(Vec<Deployment>),
}

impl DeploymentSource {
    /// Pick a source from the environment. `DEPLOYMENTS_FILE` wins over
    /// `STORE_URL`/`STORE_KEY`.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        if let Ok(path) = std::env::var("DEPLOYMENTS_FILE") {
            return Self::from_file(path);
        }
        let url = std::env::var("STORE_URL")
            .context("Missing STORE_URL env var (or set DEPLOYMENTS_FILE)")?;
        let key = std::env::var("STORE_KEY").context("Missing STORE_KEY env var")?;
        Ok(Self::Remote(StoreClient::new(url, key)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let deployments = parse_rows(&json)
            .with_context(|| format!("Failed to parse deployments in {}", path.display()))?;
        tracing::debug!(path = %path.display(), count = deployments.len(), "loaded deployments");
        Ok(Self::File(deployments))
    }

    /// A wallet's deployments, newest first.
    pub async fn deployments_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Vec<Deployment>, anyhow::Error> {
        match self {
            Self::Remote(client) => client.deployments_by_wallet(wallet).await,
            Self::File(deployments) => Ok(newest_first(
                deployments
                    .iter()
                    .filter(|d| d.wallet_address == wallet)
                    .cloned()
                    .collect(),
            )),
        }
    }

    pub async fn deployments_by_ids(&self, ids: &[u64]) -> Result<Vec<Deployment>, anyhow::Error> {
        match self {
            Self::Remote(client) => client.deployments_by_ids(ids).await,
            Self::File(deployments) => Ok(deployments
                .iter()
                .filter(|d| ids.contains(&d.id))
                .cloned()
                .collect()),
        }
    }

    /// Every deployment in the store, newest first.
    pub async fn all_deployments(&self) -> Result<Vec<Deployment>, anyhow::Error> {
        match self {
            Self::Remote(client) => client.all_deployments().await,
            Self::File(deployments) => Ok(newest_first(deployments.clone())),
        }
    }

    /// Whether the wallet has made at least one deployment.
    pub async fn has_deployments(&self, wallet: &str) -> Result<bool, anyhow::Error> {
        match self {
            Self::Remote(client) => client.has_deployments(wallet).await,
            Self::File(deployments) => Ok(deployments.iter().any(|d| d.wallet_address == wallet)),
        }
    }
}

/// Read-only client for the deployment store's REST interface.
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, DEPLOYMENTS_TABLE)
    }

    async fn select<T: serde::de::DeserializeOwned>(
        &self,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, anyhow::Error> {
        let response = self
            .http
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .context("Failed to reach deployment store")?
            .error_for_status()
            .context("Deployment store rejected query")?;
        let rows = response
            .json::<Vec<T>>()
            .await
            .context("Failed to decode deployment rows")?;
        Ok(rows)
    }

    pub async fn deployments_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Vec<Deployment>, anyhow::Error> {
        let rows: Vec<Deployment> = self
            .select(&[
                ("select", "*".to_string()),
                ("wallet_address", format!("eq.{wallet}")),
                ("order", "created_at.desc".to_string()),
            ])
            .await?;
        tracing::info!(wallet, count = rows.len(), "fetched wallet deployments");
        Ok(rows)
    }

    pub async fn deployments_by_ids(&self, ids: &[u64]) -> Result<Vec<Deployment>, anyhow::Error> {
        let rows: Vec<Deployment> = self
            .select(&[
                ("select", "*".to_string()),
                ("id", id_filter(ids)),
            ])
            .await?;
        tracing::info!(count = rows.len(), "fetched deployments by id");
        Ok(rows)
    }

    pub async fn all_deployments(&self) -> Result<Vec<Deployment>, anyhow::Error> {
        let rows: Vec<Deployment> = self
            .select(&[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ])
            .await?;
        tracing::info!(count = rows.len(), "fetched all deployments");
        Ok(rows)
    }

    pub async fn has_deployments(&self, wallet: &str) -> Result<bool, anyhow::Error> {
        let rows: Vec<IgnoredAny> = self
            .select(&[
                ("select", "id".to_string()),
                ("wallet_address", format!("eq.{wallet}")),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(!rows.is_empty())
    }
}

/// PostgREST `in` filter, e.g. `in.(2,3)`.
fn id_filter(ids: &[u64]) -> String {
    let ids = ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
    format!("in.({ids})")
}

fn parse_rows(json: &str) -> Result<Vec<Deployment>, serde_json::Error> {
    serde_json::from_str(json)
}

fn newest_first(mut deployments: Vec<Deployment>) -> Vec<Deployment> {
    deployments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    deployments
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"[
        {"id": 1, "created_at": "2025-12-01T10:00:00.000Z", "node_count": 1, "wallet_address": "k26A"},
        {"id": 7, "created_at": "2025-12-29T10:00:00.000Z", "node_count": 9, "wallet_address": "k26A"},
        {"id": 3, "created_at": "2025-12-22T08:00:00+00:00", "node_count": 2, "wallet_address": "EmZv",
         "amount_sol": 3.1, "transaction_signature": "sig3"}
    ]"#;

    fn source() -> DeploymentSource {
        DeploymentSource::File(parse_rows(ROWS).unwrap())
    }

    #[test]
    fn test_id_filter() {
        assert_eq!(id_filter(&[2, 3]), "in.(2,3)");
        assert_eq!(id_filter(&[]), "in.()");
    }

    #[test]
    fn test_table_url_trims_slash() {
        let client = StoreClient::new("https://store.example.com/", "key");
        assert_eq!(client.table_url(), "https://store.example.com/rest/v1/deployments");
    }

    #[tokio::test]
    async fn test_file_source_by_wallet_newest_first() {
        let rows = source().deployments_by_wallet("k26A").await.unwrap();
        let ids: Vec<u64> = rows.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![7, 1]);
        assert!(source().deployments_by_wallet("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_source_by_ids() {
        let rows = source().deployments_by_ids(&[3, 99]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].transaction_signature.as_deref(), Some("sig3"));
    }

    #[tokio::test]
    async fn test_file_source_all_and_signup() {
        let all = source().all_deployments().await.unwrap();
        let ids: Vec<u64> = all.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![7, 3, 1]);
        assert!(source().has_deployments("EmZv").await.unwrap());
        assert!(!source().has_deployments("GkWM").await.unwrap());
    }

    #[tokio::test]
    async fn test_demo_file_source() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/deployments.json");
        let source = DeploymentSource::from_file(path).unwrap();
        let all = source.all_deployments().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, 7);
        let wallet = source
            .deployments_by_wallet("k26A3XrW4gx7UXA3D8DhxcYQiwZjqc1gddb7f6LzgQP")
            .await
            .unwrap();
        assert_eq!(wallet.iter().map(|d| d.node_count).sum::<i64>(), 10);
    }

    #[test]
    fn test_signup_rows_decode_without_schema() {
        let rows: Vec<IgnoredAny> = serde_json::from_str(r#"[{"id": 4}]"#).unwrap();
        assert_eq!(rows.len(), 1);
        let rows: Vec<IgnoredAny> = serde_json::from_str("[]").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_missing_file() {
        assert!(DeploymentSource::from_file("/nonexistent/deployments.json").is_err());
    }

    #[test]
    fn test_parse_rows_rejects_bad_timestamp() {
        let bad = r#"[{"id": 1, "created_at": "yesterday", "node_count": 1, "wallet_address": "w"}]"#;
        assert!(parse_rows(bad).is_err());
    }
}
