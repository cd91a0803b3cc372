use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Client for the fleet backend. All endpoints are read-only JSON with no
/// request bodies; most wrap their payload in a `{status, ..., message?}`
/// envelope where `status == "success"` is required.
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

/// Per-robot performance series from `/get_timeline-data/`.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotSeries {
    #[serde(rename = "desempenhos")]
    pub values: Vec<f64>,
    #[serde(rename = "horarios")]
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionEnvelope {
    status: String,
    #[serde(rename = "pri_ultima_coleta", default)]
    last_collection: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountsEnvelope {
    status: String,
    #[serde(default)]
    data: HashMap<String, u64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MinedEnvelope {
    status: String,
    #[serde(default)]
    total: HashMap<String, Option<u64>>,
    #[serde(default)]
    message: Option<String>,
}

/// Scroller values arrive untyped: the backend has been seen emitting null
/// and non-numeric entries, which the ticker must skip rather than choke on.
#[derive(Debug, Deserialize)]
struct ScrollerEnvelope {
    status: String,
    #[serde(default)]
    total: HashMap<String, serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("HTTP client"),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            anyhow::bail!("GET {path} returned {status}: {snippet}");
        }

        resp.json().await.with_context(|| format!("Parse {path} body"))
    }

    /// Latest collection timestamp. `Ok(None)` means the backend succeeded
    /// but has no value (or an empty one) — the caller renders "N/A".
    pub async fn ultima_coleta(&self) -> Result<Option<String>> {
        let env: CollectionEnvelope = self.get_json("/get_ultima_coleta/").await?;
        require_success(&env.status, env.message.as_deref(), "ultima_coleta")?;
        Ok(non_empty(env.last_collection))
    }

    /// Full per-robot performance dataset. No envelope on this endpoint.
    pub async fn timeline(&self) -> Result<HashMap<String, RobotSeries>> {
        let data: HashMap<String, RobotSeries> = self.get_json("/get_timeline-data/").await?;
        debug!(target: "diag", "timeline payload: {} robots", data.len());
        Ok(data)
    }

    /// Target counts per robot.
    pub async fn bots_meta(&self) -> Result<HashMap<String, u64>> {
        let env: CountsEnvelope = self.get_json("/get_bots_meta/").await?;
        require_success(&env.status, env.message.as_deref(), "bots_meta")?;
        Ok(env.data)
    }

    /// Currently-working counts per robot.
    pub async fn bots_funcionando(&self) -> Result<HashMap<String, u64>> {
        let env: CountsEnvelope = self.get_json("/get_bots_funcionando/").await?;
        require_success(&env.status, env.message.as_deref(), "bots_funcionando")?;
        Ok(env.data)
    }

    /// Cumulative mined totals, keyed by UPPERCASE robot name; null when a
    /// robot has no total yet.
    pub async fn total_minerado(&self) -> Result<HashMap<String, Option<u64>>> {
        let env: MinedEnvelope = self.get_json("/get_total_minerado/").await?;
        require_success(&env.status, env.message.as_deref(), "total_minerado")?;
        Ok(env.total)
    }

    /// Percentage-change indices for the ticker, values left untyped.
    pub async fn scroller(&self) -> Result<HashMap<String, serde_json::Value>> {
        let env: ScrollerEnvelope = self.get_json("/get_scroller/").await?;
        require_success(&env.status, env.message.as_deref(), "scroller")?;
        Ok(env.total)
    }
}

/// A missing value and an empty string both count as "no value".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn require_success(status: &str, message: Option<&str>, what: &str) -> Result<()> {
    if status == "success" {
        Ok(())
    } else {
        anyhow::bail!(
            "{what}: backend reported {status:?}: {}",
            message.unwrap_or("no message")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_requires_success_status() {
        assert!(require_success("success", None, "x").is_ok());
        let err = require_success("error", Some("db down"), "bots_meta").unwrap_err();
        assert!(err.to_string().contains("db down"));
    }

    #[test]
    fn series_deserializes_from_wire_names() {
        let raw = r#"{"desempenhos": [97.5, 88.0], "horarios": ["08:00", "09:30"]}"#;
        let s: RobotSeries = serde_json::from_str(raw).unwrap();
        assert_eq!(s.values, vec![97.5, 88.0]);
        assert_eq!(s.labels, vec!["08:00", "09:30"]);
    }

    #[test]
    fn mined_totals_accept_nulls() {
        let raw = r#"{"status": "success", "total": {"RFB": 12, "OAB": null}}"#;
        let env: MinedEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.total["RFB"], Some(12));
        assert_eq!(env.total["OAB"], None);
    }

    #[test]
    fn collection_envelope_tolerates_missing_value() {
        let raw = r#"{"status": "success"}"#;
        let env: CollectionEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(non_empty(env.last_collection), None);
    }

    #[test]
    fn empty_collection_value_counts_as_absent() {
        let raw = r#"{"status": "success", "pri_ultima_coleta": ""}"#;
        let env: CollectionEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(non_empty(env.last_collection), None);
    }

    #[test]
    fn real_collection_value_passes_through() {
        assert_eq!(
            non_empty(Some("2024-05-01 08:30".to_string())),
            Some("2024-05-01 08:30".to_string())
        );
    }
}
