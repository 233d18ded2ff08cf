//! Async HTTP client for the admin ingestion API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde_json::Value;

/// Bulk requests are committed batch by batch on the server and can take a
/// while for large slices.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for the ingestion API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// `POST /admin/bulk`. Returns how many records the server committed.
  pub async fn post_bulk(&self, records: &[Value]) -> Result<usize> {
    let resp = self
      .client
      .post(self.url("/admin/bulk"))
      .json(records)
      .send()
      .await
      .context("POST /admin/bulk failed")?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(anyhow!("POST /admin/bulk → {status}: {body}"));
    }

    let committed: Vec<Value> = resp.json().await.context("deserialising committed records")?;
    Ok(committed.len())
  }
}
