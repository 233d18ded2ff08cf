//! JSON API and ingestion service for the UDISE admin dataset.
//!
//! Exposes an axum [`Router`] backed by a [`BatchIngestor`] over any
//! [`udise_core::store::AdminStore`]. Binding, TLS and tracing layers are the
//! caller's responsibility.

pub mod admin;
pub mod error;
pub mod ingest;
pub mod reconcile;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use udise_core::store::AdminStore;

pub use error::ApiError;
pub use ingest::{BatchIngestor, DEFAULT_BATCH_SIZE, IngestError};
pub use reconcile::{ReconcileReport, reconcile};

/// Bulk bodies are unbounded in record count; this caps their size in bytes.
pub const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Build the API router for `ingestor`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(ingestor: Arc<BatchIngestor<S>>) -> Router<()>
where
  S: AdminStore + 'static,
{
  Router::new()
    .route("/admin/bulk", post(admin::bulk::<S>))
    .route("/admin/", get(admin::list::<S>))
    .route("/admin", get(admin::list::<S>))
    .route("/admin/{udise_code}", get(admin::get_one::<S>))
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .with_state(ingestor)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::Value as Json;
  use tower::ServiceExt as _;
  use udise_core::{
    fixtures::{sample_record, sample_records, ts},
    record::AdminRecord,
  };
  use udise_store_sqlite::SqliteStore;

  use super::*;

  async fn make_ingestor() -> Arc<BatchIngestor<SqliteStore>> {
    let state = SqliteStore::open_in_memory().await.unwrap();
    let rvsk = SqliteStore::open_in_memory().await.unwrap();
    Arc::new(BatchIngestor::new(Arc::new(state), Arc::new(rvsk)).with_batch_size(2))
  }

  async fn oneshot_raw(
    ingestor: Arc<BatchIngestor<SqliteStore>>,
    method:   &str,
    uri:      &str,
    body:     String,
  ) -> Response {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body))
      .unwrap();
    api_router(ingestor).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: Response) -> Json {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── POST /admin/bulk ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn bulk_returns_committed_records() {
    let ingestor = make_ingestor().await;
    let records = sample_records(1, 5, ts(2023, 1, 1));

    let resp = oneshot_raw(
      ingestor.clone(),
      "POST",
      "/admin/bulk",
      serde_json::to_string(&records).unwrap(),
    ).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let committed: Vec<AdminRecord> = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(committed.len(), 5);
    assert!(committed.iter().all(|r| r.ingested_at.is_some()));
    assert_eq!(ingestor.secondary().list_codes().await.unwrap(), [1, 2, 3, 4, 5]);
  }

  #[tokio::test]
  async fn bulk_duplicate_returns_500_with_detail() {
    let ingestor = make_ingestor().await;
    let body = serde_json::to_string(&[sample_record(1, ts(2023, 1, 1))]).unwrap();

    let first = oneshot_raw(ingestor.clone(), "POST", "/admin/bulk", body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = oneshot_raw(ingestor, "POST", "/admin/bulk", body).await;
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body_json(second).await["detail"].as_str().unwrap().to_owned();
    assert!(detail.starts_with("error inserting admins"), "{detail}");
  }

  #[tokio::test]
  async fn malformed_record_is_rejected_before_storage() {
    let ingestor = make_ingestor().await;
    let resp = oneshot_raw(
      ingestor.clone(),
      "POST",
      "/admin/bulk",
      r#"[{"Udise_code": 1}]"#.to_string(),
    ).await;
    assert!(resp.status().is_client_error(), "{}", resp.status());
    assert!(ingestor.primary().list_codes().await.unwrap().is_empty());
  }

  // ── GET ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn list_and_get_read_the_primary() {
    let ingestor = make_ingestor().await;
    ingestor.ingest(sample_records(10, 3, ts(2023, 1, 1))).await.unwrap();
    // Visible through the secondary only: must not be served.
    ingestor.secondary().upsert(&sample_record(99, ts(2023, 1, 1))).await.unwrap();

    for uri in ["/admin/", "/admin"] {
      let resp = oneshot_raw(ingestor.clone(), "GET", uri, String::new()).await;
      assert_eq!(resp.status(), StatusCode::OK);
      assert_eq!(body_json(resp).await.as_array().unwrap().len(), 3);
    }

    let resp = oneshot_raw(ingestor.clone(), "GET", "/admin/11", String::new()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["Udise_code"], 11);

    let resp = oneshot_raw(ingestor, "GET", "/admin/99", String::new()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn get_missing_returns_404_detail() {
    let ingestor = make_ingestor().await;
    let resp = oneshot_raw(ingestor, "GET", "/admin/12345678901", String::new()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["detail"], "admin record not found");
  }

  #[tokio::test]
  async fn non_numeric_code_is_a_client_error() {
    let ingestor = make_ingestor().await;
    let resp = oneshot_raw(ingestor, "GET", "/admin/abc", String::new()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }
}
