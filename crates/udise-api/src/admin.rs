//! Handlers for `/admin` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/bulk` | Body: array of records; returns the committed records |
//! | `GET`  | `/admin/` | Every record from the primary backend |
//! | `GET`  | `/admin/{udise_code}` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use tracing::{info, warn};
use udise_core::{record::AdminRecord, store::AdminStore};

use crate::{error::ApiError, ingest::BatchIngestor};

// ─── Bulk insert ──────────────────────────────────────────────────────────────

/// `POST /admin/bulk`. All-or-error; there is no partial-success response.
pub async fn bulk<S>(
  State(ingestor): State<Arc<BatchIngestor<S>>>,
  Json(records): Json<Vec<AdminRecord>>,
) -> Result<Json<Vec<AdminRecord>>, ApiError>
where
  S: AdminStore,
{
  let committed = ingestor.ingest(records).await?;
  Ok(Json(committed))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /admin/`
pub async fn list<S>(
  State(ingestor): State<Arc<BatchIngestor<S>>>,
) -> Result<Json<Vec<AdminRecord>>, ApiError>
where
  S: AdminStore,
{
  info!("fetching all admin records from the primary backend");
  let records = ingestor
    .primary()
    .list()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(records))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /admin/{udise_code}`
pub async fn get_one<S>(
  State(ingestor): State<Arc<BatchIngestor<S>>>,
  Path(udise_code): Path<i64>,
) -> Result<Json<AdminRecord>, ApiError>
where
  S: AdminStore,
{
  info!(udise_code, "fetching admin record");
  let record = ingestor
    .primary()
    .get(udise_code)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  match record {
    Some(record) => Ok(Json(record)),
    None => {
      warn!(udise_code, "admin record not found");
      Err(ApiError::NotFound("admin record not found".into()))
    }
  }
}
