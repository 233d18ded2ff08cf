//! Sequential batch posting of a record file.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{error, info};

use crate::client::ApiClient;

/// Outcome of one driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
  pub total:        usize,
  pub inserted:     usize,
  pub batches_sent: usize,
  /// 1-based number of the batch that stopped the run.
  pub failed_batch: Option<usize>,
}

impl Summary {
  pub fn is_complete(&self) -> bool { self.failed_batch.is_none() }
}

/// Parse a JSON array of records. Records stay opaque; the server validates.
pub fn parse_records(raw: &str) -> Result<Vec<Value>> {
  serde_json::from_str(raw).context("expected a JSON array of records")
}

pub fn load_records(path: &Path) -> Result<Vec<Value>> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading records from {}", path.display()))?;
  parse_records(&raw)
}

/// Post `records` in slices of `batch_size`, one request at a time, stopping
/// at the first rejected slice.
pub async fn post_all(client: &ApiClient, records: &[Value], batch_size: usize) -> Summary {
  let batch_size = batch_size.max(1);
  let batches = records.len().div_ceil(batch_size);
  let mut summary = Summary {
    total:        records.len(),
    inserted:     0,
    batches_sent: 0,
    failed_batch: None,
  };

  for (i, slice) in records.chunks(batch_size).enumerate() {
    let batch = i + 1;
    summary.batches_sent += 1;

    match client.post_bulk(slice).await {
      Ok(accepted) => {
        summary.inserted += accepted;
        info!(batch, accepted, "batch accepted");
        println!("batch {batch}/{batches}: {accepted} records inserted");
      }
      Err(e) => {
        error!(batch, error = %e, "batch rejected; stopping");
        eprintln!("batch {batch}/{batches} failed: {e:#}");
        summary.failed_batch = Some(batch);
        break;
      }
    }
  }

  println!("{}/{} records inserted", summary.inserted, summary.total);
  summary
}
