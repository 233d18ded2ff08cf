//! One incremental pass from a source store into a target store.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use tracing::{error, info, warn};
use udise_core::{store::AdminStore, value::TypedRow};
use uuid::Uuid;

use crate::{
  coerce::{CoercionMode, coerce_rows},
  error::{Result, SyncError},
};

/// Lease guarding the target table against overlapping runs.
pub const LEASE_NAME: &str = "admin-sync";

pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(3600);

/// Watermark used when the target has no rows to compare against.
pub fn watermark_floor() -> NaiveDateTime {
  NaiveDate::from_ymd_opt(2000, 1, 1)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
  pub chunk_size: usize,
  pub mode:       CoercionMode,
  pub lease_ttl:  Duration,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      chunk_size: DEFAULT_CHUNK_SIZE,
      mode:       CoercionMode::default(),
      lease_ttl:  DEFAULT_LEASE_TTL,
    }
  }
}

/// How the fetched rows reached the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
  /// Nothing newer than the watermark.
  Nothing,
  /// One set-based append.
  Bulk,
  /// The bulk append failed; rows went in one at a time. `failed_at` is the
  /// 0-based index of the row that stopped the run, if any.
  RowByRow { failed_at: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
  pub watermark: NaiveDateTime,
  pub fetched:   usize,
  pub inserted:  usize,
  pub mode:      SyncMode,
}

// ─── Job ─────────────────────────────────────────────────────────────────────

pub struct SyncJob<'a, Src, Dst> {
  source:  &'a Src,
  target:  &'a Dst,
  options: SyncOptions,
  holder:  String,
}

impl<'a, Src, Dst> SyncJob<'a, Src, Dst>
where
  Src: AdminStore,
  Dst: AdminStore,
{
  pub fn new(source: &'a Src, target: &'a Dst, options: SyncOptions) -> Self {
    Self { source, target, options, holder: Uuid::new_v4().to_string() }
  }

  /// Identifies this run in the lease table.
  pub fn holder(&self) -> &str { &self.holder }

  /// Run one pass under the [`LEASE_NAME`] lease. The lease is released
  /// whether or not the pass succeeds.
  pub async fn run(&self) -> Result<SyncReport> {
    let acquired = self
      .target
      .try_acquire_lease(LEASE_NAME, &self.holder, self.options.lease_ttl)
      .await
      .map_err(SyncError::in_target)?;
    if !acquired {
      warn!(lease = LEASE_NAME, "another sync run holds the lease");
      return Err(SyncError::LeaseHeld { name: LEASE_NAME.to_string() });
    }

    let outcome = self.run_locked().await;

    if let Err(e) = self.target.release_lease(LEASE_NAME, &self.holder).await {
      error!(error = %e, lease = LEASE_NAME, "failed to release sync lease");
    }

    outcome
  }

  async fn run_locked(&self) -> Result<SyncReport> {
    let watermark = self.watermark().await;
    info!(%watermark, "starting incremental sync");

    let fetched = self.source.rows_since(watermark).await.map_err(SyncError::in_source)?;
    let total = fetched.len();
    if total == 0 {
      info!("no new rows since the watermark");
      return Ok(SyncReport { watermark, fetched: 0, inserted: 0, mode: SyncMode::Nothing });
    }
    info!(count = total, "fetched new rows");

    let now = Utc::now().naive_utc();
    let (rows, stats) = coerce_rows(fetched, self.options.mode, now)?;
    if stats.total_failures() > 0 {
      warn!(failures = stats.total_failures(), "coercion replaced unusable values");
    }

    self.target.ensure_schema().await.map_err(SyncError::in_target)?;

    match self.target.append_rows(&rows, self.options.chunk_size).await {
      Ok(inserted) => {
        info!(inserted, "bulk append committed");
        Ok(SyncReport { watermark, fetched: total, inserted, mode: SyncMode::Bulk })
      }
      Err(e) => {
        warn!(error = %e, "bulk append failed; falling back to row-by-row");
        let (inserted, failed_at) = self.append_one_by_one(&rows).await;
        Ok(SyncReport {
          watermark,
          fetched: total,
          inserted,
          mode: SyncMode::RowByRow { failed_at },
        })
      }
    }
  }

  /// Target `MAX(Timestamp)`, or the floor when there is none or it cannot
  /// be read.
  async fn watermark(&self) -> NaiveDateTime {
    match self.target.max_timestamp().await {
      Ok(Some(watermark)) => watermark,
      Ok(None) => watermark_floor(),
      Err(e) => {
        warn!(error = %e, "could not read the target watermark; using the floor");
        watermark_floor()
      }
    }
  }

  /// Append rows in order, stopping at the first one that fails on its own.
  async fn append_one_by_one(&self, rows: &[TypedRow]) -> (usize, Option<usize>) {
    for (index, row) in rows.iter().enumerate() {
      if let Err(e) = self.target.append_rows(std::slice::from_ref(row), 1).await {
        error!(
          error = %e,
          index,
          udise_code = row.udise_code(),
          "row rejected; stopping sync"
        );
        return (index, Some(index));
      }
    }
    info!(inserted = rows.len(), "row-by-row append finished");
    (rows.len(), None)
  }
}
