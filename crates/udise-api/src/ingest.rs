//! Dual-write batch ingestion.
//!
//! Records are split into fixed-size batches and each batch is written to two
//! independent backends: insert into the primary, insert into the secondary,
//! commit the primary, commit the secondary. A failure at any step rolls both
//! sessions back and aborts the request. Batches committed before the failure
//! stay committed.
//!
//! The two commits are sequential, not linked. If the primary commit succeeds
//! and the secondary commit fails, the backends diverge for that batch; this
//! is logged and left for [`reconcile`](crate::reconcile::reconcile).

use std::sync::Arc;

use chrono::{SubsecRound as _, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use udise_core::{
  record::AdminRecord,
  store::{AdminSession, AdminStore},
};

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("could not open a session: {0}")]
  Session(#[source] BoxError),

  /// `batch` is 1-based.
  #[error("batch {batch}: {source}")]
  Batch {
    batch:  usize,
    #[source]
    source: BoxError,
  },
}

/// Which step of a batch failed. Only used for logging; callers never learn
/// which backend diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
  PrimaryInsert,
  SecondaryInsert,
  PrimaryCommit,
  SecondaryCommit,
}

struct BatchFailure {
  stage:  Stage,
  source: BoxError,
}

fn failed_at<E>(stage: Stage) -> impl FnOnce(E) -> BatchFailure
where
  E: std::error::Error + Send + Sync + 'static,
{
  move |e| BatchFailure { stage, source: Box::new(e) }
}

/// Number of batches `total` records split into.
pub fn batch_count(total: usize, batch_size: usize) -> usize { total.div_ceil(batch_size.max(1)) }

// ─── Service ─────────────────────────────────────────────────────────────────

/// Replicates record batches into a primary and a secondary backend.
pub struct BatchIngestor<S> {
  primary:    Arc<S>,
  secondary:  Arc<S>,
  batch_size: usize,
}

impl<S: AdminStore> BatchIngestor<S> {
  pub fn new(primary: Arc<S>, secondary: Arc<S>) -> Self {
    Self { primary, secondary, batch_size: DEFAULT_BATCH_SIZE }
  }

  /// Override the batch size. Zero is treated as one.
  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  pub fn batch_size(&self) -> usize { self.batch_size }

  /// The backend reads are served from.
  pub fn primary(&self) -> &S { &self.primary }

  pub fn secondary(&self) -> &S { &self.secondary }

  /// Write `records` to both backends and return the records committed, with
  /// their audit fields filled in.
  pub async fn ingest(&self, records: Vec<AdminRecord>) -> Result<Vec<AdminRecord>, IngestError> {
    let total = records.len();
    let batches = batch_count(total, self.batch_size);
    info!(total, batch_size = self.batch_size, batches, "starting admin bulk insert");

    let mut primary = self
      .primary
      .session()
      .await
      .map_err(|e| IngestError::Session(Box::new(e)))?;
    let mut secondary = self
      .secondary
      .session()
      .await
      .map_err(|e| IngestError::Session(Box::new(e)))?;

    // Microsecond precision is what the backends store.
    let now = Utc::now().naive_utc().trunc_subsecs(6);
    let mut committed = Vec::with_capacity(total);

    for (idx, chunk) in records.chunks(self.batch_size).enumerate() {
      let batch_no = idx + 1;
      let mut batch = chunk.to_vec();
      batch.iter_mut().for_each(|r| r.stamp_audit(now));

      if let Err(failure) = write_batch(&mut primary, &mut secondary, &batch).await {
        if let Err(e) = primary.rollback().await {
          warn!(batch = batch_no, error = %e, "primary rollback failed");
        }
        if let Err(e) = secondary.rollback().await {
          warn!(batch = batch_no, error = %e, "secondary rollback failed");
        }
        if failure.stage == Stage::SecondaryCommit {
          error!(
            batch = batch_no,
            count = batch.len(),
            "primary committed but secondary did not; backends have diverged"
          );
        }
        error!(
          batch = batch_no,
          stage = ?failure.stage,
          error = %failure.source,
          "admin batch insert failed"
        );
        return Err(IngestError::Batch { batch: batch_no, source: failure.source });
      }

      info!(batch = batch_no, of = batches, count = batch.len(), "inserted batch");
      committed.extend(batch);
    }

    info!(committed = committed.len(), "admin bulk insert completed");
    Ok(committed)
  }
}

async fn write_batch<T: AdminSession>(
  primary: &mut T,
  secondary: &mut T,
  batch: &[AdminRecord],
) -> Result<(), BatchFailure> {
  primary
    .bulk_insert(batch)
    .await
    .map_err(failed_at(Stage::PrimaryInsert))?;
  secondary
    .bulk_insert(batch)
    .await
    .map_err(failed_at(Stage::SecondaryInsert))?;
  primary.commit().await.map_err(failed_at(Stage::PrimaryCommit))?;
  secondary.commit().await.map_err(failed_at(Stage::SecondaryCommit))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::Mutex,
    time::Duration,
  };

  use chrono::NaiveDateTime;
  use udise_core::{
    fixtures::{sample_record, sample_records, ts},
    value::{SourceRow, TypedRow},
  };
  use udise_store_sqlite::SqliteStore;

  use super::*;

  // ── Batch accounting ───────────────────────────────────────────────────────

  /// Records the size of every `bulk_insert` call and accepts everything.
  #[derive(Default)]
  struct CountingStore {
    calls: Arc<Mutex<Vec<Vec<i64>>>>,
  }

  struct CountingSession {
    calls: Arc<Mutex<Vec<Vec<i64>>>>,
  }

  impl AdminSession for CountingSession {
    type Error = Infallible;

    async fn bulk_insert(&mut self, records: &[AdminRecord]) -> Result<usize, Infallible> {
      let codes = records.iter().map(|r| r.udise_code).collect();
      self.calls.lock().unwrap().push(codes);
      Ok(records.len())
    }

    async fn commit(&mut self) -> Result<(), Infallible> { Ok(()) }

    async fn rollback(&mut self) -> Result<(), Infallible> { Ok(()) }
  }

  impl AdminStore for CountingStore {
    type Error = Infallible;
    type Session = CountingSession;

    async fn ensure_schema(&self) -> Result<(), Infallible> { Ok(()) }

    async fn session(&self) -> Result<CountingSession, Infallible> {
      Ok(CountingSession { calls: self.calls.clone() })
    }

    async fn get(&self, _: i64) -> Result<Option<AdminRecord>, Infallible> { Ok(None) }

    async fn list(&self) -> Result<Vec<AdminRecord>, Infallible> { Ok(vec![]) }

    async fn list_codes(&self) -> Result<Vec<i64>, Infallible> { Ok(vec![]) }

    async fn upsert(&self, _: &AdminRecord) -> Result<(), Infallible> { Ok(()) }

    async fn max_timestamp(&self) -> Result<Option<NaiveDateTime>, Infallible> { Ok(None) }

    async fn rows_since(&self, _: NaiveDateTime) -> Result<Vec<SourceRow>, Infallible> {
      Ok(vec![])
    }

    async fn append_rows(&self, rows: &[TypedRow], _: usize) -> Result<usize, Infallible> {
      Ok(rows.len())
    }

    async fn try_acquire_lease(&self, _: &str, _: &str, _: Duration) -> Result<bool, Infallible> {
      Ok(true)
    }

    async fn release_lease(&self, _: &str, _: &str) -> Result<(), Infallible> { Ok(()) }
  }

  #[test]
  fn batch_count_rounds_up() {
    assert_eq!(batch_count(0, 1000), 0);
    assert_eq!(batch_count(1, 1000), 1);
    assert_eq!(batch_count(1000, 1000), 1);
    assert_eq!(batch_count(1001, 1000), 2);
    assert_eq!(batch_count(5, 0), 5);
  }

  #[tokio::test]
  async fn batches_are_bounded_and_in_input_order() {
    for (n, b) in [(0, 3), (1, 3), (9, 3), (10, 3), (10, 1), (7, 100)] {
      let primary = Arc::new(CountingStore::default());
      let secondary = Arc::new(CountingStore::default());
      let ingestor = BatchIngestor::new(primary.clone(), secondary.clone()).with_batch_size(b);

      let records = sample_records(1, n, ts(2023, 1, 1));
      let committed = ingestor.ingest(records).await.unwrap();
      assert_eq!(committed.len(), n);

      for store in [&primary, &secondary] {
        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.len(), batch_count(n, b), "n={n} b={b}");
        assert!(calls.iter().all(|c| c.len() <= b));
        let flat: Vec<i64> = calls.iter().flatten().copied().collect();
        assert_eq!(flat, (1..=n as i64).collect::<Vec<_>>());
      }
    }
  }

  // ── Against real backends ──────────────────────────────────────────────────

  async fn sqlite_ingestor(batch_size: usize) -> BatchIngestor<SqliteStore> {
    let primary = SqliteStore::open_in_memory().await.unwrap();
    let secondary = SqliteStore::open_in_memory().await.unwrap();
    BatchIngestor::new(Arc::new(primary), Arc::new(secondary)).with_batch_size(batch_size)
  }

  #[tokio::test]
  async fn commits_to_both_backends_and_stamps_audit_fields() {
    let ingestor = sqlite_ingestor(2).await;
    let committed = ingestor.ingest(sample_records(1, 5, ts(2023, 1, 1))).await.unwrap();

    assert!(committed.iter().all(|r| r.created_at.is_some() && r.ingested_at.is_some()));
    assert_eq!(ingestor.primary().list_codes().await.unwrap(), [1, 2, 3, 4, 5]);
    assert_eq!(ingestor.secondary().list_codes().await.unwrap(), [1, 2, 3, 4, 5]);
    assert_eq!(ingestor.primary().get(3).await.unwrap().unwrap(), committed[2]);
  }

  #[tokio::test]
  async fn failed_batch_keeps_earlier_batches_only() {
    let ingestor = sqlite_ingestor(3).await;
    let mut records = sample_records(1, 10, ts(2023, 1, 1));
    // Batch 3 holds indices 6..9; make index 7 collide with index 6.
    records[7].udise_code = records[6].udise_code;

    let err = ingestor.ingest(records).await.unwrap_err();
    assert!(matches!(err, IngestError::Batch { batch: 3, .. }), "{err}");

    let expected: Vec<i64> = (1..=6).collect();
    assert_eq!(ingestor.primary().list_codes().await.unwrap(), expected);
    assert_eq!(ingestor.secondary().list_codes().await.unwrap(), expected);
  }

  #[tokio::test]
  async fn resubmitting_a_committed_record_fails() {
    let ingestor = sqlite_ingestor(1000).await;
    ingestor.ingest(vec![sample_record(11, ts(2023, 1, 1))]).await.unwrap();

    let err = ingestor
      .ingest(vec![sample_record(12, ts(2023, 1, 1)), sample_record(11, ts(2023, 1, 2))])
      .await
      .unwrap_err();
    assert!(err.to_string().contains("constraint"), "{err}");
    assert_eq!(ingestor.primary().list_codes().await.unwrap(), [11]);
  }

  #[tokio::test]
  async fn secondary_failure_rolls_back_primary() {
    let ingestor = sqlite_ingestor(1000).await;
    // Only the secondary already knows record 2.
    ingestor.secondary().upsert(&sample_record(2, ts(2023, 1, 1))).await.unwrap();

    let result = ingestor.ingest(sample_records(1, 3, ts(2023, 1, 1))).await;
    assert!(result.is_err());
    assert!(ingestor.primary().list_codes().await.unwrap().is_empty());
    assert_eq!(ingestor.secondary().list_codes().await.unwrap(), [2]);
  }

  #[tokio::test]
  async fn empty_input_is_a_no_op() {
    let ingestor = sqlite_ingestor(1000).await;
    assert!(ingestor.ingest(vec![]).await.unwrap().is_empty());
  }
}
