//! The [`AdminStore`] and [`AdminSession`] traits.
//!
//! The traits are implemented by storage backends (e.g. `udise-store-sqlite`).
//! The ingestion service, the HTTP layer and the sync job depend on this
//! abstraction, not on any concrete backend.

use std::{future::Future, time::Duration};

use chrono::NaiveDateTime;

use crate::{
  record::AdminRecord,
  value::{SourceRow, TypedRow},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over one relational backend holding the `admin` table.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AdminStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Session: AdminSession<Error = Self::Error>;

  // ── Schema and sessions ───────────────────────────────────────────────

  /// Create the `admin` table if it does not exist. Idempotent.
  fn ensure_schema(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Open a request-scoped session with its own transaction state.
  fn session(&self) -> impl Future<Output = Result<Self::Session, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Point lookup by primary key. Returns `None` if not found.
  fn get(
    &self,
    udise_code: i64,
  ) -> impl Future<Output = Result<Option<AdminRecord>, Self::Error>> + Send + '_;

  /// Every record, ordered by primary key.
  fn list(&self) -> impl Future<Output = Result<Vec<AdminRecord>, Self::Error>> + Send + '_;

  /// Every primary key, ascending.
  fn list_codes(&self) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  // ── Writes outside a session ──────────────────────────────────────────

  /// Insert `record`, or overwrite the row with the same primary key.
  /// `updated_at` is refreshed to the write time.
  fn upsert<'a>(
    &'a self,
    record: &'a AdminRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Incremental sync ──────────────────────────────────────────────────

  /// `MAX("Timestamp")`; `None` if the table is empty or does not exist.
  fn max_timestamp(
    &self,
  ) -> impl Future<Output = Result<Option<NaiveDateTime>, Self::Error>> + Send + '_;

  /// Every row whose `Timestamp` is strictly greater than `watermark`,
  /// ordered by `Timestamp` then primary key. Timestamps are compared as
  /// instants whatever their stored form; rows with no readable `Timestamp`
  /// are skipped.
  fn rows_since(
    &self,
    watermark: NaiveDateTime,
  ) -> impl Future<Output = Result<Vec<SourceRow>, Self::Error>> + Send + '_;

  /// Append `rows` in a single transaction, walked `chunk_size` rows at a
  /// time. Fails, writing nothing, if any row is rejected.
  fn append_rows<'a>(
    &'a self,
    rows: &'a [TypedRow],
    chunk_size: usize,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Take the named lease for `holder` if it is free or expired.
  /// Returns `false` if someone else holds an unexpired lease.
  fn try_acquire_lease<'a>(
    &'a self,
    name: &'a str,
    holder: &'a str,
    ttl: Duration,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Release the named lease if `holder` still owns it.
  fn release_lease<'a>(
    &'a self,
    name: &'a str,
    holder: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// A unit of work against one backend.
///
/// The first write opens a transaction that stays open until
/// [`commit`](Self::commit) or [`rollback`](Self::rollback). Dropping a
/// session with an open transaction discards it.
pub trait AdminSession: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Set-based insert of `records`. Either every record is inserted or, on
  /// any constraint violation, none are and the call fails.
  fn bulk_insert<'a>(
    &'a mut self,
    records: &'a [AdminRecord],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Commit the open transaction. A no-op when none is open.
  fn commit(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Roll back the open transaction. A no-op when none is open, including
  /// after a successful commit.
  fn rollback(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
