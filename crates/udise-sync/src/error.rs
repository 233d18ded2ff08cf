//! Error type for `udise-sync`.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SyncError {
  #[error("lease {name:?} is held by another sync run")]
  LeaseHeld { name: String },

  /// Strict mode only. `row` is the 0-based index into the fetched rows.
  #[error("row {row}: cannot coerce {column} value {value} to {expected}")]
  Coercion {
    row:      usize,
    column:   &'static str,
    expected: &'static str,
    value:    String,
  },

  #[error("source store: {0}")]
  Source(#[source] BoxError),

  #[error("target store: {0}")]
  Target(#[source] BoxError),

  #[error(transparent)]
  Row(#[from] udise_core::Error),
}

impl SyncError {
  pub(crate) fn in_source<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    SyncError::Source(Box::new(e))
  }

  pub(crate) fn in_target<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    SyncError::Target(Box::new(e))
  }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
