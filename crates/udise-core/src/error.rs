//! Error types for `udise-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("row has {actual} values, the admin table has {expected} columns")]
  RowWidth { expected: usize, actual: usize },

  #[error("column {column}: expected {expected}, got {found}")]
  ColumnType {
    column:   &'static str,
    expected: &'static str,
    found:    String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
