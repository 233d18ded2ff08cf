//! Error type for `udise-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] udise_core::Error),

  /// A row was rejected by a `NOT NULL`, `CHECK` or primary key constraint.
  #[error("constraint violation: {0}")]
  Constraint(String),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  pub fn is_constraint(&self) -> bool { matches!(self, Error::Constraint(_)) }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, msg))
        if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
      {
        Error::Constraint(msg.unwrap_or_else(|| failure.to_string()))
      }
      other => Error::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { tokio_rusqlite::Error::Rusqlite(e).into() }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
