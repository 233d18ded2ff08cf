//! [`SqliteSession`]: a request-scoped unit of work on its own connection.

use chrono::Utc;
use udise_core::{record::AdminRecord, store::AdminSession};

use crate::{Error, Result, encode::encode_record, schema::INSERT};

/// A dedicated connection plus the state of its open transaction, if any.
///
/// Dropping the session closes the connection, which rolls back anything not
/// yet committed.
pub struct SqliteSession {
  conn:  tokio_rusqlite::Connection,
  in_tx: bool,
}

impl SqliteSession {
  pub(crate) fn new(conn: tokio_rusqlite::Connection) -> Self { Self { conn, in_tx: false } }

  pub fn in_transaction(&self) -> bool { self.in_tx }

  async fn exec(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl AdminSession for SqliteSession {
  type Error = Error;

  async fn bulk_insert(&mut self, records: &[AdminRecord]) -> Result<usize> {
    let now = Utc::now().naive_utc();
    let rows = records
      .iter()
      .map(|r| encode_record(r, now))
      .collect::<Result<Vec<_>>>()?;

    if !self.in_tx {
      self.exec("BEGIN").await?;
      self.in_tx = true;
    }

    // The savepoint makes the call all-or-nothing without ending the
    // surrounding transaction.
    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute_batch("SAVEPOINT bulk_insert")?;
        let result = (|| -> rusqlite::Result<usize> {
          let mut stmt = conn.prepare_cached(&INSERT)?;
          for params in &rows {
            stmt.execute(rusqlite::params_from_iter(params))?;
          }
          Ok(rows.len())
        })();
        match result {
          Ok(n) => {
            conn.execute_batch("RELEASE bulk_insert")?;
            Ok(n)
          }
          Err(e) => {
            conn.execute_batch("ROLLBACK TO bulk_insert; RELEASE bulk_insert")?;
            Err(e.into())
          }
        }
      })
      .await?;
    Ok(inserted)
  }

  async fn commit(&mut self) -> Result<()> {
    if self.in_tx {
      self.exec("COMMIT").await?;
      self.in_tx = false;
    }
    Ok(())
  }

  async fn rollback(&mut self) -> Result<()> {
    if self.in_tx {
      self.in_tx = false;
      self.exec("ROLLBACK").await?;
    }
    Ok(())
  }
}
