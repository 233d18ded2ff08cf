//! [`SqliteStore`]: the SQLite implementation of [`AdminStore`].

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  time::Duration,
};

use chrono::{NaiveDate, NaiveDateTime, SubsecRound as _, TimeDelta, Utc};
use rusqlite::OptionalExtension as _;
use udise_core::{
  columns::{COLUMNS, PRIMARY_KEY, TABLE, WATERMARK},
  record::AdminRecord,
  store::AdminStore,
  value::{SourceRow, TypedRow, Value},
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{decode_dt, decode_record, decode_value, encode_dt, encode_record, encode_row, read_cells},
  schema::{
    CONNECTION_PRAGMAS, CREATE_TABLE, LEASE_SCHEMA, MAX_WATERMARK, SELECT_ALL, SELECT_CODES,
    SELECT_ONE, SELECT_SOURCE, UPSERT,
  },
  session::SqliteSession,
};

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// One SQLite database holding the `admin` table.
///
/// Cloning is cheap; the inner connection is reference-counted. Sessions
/// open their own connections to the same location.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  location: PathBuf,
}

impl SqliteStore {
  /// Open (or create) a database at `path` and ensure the schema exists.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let store = Self::connect(path).await?;
    store.ensure_schema().await?;
    Ok(store)
  }

  /// Open a database at `path` without touching its schema. Used for sync
  /// sources, which are read as-is.
  pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
    let location = path.as_ref().to_path_buf();
    let conn = connect_to(&location).await?;
    Ok(Self { conn, location })
  }

  /// Open a fresh, uniquely-named shared-cache in-memory store with the
  /// schema applied, for tests. The database lives as long as this
  /// store (or one of its clones) does.
  pub async fn open_in_memory() -> Result<Self> {
    let uri = format!("file:udise-{}?mode=memory&cache=shared", Uuid::new_v4().simple());
    Self::open(uri).await
  }

  /// Where sessions connect to: a file path or a SQLite URI.
  pub fn location(&self) -> &Path { &self.location }

  /// The store's own connection, for maintenance scripts and tests that need
  /// raw SQL.
  pub fn conn(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn table_exists(&self) -> Result<bool> {
    let exists = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
              rusqlite::params![TABLE],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }
}

pub(crate) async fn connect_to(location: &Path) -> Result<tokio_rusqlite::Connection> {
  let conn = tokio_rusqlite::Connection::open(location).await?;
  conn
    .call(|conn| {
      conn.busy_timeout(BUSY_TIMEOUT)?;
      conn.execute_batch(CONNECTION_PRAGMAS)?;
      Ok(())
    })
    .await?;
  Ok(conn)
}

/// Latest expiry a lease can carry. Later instants no longer encode as
/// fixed-width text and would compare as already expired.
fn lease_forever() -> NaiveDateTime {
  NaiveDate::from_ymd_opt(9999, 12, 31)
    .and_then(|d| d.and_hms_opt(23, 59, 59))
    .unwrap_or_default()
}

/// The row's watermark instant at the precision the target stores.
fn watermark_of(row: &SourceRow) -> Option<NaiveDateTime> {
  row.get(WATERMARK).and_then(Value::as_datetime).map(|at| at.trunc_subsecs(6))
}

fn primary_key_of(row: &SourceRow) -> Option<i64> {
  match row.get(PRIMARY_KEY)? {
    Value::Integer(i) => Some(*i),
    Value::Text(s) => s.trim().parse().ok(),
    _ => None,
  }
}

// ─── AdminStore impl ─────────────────────────────────────────────────────────

impl AdminStore for SqliteStore {
  type Error = crate::Error;
  type Session = SqliteSession;

  // ── Schema and sessions ───────────────────────────────────────────────────

  async fn ensure_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(&CREATE_TABLE)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session(&self) -> Result<SqliteSession> {
    Ok(SqliteSession::new(connect_to(&self.location).await?))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, udise_code: i64) -> Result<Option<AdminRecord>> {
    let cells = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&SELECT_ONE, rusqlite::params![udise_code], |row| {
              read_cells(row, COLUMNS.len())
            })
            .optional()?,
        )
      })
      .await?;

    cells.map(decode_record).transpose()
  }

  async fn list(&self) -> Result<Vec<AdminRecord>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&SELECT_ALL)?;
        let rows = stmt
          .query_map([], |row| read_cells(row, COLUMNS.len()))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(decode_record).collect()
  }

  async fn list_codes(&self) -> Result<Vec<i64>> {
    let codes = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&SELECT_CODES)?;
        let codes = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(codes)
      })
      .await?;
    Ok(codes)
  }

  // ── Writes outside a session ──────────────────────────────────────────────

  async fn upsert(&self, record: &AdminRecord) -> Result<()> {
    let now = Utc::now().naive_utc();
    let mut record = record.clone();
    record.updated_at = Some(now);
    let params = encode_record(&record, now)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(&UPSERT, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Incremental sync ──────────────────────────────────────────────────────

  async fn max_timestamp(&self) -> Result<Option<NaiveDateTime>> {
    if !self.table_exists().await? {
      return Ok(None);
    }

    let raw: Option<String> = self
      .conn
      .call(|conn| Ok(conn.query_row(&MAX_WATERMARK, [], |row| row.get(0))?))
      .await?;

    raw.as_deref().map(decode_dt).transpose()
  }

  async fn rows_since(&self, watermark: NaiveDateTime) -> Result<Vec<SourceRow>> {
    let (mut rows, unreadable) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&SELECT_SOURCE)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        let mut newer = Vec::new();
        let mut unreadable = 0usize;
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
          let row = names
            .iter()
            .enumerate()
            .map(|(i, name)| Ok((name.clone(), decode_value(row.get_ref(i)?))))
            .collect::<rusqlite::Result<SourceRow>>()?;
          match watermark_of(&row) {
            Some(at) if at > watermark => newer.push((at, primary_key_of(&row), row)),
            Some(_) => {}
            None => unreadable += 1,
          }
        }
        Ok((newer, unreadable))
      })
      .await?;

    if unreadable > 0 {
      tracing::warn!(skipped = unreadable, "source rows without a readable Timestamp were skipped");
    }
    rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    Ok(rows.into_iter().map(|(_, _, row)| row).collect())
  }

  async fn append_rows(&self, rows: &[TypedRow], chunk_size: usize) -> Result<usize> {
    let encoded: Vec<_> = rows.iter().map(encode_row).collect();
    let chunk_size = chunk_size.max(1);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&crate::schema::INSERT)?;
          for (n, chunk) in encoded.chunks(chunk_size).enumerate() {
            for params in chunk {
              stmt.execute(rusqlite::params_from_iter(params))?;
            }
            tracing::debug!(chunk = n + 1, rows = chunk.len(), "appended chunk");
          }
        }
        tx.commit()?;
        Ok(encoded.len())
      })
      .await?;
    Ok(inserted)
  }

  async fn try_acquire_lease(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool> {
    let now = Utc::now().naive_utc();
    let expires = TimeDelta::from_std(ttl)
      .ok()
      .and_then(|ttl| now.checked_add_signed(ttl))
      .map_or(lease_forever(), |at| at.min(lease_forever()));

    let name = name.to_owned();
    let holder = holder.to_owned();
    let (now, expires) = (encode_dt(now), encode_dt(expires));

    let acquired = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(LEASE_SCHEMA)?;
        tx.execute(
          "INSERT OR IGNORE INTO sync_lease (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        let changed = tx.execute(
          "UPDATE sync_lease SET holder = ?2, expires_at = ?3
           WHERE name = ?1
             AND (holder IS NULL OR holder = ?2 OR expires_at <= ?4)",
          rusqlite::params![name, holder, expires, now],
        )?;
        tx.commit()?;
        Ok(changed == 1)
      })
      .await?;
    Ok(acquired)
  }

  async fn release_lease(&self, name: &str, holder: &str) -> Result<()> {
    let name = name.to_owned();
    let holder = holder.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute_batch(LEASE_SCHEMA)?;
        conn.execute(
          "UPDATE sync_lease SET holder = NULL, expires_at = NULL
           WHERE name = ?1 AND holder = ?2",
          rusqlite::params![name, holder],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
