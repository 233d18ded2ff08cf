//! SQL for the `admin` table, generated from the column catalog.
//!
//! `Udise_code` is declared `BIGINT` rather than `INTEGER` so it does not
//! become a rowid alias: a NULL key must fail instead of being auto-assigned.

use std::sync::LazyLock;

use udise_core::columns::{COLUMNS, Column, ColumnType, PRIMARY_KEY, TABLE, WATERMARK};

/// Per-connection settings. `journal_mode` is a no-op for in-memory databases.
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Named leases used to keep sync runs from overlapping.
pub const LEASE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sync_lease (
    name        TEXT PRIMARY KEY,
    holder      TEXT,            -- NULL when free
    expires_at  TEXT             -- same encoding as every other datetime
);
";

fn quote(name: &str) -> String { format!("\"{name}\"") }

fn column_ddl(col: &Column) -> String {
  let name = quote(col.name);
  let sql_type = match col.ty {
    ColumnType::Integer => "BIGINT",
    ColumnType::Float => "REAL",
    ColumnType::Text { .. } | ColumnType::DateTime => "TEXT",
  };
  let mut ddl = format!("    {name:<34} {sql_type}");
  if col.required {
    ddl.push_str(" NOT NULL");
  }
  if col.is_audit() {
    ddl.push_str(" DEFAULT CURRENT_TIMESTAMP");
  }
  if let ColumnType::Text { max_len } = col.ty {
    ddl.push_str(&format!(" CHECK (length({name}) <= {max_len})"));
  }
  ddl
}

/// Full table DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub static CREATE_TABLE: LazyLock<String> = LazyLock::new(|| {
  let mut lines: Vec<String> = COLUMNS.iter().map(column_ddl).collect();
  lines.push(format!("    PRIMARY KEY ({})", quote(PRIMARY_KEY)));
  format!(
    "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n{LEASE_SCHEMA}",
    quote(TABLE),
    lines.join(",\n")
  )
});

/// Catalog columns, quoted and comma-separated, in canonical order.
pub static COLUMN_LIST: LazyLock<String> = LazyLock::new(|| {
  COLUMNS.iter().map(|c| quote(c.name)).collect::<Vec<_>>().join(", ")
});

fn placeholders() -> String {
  (1..=COLUMNS.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

pub static INSERT: LazyLock<String> = LazyLock::new(|| {
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    quote(TABLE),
    *COLUMN_LIST,
    placeholders()
  )
});

/// Insert-or-overwrite keyed by the primary key. `created_at` keeps the value
/// of the first write.
pub static UPSERT: LazyLock<String> = LazyLock::new(|| {
  let updates = COLUMNS
    .iter()
    .filter(|c| c.name != PRIMARY_KEY && c.name != "created_at")
    .map(|c| format!("{0} = excluded.{0}", quote(c.name)))
    .collect::<Vec<_>>()
    .join(", ");
  format!("{} ON CONFLICT ({}) DO UPDATE SET {updates}", *INSERT, quote(PRIMARY_KEY))
});

pub static SELECT_ALL: LazyLock<String> = LazyLock::new(|| {
  format!(
    "SELECT {} FROM {} ORDER BY {}",
    *COLUMN_LIST,
    quote(TABLE),
    quote(PRIMARY_KEY)
  )
});

pub static SELECT_ONE: LazyLock<String> = LazyLock::new(|| {
  format!(
    "SELECT {} FROM {} WHERE {} = ?1",
    *COLUMN_LIST,
    quote(TABLE),
    quote(PRIMARY_KEY)
  )
});

pub static SELECT_CODES: LazyLock<String> = LazyLock::new(|| {
  format!("SELECT {0} FROM {1} ORDER BY {0}", quote(PRIMARY_KEY), quote(TABLE))
});

pub static MAX_WATERMARK: LazyLock<String> = LazyLock::new(|| {
  format!("SELECT MAX({}) FROM {}", quote(WATERMARK), quote(TABLE))
});

/// `SELECT *` on purpose: the source table is read as-is and typed later.
/// Source `Timestamp` cells may be text in any layout or unix seconds, so
/// watermark filtering and ordering happen after decoding.
pub static SELECT_SOURCE: LazyLock<String> =
  LazyLock::new(|| format!("SELECT * FROM {}", quote(TABLE)));

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ddl_mentions_every_column_once() {
    for col in COLUMNS {
      let needle = format!("    {}", quote(col.name));
      assert_eq!(CREATE_TABLE.matches(&needle).count(), 1, "{}", col.name);
    }
    assert!(CREATE_TABLE.contains("PRIMARY KEY (\"Udise_code\")"));
    assert!(CREATE_TABLE.contains("CHECK (length(\"Is_Active\") <= 10)"));
  }

  #[test]
  fn upsert_never_rewrites_the_key_or_created_at() {
    assert!(!UPSERT.contains("\"Udise_code\" = excluded"));
    assert!(!UPSERT.contains("\"created_at\" = excluded"));
    assert!(UPSERT.contains("\"updated_at\" = excluded.\"updated_at\""));
  }
}
