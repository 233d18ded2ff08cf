//! Encoding and decoding helpers between core cells and SQLite values.
//!
//! Datetimes are stored as fixed-width `YYYY-MM-DD HH:MM:SS.ffffff` text so
//! that string comparison in SQL (`MAX`, `>`) orders them chronologically.

use chrono::NaiveDateTime;
use rusqlite::types::{Value as SqlValue, ValueRef};
use udise_core::{
  datetime::parse_lenient,
  record::AdminRecord,
  value::{TypedRow, Value},
};

use crate::{Error, Result};

// ─── NaiveDateTime ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: NaiveDateTime) -> String { dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string() }

pub fn decode_dt(s: &str) -> Result<NaiveDateTime> {
  parse_lenient(s).ok_or_else(|| Error::DateParse(format!("unparseable datetime: {s:?}")))
}

// ─── Cells ───────────────────────────────────────────────────────────────────

pub fn encode_value(v: &Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Real(r) => SqlValue::Real(*r),
    Value::Text(s) => SqlValue::Text(s.clone()),
    Value::Blob(b) => SqlValue::Blob(b.clone()),
    Value::DateTime(dt) => SqlValue::Text(encode_dt(*dt)),
  }
}

pub fn decode_value(v: ValueRef<'_>) -> Value {
  match v {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::Integer(i),
    ValueRef::Real(r) => Value::Real(r),
    ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(b) => Value::Blob(b.to_vec()),
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

pub fn encode_row(row: &TypedRow) -> Vec<SqlValue> { row.values().iter().map(encode_value).collect() }

/// Stamp missing audit fields with `now` and encode for an insert.
pub fn encode_record(record: &AdminRecord, now: NaiveDateTime) -> Result<Vec<SqlValue>> {
  let mut record = record.clone();
  record.stamp_audit(now);
  Ok(encode_row(&record.to_row()?))
}

/// Read every column of a catalog-ordered `SELECT` into cells.
pub fn read_cells(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
  (0..width).map(|i| row.get_ref(i).map(decode_value)).collect()
}

pub fn decode_record(cells: Vec<Value>) -> Result<AdminRecord> {
  Ok(AdminRecord::from_row(TypedRow::new(cells)?)?)
}
