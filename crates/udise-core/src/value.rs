//! Dynamically-typed cells and rows.
//!
//! Source tables read by the sync job are not trusted to match the catalog, so
//! rows cross the storage boundary untyped ([`SourceRow`]) and are aligned
//! with the catalog ([`TypedRow`]) before they are written anywhere.

use std::{collections::BTreeMap, fmt};

use chrono::NaiveDateTime;

use crate::{
  columns::COLUMNS,
  datetime::{ISO_FORMAT, from_unix_seconds, parse_lenient},
};

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Blob(Vec<u8>),
  DateTime(NaiveDateTime),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

  /// The instant this cell denotes: text parsed leniently, numbers (or
  /// numeric text) as unix seconds. `None` for nulls, blobs and unparseable
  /// text.
  pub fn as_datetime(&self) -> Option<NaiveDateTime> {
    match self {
      Value::DateTime(dt) => Some(*dt),
      Value::Text(s) => parse_lenient(s)
        .or_else(|| s.trim().parse::<f64>().ok().and_then(from_unix_seconds)),
      Value::Integer(i) => from_unix_seconds(*i as f64),
      Value::Real(r) => from_unix_seconds(*r),
      Value::Null | Value::Blob(_) => None,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Integer(_) => "integer",
      Value::Real(_) => "real",
      Value::Text(_) => "text",
      Value::Blob(_) => "blob",
      Value::DateTime(_) => "datetime",
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => f.write_str("NULL"),
      Value::Integer(i) => write!(f, "{i}"),
      Value::Real(r) => write!(f, "{r}"),
      Value::Text(s) => write!(f, "{s:?}"),
      Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
      Value::DateTime(dt) => write!(f, "{}", dt.format(ISO_FORMAT)),
    }
  }
}

/// A row read from a source table: column name → cell, no typing assumptions.
pub type SourceRow = BTreeMap<String, Value>;

/// A row aligned with [`COLUMNS`]: `values[i]` belongs to `COLUMNS[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
  values: Vec<Value>,
}

impl TypedRow {
  /// Wrap catalog-aligned values. Fails if the width does not match.
  pub fn new(values: Vec<Value>) -> crate::Result<Self> {
    if values.len() != COLUMNS.len() {
      return Err(crate::Error::RowWidth {
        expected: COLUMNS.len(),
        actual:   values.len(),
      });
    }
    Ok(Self { values })
  }

  pub fn values(&self) -> &[Value] { &self.values }

  pub fn into_values(self) -> Vec<Value> { self.values }

  /// The primary key, when it holds an integer.
  pub fn udise_code(&self) -> Option<i64> {
    match self.values.first() {
      Some(Value::Integer(code)) => Some(*code),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fixtures::ts;

  #[test]
  fn datetime_cells_normalise_to_one_instant() {
    let want = Some(ts(2023, 1, 3));
    assert_eq!(Value::Text("2023-01-03 00:00:00.000000".into()).as_datetime(), want);
    assert_eq!(Value::Text("2023-01-03T00:00:00".into()).as_datetime(), want);
    assert_eq!(Value::Text("2023-01-03T05:30:00+05:30".into()).as_datetime(), want);
    assert_eq!(Value::Integer(1_672_704_000).as_datetime(), want);
    assert_eq!(Value::Real(1_672_704_000.0).as_datetime(), want);
    // TEXT affinity turns stored numbers into digits.
    assert_eq!(Value::Text("1672704000".into()).as_datetime(), want);
    assert_eq!(Value::Text("soon".into()).as_datetime(), None);
    assert_eq!(Value::Null.as_datetime(), None);
  }
}
