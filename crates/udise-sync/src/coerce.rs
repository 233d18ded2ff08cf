//! Aligning untyped source rows with the column catalog.
//!
//! Every catalog column is coerced to its declared type. In lenient mode a
//! value that does not fit is replaced (`0` for integers, `NULL` otherwise)
//! and counted; in strict mode the first such value fails the run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::warn;
use udise_core::{
  columns::{COLUMNS, Column, ColumnType},
  datetime::ISO_FORMAT,
  value::{SourceRow, TypedRow, Value},
};

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
  #[default]
  Lenient,
  Strict,
}

/// Per-column failure counts from one coercion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionStats {
  pub failures: BTreeMap<&'static str, usize>,
  /// Source columns with no catalog entry.
  pub ignored:  BTreeSet<String>,
}

impl CoercionStats {
  pub fn total_failures(&self) -> usize { self.failures.values().sum() }
}

// ─── Cells ───────────────────────────────────────────────────────────────────

/// Coerce one cell to `ty`. `Err` carries the lenient replacement.
pub fn coerce_cell(ty: ColumnType, value: Value) -> Result<Value, Value> {
  match ty {
    ColumnType::Integer => to_integer(value),
    ColumnType::Float => to_float(value),
    ColumnType::Text { .. } => to_text(value),
    ColumnType::DateTime => to_datetime(value),
  }
}

fn truncate(r: f64) -> Option<i64> {
  (r.is_finite() && r >= i64::MIN as f64 && r <= i64::MAX as f64).then(|| r.trunc() as i64)
}

fn to_integer(value: Value) -> Result<Value, Value> {
  let coerced = match &value {
    Value::Integer(i) => Some(*i),
    Value::Real(r) => truncate(*r),
    Value::Text(s) => {
      let s = s.trim();
      s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(truncate))
    }
    Value::Null | Value::Blob(_) | Value::DateTime(_) => None,
  };
  coerced.map(Value::Integer).ok_or(Value::Integer(0))
}

fn to_float(value: Value) -> Result<Value, Value> {
  match value {
    Value::Null => Ok(Value::Null),
    Value::Integer(i) => Ok(Value::Real(i as f64)),
    Value::Real(r) => Ok(Value::Real(r)),
    Value::Text(s) => s.trim().parse::<f64>().map(Value::Real).map_err(|_| Value::Null),
    Value::Blob(_) | Value::DateTime(_) => Err(Value::Null),
  }
}

fn to_text(value: Value) -> Result<Value, Value> {
  match value {
    Value::Null | Value::Text(_) => Ok(value),
    Value::Integer(i) => Ok(Value::Text(i.to_string())),
    Value::Real(r) => Ok(Value::Text(r.to_string())),
    Value::DateTime(dt) => Ok(Value::Text(dt.format(ISO_FORMAT).to_string())),
    Value::Blob(b) => Err(Value::Text(String::from_utf8_lossy(&b).into_owned())),
  }
}

fn to_datetime(value: Value) -> Result<Value, Value> {
  if value.is_null() {
    return Ok(Value::Null);
  }
  value.as_datetime().map(Value::DateTime).ok_or(Value::Null)
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Coerce `rows` into catalog order.
///
/// Audit columns the source lacks (or holds as `NULL`) are set to `now`.
/// Catalog columns absent from the source become `NULL` before coercion.
pub fn coerce_rows(
  rows: Vec<SourceRow>,
  mode: CoercionMode,
  now: NaiveDateTime,
) -> Result<(Vec<TypedRow>, CoercionStats)> {
  let mut stats = CoercionStats::default();
  let mut typed = Vec::with_capacity(rows.len());

  for (index, mut row) in rows.into_iter().enumerate() {
    let mut values = Vec::with_capacity(COLUMNS.len());
    for col in COLUMNS {
      let raw = match row.remove(col.name) {
        Some(v) if !v.is_null() => v,
        _ if col.is_audit() => Value::DateTime(now),
        _ => Value::Null,
      };
      values.push(coerce_column(col, raw, mode, index, &mut stats)?);
    }
    stats.ignored.extend(row.into_keys());
    typed.push(TypedRow::new(values)?);
  }

  for name in &stats.ignored {
    warn!(column = %name, "source column is not in the catalog; ignored");
  }
  for (column, count) in &stats.failures {
    warn!(column, count, "values could not be coerced and were replaced");
  }

  Ok((typed, stats))
}

fn coerce_column(
  col: &Column,
  raw: Value,
  mode: CoercionMode,
  row: usize,
  stats: &mut CoercionStats,
) -> Result<Value> {
  let shown = (mode == CoercionMode::Strict).then(|| raw.to_string());
  match coerce_cell(col.ty, raw) {
    Ok(value) => Ok(value),
    Err(_) if mode == CoercionMode::Strict => Err(SyncError::Coercion {
      row,
      column: col.name,
      expected: col.ty.name(),
      value: shown.unwrap_or_default(),
    }),
    Err(replacement) => {
      *stats.failures.entry(col.name).or_default() += 1;
      Ok(replacement)
    }
  }
}

#[cfg(test)]
mod tests {
  use udise_core::{
    columns::find,
    fixtures::{sample_record, ts},
  };

  use super::*;

  const TEXT: ColumnType = ColumnType::Text { max_len: 10 };

  fn text(s: &str) -> Value { Value::Text(s.to_string()) }

  #[test]
  fn integers() {
    use ColumnType::Integer;
    assert_eq!(coerce_cell(Integer, Value::Integer(7)), Ok(Value::Integer(7)));
    assert_eq!(coerce_cell(Integer, Value::Real(7.9)), Ok(Value::Integer(7)));
    assert_eq!(coerce_cell(Integer, text(" 42 ")), Ok(Value::Integer(42)));
    assert_eq!(coerce_cell(Integer, text("3.5")), Ok(Value::Integer(3)));
    assert_eq!(coerce_cell(Integer, text("n/a")), Err(Value::Integer(0)));
    assert_eq!(coerce_cell(Integer, Value::Null), Err(Value::Integer(0)));
    assert_eq!(coerce_cell(Integer, Value::Real(f64::NAN)), Err(Value::Integer(0)));
  }

  #[test]
  fn floats() {
    use ColumnType::Float;
    assert_eq!(coerce_cell(Float, Value::Integer(2)), Ok(Value::Real(2.0)));
    assert_eq!(coerce_cell(Float, text("12.5")), Ok(Value::Real(12.5)));
    assert_eq!(coerce_cell(Float, Value::Null), Ok(Value::Null));
    assert_eq!(coerce_cell(Float, text("north")), Err(Value::Null));
    assert_eq!(coerce_cell(Float, Value::Blob(vec![1])), Err(Value::Null));
  }

  #[test]
  fn texts() {
    assert_eq!(coerce_cell(TEXT, Value::Integer(5)), Ok(text("5")));
    assert_eq!(coerce_cell(TEXT, Value::Null), Ok(Value::Null));
    assert_eq!(
      coerce_cell(TEXT, Value::DateTime(ts(2020, 2, 3))),
      Ok(text("2020-02-03T00:00:00"))
    );
    assert_eq!(coerce_cell(TEXT, Value::Blob(b"ok".to_vec())), Err(text("ok")));
  }

  #[test]
  fn datetimes() {
    use ColumnType::DateTime;
    let expected = Ok(Value::DateTime(ts(2021, 5, 4)));
    assert_eq!(coerce_cell(DateTime, text("2021-05-04 00:00:00.000000")), expected);
    assert_eq!(coerce_cell(DateTime, text("2021-05-04")), expected);
    assert_eq!(coerce_cell(DateTime, Value::Integer(1_620_086_400)), expected);
    assert_eq!(coerce_cell(DateTime, text("yesterday")), Err(Value::Null));
    assert_eq!(coerce_cell(DateTime, Value::Null), Ok(Value::Null));
  }

  fn source_row(pairs: &[(&str, Value)]) -> SourceRow {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
  }

  #[test]
  fn rows_are_aligned_backfilled_and_counted() {
    let now = ts(2024, 1, 1);
    let row = source_row(&[
      ("Udise_code", text("101")),
      ("Latitude", text("bad")),
      ("Total_Students", text("many")),
      ("Timestamp", text("2023-06-01")),
      ("legacy_flag", Value::Integer(1)),
    ]);

    let (rows, stats) = coerce_rows(vec![row], CoercionMode::Lenient, now).unwrap();
    let values = rows[0].values();
    let at = |name| find(name).unwrap().0;

    assert_eq!(rows[0].udise_code(), Some(101));
    assert_eq!(values[at("Latitude")], Value::Null);
    assert_eq!(values[at("Total_Students")], Value::Integer(0));
    assert_eq!(values[at("State_Name")], Value::Null);
    assert_eq!(values[at("created_at")], Value::DateTime(now));
    assert_eq!(values[at("ingested_at")], Value::DateTime(now));
    assert_eq!(values[at("Timestamp")], Value::DateTime(ts(2023, 6, 1)));

    assert_eq!(stats.failures["Latitude"], 1);
    assert_eq!(stats.failures["Total_Students"], 1);
    // Missing integers are replaced with 0 and counted like garbage.
    assert_eq!(stats.failures["State_ID"], 1);
    assert!(!stats.failures.contains_key("State_Name"));
    assert!(stats.ignored.contains("legacy_flag"));
  }

  #[test]
  fn existing_audit_values_are_kept() {
    let row = source_row(&[("created_at", text("2019-01-01"))]);
    let (rows, _) = coerce_rows(vec![row], CoercionMode::Lenient, ts(2024, 1, 1)).unwrap();
    let at = find("created_at").unwrap().0;
    assert_eq!(rows[0].values()[at], Value::DateTime(ts(2019, 1, 1)));
  }

  fn full_row(code: i64) -> SourceRow {
    let row = sample_record(code, ts(2023, 1, 1)).to_row().unwrap();
    COLUMNS
      .iter()
      .map(|c| c.name.to_string())
      .zip(row.into_values())
      .collect()
  }

  #[test]
  fn strict_mode_accepts_well_typed_rows() {
    let (rows, stats) =
      coerce_rows(vec![full_row(1), full_row(2)], CoercionMode::Strict, ts(2024, 1, 1)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(stats.total_failures(), 0);
  }

  #[test]
  fn strict_mode_rejects_the_first_bad_value() {
    let mut bad = full_row(2);
    bad.insert("Udise_code".into(), text("x1"));

    let err = coerce_rows(vec![full_row(1), bad], CoercionMode::Strict, ts(2024, 1, 1)).unwrap_err();
    match err {
      SyncError::Coercion { row, column, .. } => {
        assert_eq!(row, 1);
        assert_eq!(column, "Udise_code");
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
