//! [`AdminRecord`]: one school facility snapshot.
//!
//! JSON keys are the table's column names, so the same record shape is used on
//! the wire and as the bridge to catalog-aligned [`TypedRow`]s.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

use crate::{
  Error, Result,
  columns::{COLUMNS, Column, ColumnType},
  datetime::{ISO_FORMAT, parse_lenient},
  value::{TypedRow, Value},
};

/// A school facility snapshot keyed by its UDISE code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
  #[serde(rename = "Udise_code")]
  pub udise_code: i64,

  // ── Location hierarchy ────────────────────────────────────────────────
  #[serde(rename = "State_ID")]
  pub state_id:              i64,
  #[serde(rename = "State_Name")]
  pub state_name:            String,
  #[serde(rename = "District_ID")]
  pub district_id:           i64,
  #[serde(rename = "District_name")]
  pub district_name:         String,
  #[serde(rename = "Block_ID")]
  pub block_id:              i64,
  #[serde(rename = "Block_name")]
  pub block_name:            String,
  #[serde(rename = "Cluster_ID")]
  pub cluster_id:            i64,
  #[serde(rename = "Cluster_name")]
  pub cluster_name:          String,
  #[serde(rename = "School_location_type")]
  pub school_location_type:  i64,
  #[serde(rename = "School_Name")]
  pub school_name:           String,
  #[serde(rename = "Latitude")]
  pub latitude:              f64,
  #[serde(rename = "Longitude")]
  pub longitude:             f64,

  // ── School profile ────────────────────────────────────────────────────
  #[serde(rename = "School_management_type")]
  pub school_management_type:     String,
  #[serde(rename = "Type_of_school")]
  pub type_of_school:             i64,
  #[serde(rename = "School_category_code")]
  pub school_category_code:       i64,
  #[serde(rename = "Is_Active")]
  pub is_active:                  String,
  #[serde(rename = "School_classification")]
  pub school_classification:      i64,
  #[serde(rename = "Minority_managed")]
  pub minority_managed:           i64,
  #[serde(rename = "lowest_class_in_school")]
  pub lowest_class_in_school:     i64,
  #[serde(rename = "Highest_class_in_school")]
  pub highest_class_in_school:    i64,
  #[serde(rename = "Total_Students")]
  pub total_students:             i64,
  #[serde(rename = "Total_Students_Boys")]
  pub total_students_boys:        i64,
  #[serde(rename = "Total_Students_girls")]
  pub total_students_girls:       i64,
  #[serde(rename = "Total_Teachers")]
  pub total_teachers:             i64,
  #[serde(rename = "Total_Teachers_Male")]
  pub total_teachers_male:        i64,
  #[serde(rename = "Total_Teachers_Female")]
  pub total_teachers_female:      i64,
  #[serde(rename = "Total_Teachers_Transgender")]
  pub total_teachers_transgender: i64,

  // ── Infrastructure / facilities ───────────────────────────────────────
  #[serde(rename = "Internet_Availability")]
  pub internet_availability:           i64,
  #[serde(rename = "Electricity_Availability")]
  pub electricity_availability:        i64,
  #[serde(rename = "Smart_Classrooms_Availability")]
  pub smart_classrooms_availability:   i64,
  #[serde(rename = "Toilet_Availability")]
  pub toilet_availability:             i64,
  #[serde(rename = "Total_Boys_Toilet")]
  pub total_boys_toilet:               i64,
  #[serde(rename = "Total_Girls_Toilet")]
  pub total_girls_toilet:              i64,
  #[serde(rename = "Drinking_Water_Availability")]
  pub drinking_water_availability:     i64,
  #[serde(rename = "Boundary_wall_type")]
  pub boundary_wall_type:              i64,
  #[serde(rename = "Fire_extinguisher_available")]
  pub fire_extinguisher_available:     i64,
  #[serde(rename = "year_of_establishment", with = "crate::datetime::lenient")]
  pub year_of_establishment:           NaiveDateTime,
  #[serde(rename = "Free_uniform")]
  pub free_uniform:                    i64,
  #[serde(rename = "Free_Textbook_primary")]
  pub free_textbook_primary:           i64,
  #[serde(rename = "Free_Textbook_upper_primary")]
  pub free_textbook_upper_primary:     i64,
  #[serde(rename = "Actual_Teaching_Days")]
  pub actual_teaching_days:            i64,
  #[serde(rename = "SMC_Formation_date", with = "crate::datetime::lenient")]
  pub smc_formation_date:              NaiveDateTime,
  #[serde(rename = "SMC_Status")]
  pub smc_status:                      String,
  #[serde(rename = "Total_SMC_Members")]
  pub total_smc_members:               i64,
  #[serde(rename = "Is_ICT_lab")]
  pub is_ict_lab:                      i64,
  #[serde(rename = "Total_Laptops")]
  pub total_laptops:                   i64,
  #[serde(rename = "Total_Functional_desktops")]
  pub total_functional_desktops:       i64,
  #[serde(rename = "Total_Functional_laptops")]
  pub total_functional_laptops:        i64,
  #[serde(rename = "Total_Functional_Tablets")]
  pub total_functional_tablets:        i64,
  #[serde(rename = "Total_Functional_digital_boards")]
  pub total_functional_digital_boards: i64,
  #[serde(rename = "Total_Functional_projectors")]
  pub total_functional_projectors:     i64,

  // ── Audit / sync tracking ─────────────────────────────────────────────
  /// Defaulted to the write time when absent.
  #[serde(default, with = "crate::datetime::lenient_opt")]
  pub created_at:  Option<NaiveDateTime>,
  /// Defaulted to the write time when absent; refreshed on every upsert.
  #[serde(default, with = "crate::datetime::lenient_opt")]
  pub updated_at:  Option<NaiveDateTime>,
  #[serde(default, with = "crate::datetime::lenient_opt")]
  pub ingested_at: Option<NaiveDateTime>,
  /// Upstream mutation watermark. Never maintained by this system.
  #[serde(rename = "Timestamp", with = "crate::datetime::lenient")]
  pub timestamp:   NaiveDateTime,
}

impl AdminRecord {
  /// Fill any missing audit field with `now`.
  pub fn stamp_audit(&mut self, now: NaiveDateTime) {
    self.created_at.get_or_insert(now);
    self.updated_at.get_or_insert(now);
    self.ingested_at.get_or_insert(now);
  }

  /// [`stamp_audit`](Self::stamp_audit) with the current UTC time.
  pub fn stamp_audit_now(&mut self) { self.stamp_audit(Utc::now().naive_utc()) }

  /// Convert to a catalog-aligned row.
  pub fn to_row(&self) -> Result<TypedRow> {
    let mut object: Map<String, Json> = serde_json::from_value(serde_json::to_value(self)?)?;

    let values = COLUMNS
      .iter()
      .map(|col| json_to_cell(col, object.remove(col.name).unwrap_or(Json::Null)))
      .collect::<Result<Vec<_>>>()?;

    TypedRow::new(values)
  }

  /// Rebuild a record from a catalog-aligned row read back from storage.
  pub fn from_row(row: TypedRow) -> Result<Self> {
    let mut object = Map::with_capacity(COLUMNS.len());
    for (col, value) in COLUMNS.iter().zip(row.into_values()) {
      object.insert(col.name.to_owned(), cell_to_json(col, value)?);
    }
    Ok(serde_json::from_value(Json::Object(object))?)
  }
}

fn mismatch(col: &Column, found: impl ToString) -> Error {
  Error::ColumnType {
    column:   col.name,
    expected: col.ty.name(),
    found:    found.to_string(),
  }
}

fn json_to_cell(col: &Column, json: Json) -> Result<Value> {
  let cell = match (col.ty, json) {
    (_, Json::Null) => Value::Null,
    (ColumnType::Integer, Json::Number(n)) => {
      Value::Integer(n.as_i64().ok_or_else(|| mismatch(col, &n))?)
    }
    (ColumnType::Float, Json::Number(n)) => {
      Value::Real(n.as_f64().ok_or_else(|| mismatch(col, &n))?)
    }
    (ColumnType::Text { .. }, Json::String(s)) => Value::Text(s),
    (ColumnType::DateTime, Json::String(s)) => {
      Value::DateTime(parse_lenient(&s).ok_or_else(|| mismatch(col, &s))?)
    }
    (_, other) => return Err(mismatch(col, other)),
  };
  Ok(cell)
}

fn cell_to_json(col: &Column, value: Value) -> Result<Json> {
  let json = match value {
    Value::Null => Json::Null,
    Value::Integer(i) => Json::Number(i.into()),
    Value::Real(r) => Number::from_f64(r).map_or(Json::Null, Json::Number),
    Value::Text(s) => Json::String(s),
    Value::DateTime(dt) => Json::String(dt.format(ISO_FORMAT).to_string()),
    Value::Blob(_) => return Err(mismatch(col, "blob")),
  };
  Ok(json)
}
