//! Sample records for tests across the workspace.
//!
//! Enabled inside this crate's own tests and, for downstream crates, through
//! the `fixtures` feature in `[dev-dependencies]`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::record::AdminRecord;

/// Midnight on the given calendar date.
pub fn ts(year: i32, month: u32, day: u32) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(year, month, day)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .expect("valid fixture date")
}

/// A fully-populated record with the given key and watermark. Audit fields
/// are left unset so stores and services stamp them.
pub fn sample_record(udise_code: i64, timestamp: NaiveDateTime) -> AdminRecord {
  AdminRecord {
    udise_code,
    state_id:                        29,
    state_name:                      "Karnataka".into(),
    district_id:                     2901,
    district_name:                   "Bengaluru Urban".into(),
    block_id:                        290_101,
    block_name:                      "Anekal".into(),
    cluster_id:                      29_010_101,
    cluster_name:                    "Attibele".into(),
    school_location_type:            1,
    school_name:                     format!("Government Higher Primary School {udise_code}"),
    latitude:                        12.7797,
    longitude:                       77.7710,
    school_management_type:          "Department of Education".into(),
    type_of_school:                  3,
    school_category_code:            2,
    is_active:                       "Y".into(),
    school_classification:           1,
    minority_managed:                0,
    lowest_class_in_school:          1,
    highest_class_in_school:         8,
    total_students:                  412,
    total_students_boys:             198,
    total_students_girls:            214,
    total_teachers:                  14,
    total_teachers_male:             5,
    total_teachers_female:           9,
    total_teachers_transgender:      0,
    internet_availability:           1,
    electricity_availability:        1,
    smart_classrooms_availability:   2,
    toilet_availability:             1,
    total_boys_toilet:               4,
    total_girls_toilet:              5,
    drinking_water_availability:     1,
    boundary_wall_type:              2,
    fire_extinguisher_available:     1,
    year_of_establishment:           ts(1978, 6, 1),
    free_uniform:                    1,
    free_textbook_primary:           1,
    free_textbook_upper_primary:     1,
    actual_teaching_days:            220,
    smc_formation_date:              ts(2016, 7, 15),
    smc_status:                      "Active".into(),
    total_smc_members:               12,
    is_ict_lab:                      1,
    total_laptops:                   10,
    total_functional_desktops:       6,
    total_functional_laptops:        9,
    total_functional_tablets:        0,
    total_functional_digital_boards: 1,
    total_functional_projectors:     2,
    created_at:                      None,
    updated_at:                      None,
    ingested_at:                     None,
    timestamp,
  }
}

/// `count` records with keys `first..first + count` and watermarks one day
/// apart starting at `start`.
pub fn sample_records(first: i64, count: usize, start: NaiveDateTime) -> Vec<AdminRecord> {
  (0..count)
    .map(|i| sample_record(first + i as i64, start + chrono::Duration::days(i as i64)))
    .collect()
}
