//! The column catalog of the `admin` table.
//!
//! Column order here is the canonical order used by [`TypedRow`], by the DDL
//! the storage backends generate, and by the sync job's coercion pass. Names
//! are also the JSON keys of [`AdminRecord`].
//!
//! [`TypedRow`]: crate::value::TypedRow
//! [`AdminRecord`]: crate::record::AdminRecord

/// Name of the table holding admin records in every backend.
pub const TABLE: &str = "admin";

/// Primary key column.
pub const PRIMARY_KEY: &str = "Udise_code";

/// Mutation watermark column used as the incremental sync cursor.
pub const WATERMARK: &str = "Timestamp";

/// Audit columns that default to the current time when absent.
pub const AUDIT_COLUMNS: [&str; 3] = ["created_at", "updated_at", "ingested_at"];

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
  Integer,
  Float,
  /// Bounded text; the bound is enforced by the backend.
  Text { max_len: usize },
  DateTime,
}

impl ColumnType {
  pub fn name(self) -> &'static str {
    match self {
      ColumnType::Integer => "integer",
      ColumnType::Float => "float",
      ColumnType::Text { .. } => "text",
      ColumnType::DateTime => "datetime",
    }
  }
}

/// One entry of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
  pub name:     &'static str,
  pub ty:       ColumnType,
  /// Required columns are `NOT NULL` in the table.
  pub required: bool,
}

impl Column {
  pub fn is_audit(&self) -> bool { AUDIT_COLUMNS.contains(&self.name) }
}

const fn int(name: &'static str) -> Column {
  Column { name, ty: ColumnType::Integer, required: true }
}

const fn float(name: &'static str) -> Column {
  Column { name, ty: ColumnType::Float, required: true }
}

const fn text(name: &'static str, max_len: usize) -> Column {
  Column { name, ty: ColumnType::Text { max_len }, required: true }
}

const fn datetime(name: &'static str) -> Column {
  Column { name, ty: ColumnType::DateTime, required: true }
}

const fn audit(name: &'static str) -> Column {
  Column { name, ty: ColumnType::DateTime, required: false }
}

/// Every column of the `admin` table, in canonical order.
pub const COLUMNS: &[Column] = &[
  int("Udise_code"),
  // ── location hierarchy ──
  int("State_ID"),
  text("State_Name", 200),
  int("District_ID"),
  text("District_name", 200),
  int("Block_ID"),
  text("Block_name", 200),
  int("Cluster_ID"),
  text("Cluster_name", 200),
  int("School_location_type"),
  text("School_Name", 300),
  float("Latitude"),
  float("Longitude"),
  text("School_management_type", 150),
  int("Type_of_school"),
  int("School_category_code"),
  text("Is_Active", 10),
  int("School_classification"),
  int("Minority_managed"),
  int("lowest_class_in_school"),
  int("Highest_class_in_school"),
  int("Total_Students"),
  int("Total_Students_Boys"),
  int("Total_Students_girls"),
  int("Total_Teachers"),
  int("Total_Teachers_Male"),
  int("Total_Teachers_Female"),
  int("Total_Teachers_Transgender"),
  // ── infrastructure / facilities ──
  int("Internet_Availability"),
  int("Electricity_Availability"),
  int("Smart_Classrooms_Availability"),
  int("Toilet_Availability"),
  int("Total_Boys_Toilet"),
  int("Total_Girls_Toilet"),
  int("Drinking_Water_Availability"),
  int("Boundary_wall_type"),
  int("Fire_extinguisher_available"),
  datetime("year_of_establishment"),
  int("Free_uniform"),
  int("Free_Textbook_primary"),
  int("Free_Textbook_upper_primary"),
  int("Actual_Teaching_Days"),
  datetime("SMC_Formation_date"),
  text("SMC_Status", 50),
  int("Total_SMC_Members"),
  int("Is_ICT_lab"),
  int("Total_Laptops"),
  int("Total_Functional_desktops"),
  int("Total_Functional_laptops"),
  int("Total_Functional_Tablets"),
  int("Total_Functional_digital_boards"),
  int("Total_Functional_projectors"),
  // ── audit / sync tracking ──
  audit("created_at"),
  audit("updated_at"),
  audit("ingested_at"),
  datetime("Timestamp"),
];

/// Look up a column by exact name.
pub fn find(name: &str) -> Option<(usize, &'static Column)> {
  COLUMNS.iter().enumerate().find(|(_, c)| c.name == name)
}
