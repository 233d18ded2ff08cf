//! Lenient datetime parsing shared by the JSON wire format and sync coercion.
//!
//! Upstream writers are not consistent about datetime formats, so every
//! datetime in the dataset is treated as a naive UTC timestamp and parsed from
//! whichever of the accepted shapes matches first.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Format used when a datetime is written to JSON.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NAIVE_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M",
];

/// Parse `s` as RFC 3339 (converted to UTC), a naive ISO 8601 / SQL datetime,
/// or a bare date at midnight. Returns `None` for anything else.
pub fn parse_lenient(s: &str) -> Option<NaiveDateTime> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.naive_utc());
  }
  NAIVE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .or_else(|| {
      NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Interpret a number as seconds since the unix epoch.
pub fn from_unix_seconds(secs: f64) -> Option<NaiveDateTime> {
  if !secs.is_finite() {
    return None;
  }
  // Whole seconds round down so the fraction is never negative.
  let whole = secs.floor();
  let nanos = ((secs - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
  DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}

/// `#[serde(with = "...")]` adapter for required datetime fields.
pub mod lenient {
  use chrono::NaiveDateTime;
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&dt.format(super::ISO_FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(d)?;
    super::parse_lenient(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw:?}")))
  }
}

/// `#[serde(default, with = "...")]` adapter for optional datetime fields.
pub mod lenient_opt {
  use chrono::NaiveDateTime;
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(dt: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
    match dt {
      Some(dt) => s.collect_str(&dt.format(super::ISO_FORMAT)),
      None => s.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
    match Option::<String>::deserialize(d)? {
      None => Ok(None),
      Some(raw) => super::parse_lenient(&raw)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw:?}"))),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
  }

  #[test]
  fn accepts_every_documented_shape() {
    let want = at(2023, 5, 1, 10, 0, 0);
    assert_eq!(parse_lenient("2023-05-01T10:00:00Z"), Some(want));
    assert_eq!(parse_lenient("2023-05-01T15:30:00+05:30"), Some(want));
    assert_eq!(parse_lenient("2023-05-01T10:00:00"), Some(want));
    assert_eq!(parse_lenient("2023-05-01 10:00:00"), Some(want));
    assert_eq!(parse_lenient("2023-05-01 10:00"), Some(want));
    assert_eq!(parse_lenient(" 2023-05-01 "), Some(at(2023, 5, 1, 0, 0, 0)));
  }

  #[test]
  fn keeps_fractional_seconds() {
    let parsed = parse_lenient("2023-05-01 10:00:00.250000").unwrap();
    assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 250);
  }

  #[test]
  fn rejects_garbage() {
    assert_eq!(parse_lenient(""), None);
    assert_eq!(parse_lenient("not a date"), None);
    assert_eq!(parse_lenient("2023-13-45"), None);
  }

  #[test]
  fn unix_seconds() {
    assert_eq!(from_unix_seconds(0.0), Some(at(1970, 1, 1, 0, 0, 0)));
    assert_eq!(from_unix_seconds(f64::NAN), None);
  }

  #[test]
  fn negative_fractions_count_back_from_the_epoch() {
    let half_before = from_unix_seconds(-1.5).unwrap();
    assert_eq!(half_before.and_utc().timestamp(), -2);
    assert_eq!(half_before.and_utc().timestamp_subsec_millis(), 500);
    assert_eq!(from_unix_seconds(1.25).unwrap().and_utc().timestamp_subsec_millis(), 250);
  }
}
