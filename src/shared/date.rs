use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Visitor};
use serde::Deserializer;

/// Deserializes a `DateTime<Utc>` from any of the representations clients
/// send: RFC 3339, a naive date-time with a `T` or space separator (taken
/// as UTC), a bare `YYYY-MM-DD` (UTC midnight) or epoch milliseconds,
/// fractional milliseconds truncated.
pub fn coerce_date_time<'de, D>(
  deserializer: D,
) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  deserializer.deserialize_any(DateTimeVisitor)
}

const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M",
];

pub fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
  let value = value.trim();
  if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
    return Some(date_time.with_timezone(&Utc));
  }
  let naive = NAIVE_DATE_TIME_FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok());
  if let Some(date_time) = naive {
    return Some(date_time.and_utc());
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|date_time| date_time.and_utc())
}

pub fn format_day(date_time: &DateTime<Utc>) -> String {
  date_time.format("%Y-%m-%d").to_string()
}

struct DateTimeVisitor;

impl<'de> Visitor<'de> for DateTimeVisitor {
  type Value = DateTime<Utc>;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a date string or a timestamp in milliseconds")
  }

  fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
    parse_date_time(value)
      .ok_or_else(|| E::custom(format!("invalid date: {value}")))
  }

  fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
    DateTime::from_timestamp_millis(value)
      .ok_or_else(|| E::custom(format!("timestamp out of range: {value}")))
  }

  fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
    i64::try_from(value)
      .ok()
      .and_then(DateTime::from_timestamp_millis)
      .ok_or_else(|| E::custom(format!("timestamp out of range: {value}")))
  }

  fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
    if !value.is_finite() {
      return Err(E::custom(format!("invalid timestamp: {value}")));
    }
    // Saturates out-of-range values, which the range check then rejects.
    DateTime::from_timestamp_millis(value.trunc() as i64)
      .ok_or_else(|| E::custom(format!("timestamp out of range: {value}")))
  }
}
