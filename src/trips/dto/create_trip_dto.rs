use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator_derive::Validate;

use crate::shared::date::coerce_date_time;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTripDto {
  #[validate(length(min = 4))]
  pub destination: String,
  #[serde(deserialize_with = "coerce_date_time")]
  pub starts_at: DateTime<Utc>,
  #[serde(deserialize_with = "coerce_date_time")]
  pub ends_at: DateTime<Utc>,
  pub owner_name: String,
  #[validate(email)]
  pub owner_email: String,
}
