use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct GetTripRto {
  pub id: String,
  pub destination: String,
  #[serde(rename = "startsAt")]
  pub starts_at: DateTime<Utc>,
  #[serde(rename = "endsAt")]
  pub ends_at: DateTime<Utc>,
}
