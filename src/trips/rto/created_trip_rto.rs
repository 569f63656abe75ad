use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTripRto {
  #[serde(rename = "tripId")]
  pub trip_id: String,
}
