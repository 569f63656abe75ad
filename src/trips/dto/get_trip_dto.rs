use serde::Deserialize;
use validator_derive::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GetTripDto {
  #[validate(length(min = 1))]
  pub id: String,
}
