use chrono::{DateTime, Utc};

use crate::trips::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
  pub id: String,
  pub destination: String,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

/// A trip must start no earlier than `now` and may not end before it starts.
/// Both bounds are inclusive: a trip starting exactly at `now`, or ending
/// the instant it starts, is accepted.
pub fn check_schedule(
  starts_at: &DateTime<Utc>,
  ends_at: &DateTime<Utc>,
  now: &DateTime<Utc>,
) -> Result<(), DomainError> {
  if starts_at < now {
    return Err(DomainError::StartNotInFuture);
  }
  if ends_at < starts_at {
    return Err(DomainError::EndBeforeStart);
  }
  Ok(())
}
