use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use validator::ValidationErrors;

use crate::shared::http_error::{ErrorKind, HttpError};
use crate::trips::repository::trip_repository::TripRepositoryError;

/// Business rules a well-formed trip request can still break.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DomainError {
  #[error("Start date must be in the future")]
  StartNotInFuture,

  #[error("End date must be after the start date")]
  EndBeforeStart,
}

#[derive(Debug, Error)]
pub enum TripError {
  #[error("Invalid request: {0}")]
  Validation(#[from] ValidationErrors),

  #[error("Malformed request body: {0}")]
  MalformedBody(String),

  #[error(transparent)]
  Domain(#[from] DomainError),

  #[error("Trip not found")]
  NotFound,

  #[error("Repository failure: {0}")]
  Infrastructure(#[from] TripRepositoryError),
}

impl TripError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      TripError::Validation(_) | TripError::MalformedBody(_) => {
        ErrorKind::Validation
      }
      TripError::Domain(_) => ErrorKind::Domain,
      TripError::NotFound => ErrorKind::NotFound,
      TripError::Infrastructure(_) => ErrorKind::Infrastructure,
    }
  }
}

impl ResponseError for TripError {
  fn status_code(&self) -> StatusCode {
    match self.kind() {
      ErrorKind::Validation | ErrorKind::Domain => StatusCode::BAD_REQUEST,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let body = match self {
      TripError::Validation(errors) => {
        HttpError::new(self.kind(), "Invalid request")
          .with_details(serde_json::to_value(errors).unwrap_or_default())
      }
      TripError::Infrastructure(error) => {
        log::error!("Trip request failed: {}", error);
        HttpError::new(self.kind(), "Internal server error")
      }
      _ => HttpError::new(self.kind(), self.to_string()),
    };
    HttpResponse::build(self.status_code())
      .content_type("application/json")
      .json(body)
  }
}
