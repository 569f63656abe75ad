use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  Domain,
  NotFound,
  Infrastructure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpError {
  pub kind: ErrorKind,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details: Option<serde_json::Value>,
}

impl HttpError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      details: None,
    }
  }

  pub fn with_details(mut self, details: serde_json::Value) -> Self {
    self.details = Some(details);
    self
  }
}
