pub mod smtp;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
  #[error("Invalid address: {0}")]
  InvalidAddress(#[from] lettre::address::AddressError),

  #[error("Message error: {0}")]
  Message(#[from] lettre::error::Error),

  #[error("Transport error: {0}")]
  Transport(#[from] lettre::transport::smtp::Error),

  #[error("Relay did not answer within {0:?}")]
  Timeout(Duration),
}

impl MailError {
  /// Whether the same message could go through on a later attempt.
  pub fn is_transient(&self) -> bool {
    match self {
      MailError::Transport(_) | MailError::Timeout(_) => true,
      MailError::InvalidAddress(_) | MailError::Message(_) => false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
  pub name: String,
  pub address: String,
}

impl Mailbox {
  pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      address: address.into(),
    }
  }
}

/// A plain-text message ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
  pub from: Mailbox,
  pub to: Mailbox,
  pub subject: String,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
  pub response: String,
  /// Web link to the captured message, only set when the relay is a test
  /// inbox that exposes one.
  pub preview_url: Option<String>,
}

pub trait Mailer {
  async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, MailError>;
}

impl<M: Mailer> Mailer for Arc<M> {
  async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, MailError> {
    (**self).send(mail).await
  }
}
