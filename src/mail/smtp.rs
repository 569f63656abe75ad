use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, Mailbox, Mailer, OutgoingMail, SentMail};
use crate::shared::config::Config;

const ETHEREAL_HOST: &str = "ethereal.email";
const ETHEREAL_MESSAGE_URL: &str = "https://ethereal.email/message/";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SmtpMailer {
  host: String,
  transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
  pub fn new(config: &Config) -> Result<Self, MailError> {
    let mut builder =
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        .port(config.smtp_port);
    if let (Some(username), Some(password)) =
      (&config.smtp_username, &config.smtp_password)
    {
      builder =
        builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    Ok(Self {
      host: config.smtp_host.clone(),
      transport: builder.build(),
    })
  }
}

impl Mailer for SmtpMailer {
  async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, MailError> {
    let message = Message::builder()
      .from(to_lettre_mailbox(&mail.from)?)
      .to(to_lettre_mailbox(&mail.to)?)
      .subject(mail.subject.as_str())
      .header(ContentType::TEXT_PLAIN)
      .body(mail.text.clone())?;

    let delivery = self.transport.send(message);
    let response = tokio::time::timeout(SEND_TIMEOUT, delivery)
      .await
      .map_err(|_| MailError::Timeout(SEND_TIMEOUT))??;
    let response = format!(
      "{} {}",
      response.code(),
      response.message().collect::<Vec<_>>().join(" ")
    );
    Ok(SentMail {
      preview_url: test_message_url(&self.host, &response),
      response,
    })
  }
}

fn to_lettre_mailbox(
  mailbox: &Mailbox,
) -> Result<lettre::message::Mailbox, MailError> {
  Ok(lettre::message::Mailbox::new(
    Some(mailbox.name.clone()),
    mailbox.address.parse()?,
  ))
}

/// Ethereal answers a delivered message with `... MSGID=<id> ...`, which
/// maps onto a browsable copy of the message.
pub fn test_message_url(host: &str, response: &str) -> Option<String> {
  if !host.ends_with(ETHEREAL_HOST) {
    return None;
  }
  let start = response.find("MSGID=")? + "MSGID=".len();
  let id: String = response[start..]
    .chars()
    .take_while(|c| !c.is_whitespace() && *c != ']')
    .collect();
  if id.is_empty() {
    return None;
  }
  Some(format!("{ETHEREAL_MESSAGE_URL}{id}"))
}
