use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::mail::{MailError, Mailbox, Mailer, OutgoingMail, SentMail};
use crate::shared::date::format_day;
use crate::trips::model::Trip;

pub const SENDER_NAME: &str = "NoReply Plann.er Team";
pub const SENDER_ADDRESS: &str = "noreply@plann.er";
pub const TRIP_CREATED_SUBJECT: &str = "New Trip Created";

pub fn trip_created_mail(trip: &Trip, owner: Mailbox) -> OutgoingMail {
  OutgoingMail {
    from: Mailbox::new(SENDER_NAME, SENDER_ADDRESS),
    to: owner,
    subject: String::from(TRIP_CREATED_SUBJECT),
    text: format!(
      "Your trip to {} has been scheduled from {} to {}.",
      trip.destination,
      format_day(&trip.starts_at),
      format_day(&trip.ends_at)
    ),
  }
}

#[derive(Debug, Clone)]
pub struct NotificationJob {
  pub trip_id: String,
  pub mail: OutgoingMail,
}

/// Handle the request path uses to queue notifications. Cloning is cheap;
/// every clone feeds the same worker.
#[derive(Clone)]
pub struct TripNotifier {
  sender: mpsc::UnboundedSender<NotificationJob>,
}

impl TripNotifier {
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationJob>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }

  /// Never fails the caller: the trip is already stored, so a lost
  /// notification is logged and dropped.
  pub fn enqueue(&self, job: NotificationJob) {
    if let Err(error) = self.sender.send(job) {
      log::error!(
        "Notification worker is gone, dropping mail for trip {}",
        error.0.trip_id
      );
    }
  }
}

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct NotificationWorker<M: Mailer> {
  mailer: M,
  max_attempts: u32,
  retry_delay: Duration,
  shutdown_timeout: Duration,
}

impl<M: Mailer + 'static> NotificationWorker<M> {
  pub fn new(mailer: M, max_attempts: u32, retry_delay: Duration) -> Self {
    Self {
      mailer,
      max_attempts: max_attempts.max(1),
      retry_delay,
      shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
    }
  }

  /// How long `run` keeps draining in-flight deliveries once the queue
  /// closes.
  pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
    self.shutdown_timeout = shutdown_timeout;
    self
  }

  /// Consumes jobs until every [`TripNotifier`] is dropped. Each job is
  /// delivered on its own local task so one retrying job does not hold up
  /// the rest. Must be called from within the actix runtime.
  ///
  /// Returns once every queued mail reached a final outcome, or the
  /// shutdown timeout ran out; the result is the number of mails abandoned
  /// at that point.
  pub async fn run(
    self,
    mut receiver: mpsc::UnboundedReceiver<NotificationJob>,
  ) -> usize {
    let shutdown_timeout = self.shutdown_timeout;
    let worker = Rc::new(self);
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

    while let Some(job) = receiver.recv().await {
      in_flight.retain(|handle| !handle.is_finished());
      let worker = worker.clone();
      in_flight.push(actix_web::rt::spawn(async move {
        worker.notify(job).await;
      }));
    }

    log::info!(
      "Notification queue closed, waiting for {} pending deliveries",
      in_flight.iter().filter(|handle| !handle.is_finished()).count()
    );
    let drained = tokio::time::timeout(shutdown_timeout, async {
      for handle in in_flight.iter_mut() {
        if let Err(error) = handle.await {
          log::error!("Notification task failed: {}", error);
        }
      }
    })
    .await;

    let abandoned = match drained {
      Ok(()) => 0,
      Err(_) => {
        let pending: Vec<_> = in_flight
          .iter()
          .filter(|handle| !handle.is_finished())
          .collect();
        pending.iter().for_each(|handle| handle.abort());
        pending.len()
      }
    };
    if abandoned > 0 {
      log::error!(
        "Notification worker stopped after {:?}, {} mails were never delivered",
        shutdown_timeout,
        abandoned
      );
    } else {
      log::info!("Notification worker stopped");
    }
    abandoned
  }

  async fn notify(&self, job: NotificationJob) {
    if self.deliver(&job).await.is_err() {
      log::debug!("Dropped trip {} notification", job.trip_id);
    }
  }

  /// Sends one job, retrying transient relay failures with exponential
  /// backoff. Permanent failures (bad address, unbuildable message) are
  /// not retried.
  pub async fn deliver(&self, job: &NotificationJob) -> Result<SentMail, MailError> {
    let mut attempt = 1;
    loop {
      match self.mailer.send(&job.mail).await {
        Ok(sent) => {
          log::info!(
            "Sent trip {} notification (attempt {}): {}",
            job.trip_id,
            attempt,
            sent.response
          );
          log::debug!(
            "Trip {} notification sent to {}",
            job.trip_id,
            job.mail.to.address
          );
          if let Some(preview_url) = &sent.preview_url {
            log::info!("Message preview: {}", preview_url);
          }
          return Ok(sent);
        }
        Err(error) if error.is_transient() && attempt < self.max_attempts => {
          let delay = self.backoff(attempt);
          log::warn!(
            "Trip {} notification attempt {}/{} failed: {}; retrying in {:?}",
            job.trip_id,
            attempt,
            self.max_attempts,
            error,
            delay
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(error) => {
          log::error!(
            "Giving up on trip {} notification after {} attempts: {}",
            job.trip_id,
            attempt,
            error
          );
          return Err(error);
        }
      }
    }
  }

  fn backoff(&self, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
    self.retry_delay.saturating_mul(factor)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;
  use std::sync::Arc;

  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::mail::tests::InMemoryMailer;

  fn trip() -> Trip {
    Trip {
      id: String::from("trip-1"),
      destination: String::from("Florianópolis"),
      starts_at: Utc.with_ymd_and_hms(2099, 1, 10, 0, 0, 0).unwrap(),
      ends_at: Utc.with_ymd_and_hms(2099, 1, 20, 0, 0, 0).unwrap(),
      created_at: Utc::now(),
    }
  }

  fn job() -> NotificationJob {
    NotificationJob {
      trip_id: String::from("trip-1"),
      mail: trip_created_mail(
        &trip(),
        Mailbox::new("Alice", "alice@example.com"),
      ),
    }
  }

  #[test]
  fn test_trip_created_mail() {
    let mail = trip_created_mail(
      &trip(),
      Mailbox::new("Alice", "alice@example.com"),
    );

    assert_eq!(mail.from, Mailbox::new(SENDER_NAME, SENDER_ADDRESS));
    assert_eq!(mail.to.address, "alice@example.com");
    assert_eq!(mail.to.name, "Alice");
    assert_eq!(mail.subject, "New Trip Created");
    assert_eq!(
      mail.text,
      "Your trip to Florianópolis has been scheduled from 2099-01-10 to 2099-01-20."
    );
  }

  #[actix_rt::test]
  async fn test_deliver_retries_until_success() {
    let mailer = Arc::new(InMemoryMailer::failing(2));
    let worker =
      NotificationWorker::new(mailer.clone(), 3, Duration::from_millis(1));

    let sent = worker.deliver(&job()).await;

    assert!(sent.is_ok());
    assert_eq!(mailer.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(mailer.sent().len(), 1);
  }

  #[actix_rt::test]
  async fn test_deliver_gives_up_after_max_attempts() {
    let mailer = Arc::new(InMemoryMailer::failing(10));
    let worker =
      NotificationWorker::new(mailer.clone(), 2, Duration::from_millis(1));

    let sent = worker.deliver(&job()).await;

    assert!(matches!(sent, Err(MailError::Timeout(_))));
    assert_eq!(mailer.attempts.load(Ordering::SeqCst), 2);
    assert!(mailer.sent().is_empty());
  }

  #[actix_rt::test]
  async fn test_deliver_does_not_retry_rejected_address() {
    let mailer = Arc::new(InMemoryMailer::new());
    let worker =
      NotificationWorker::new(mailer.clone(), 5, Duration::from_millis(1));
    let mut job = job();
    job.mail.to = Mailbox::new("Alice", "not-an-address");

    let sent = worker.deliver(&job).await;

    assert!(matches!(sent, Err(MailError::InvalidAddress(_))));
    assert_eq!(mailer.attempts.load(Ordering::SeqCst), 1);
    assert!(mailer.sent().is_empty());
  }

  #[actix_rt::test]
  async fn test_deliver_passes_preview_url_through() {
    let mailer = Arc::new(
      InMemoryMailer::new()
        .with_preview_url("https://ethereal.email/message/abc123"),
    );
    let worker =
      NotificationWorker::new(mailer.clone(), 1, Duration::from_millis(1));

    let sent = worker.deliver(&job()).await.unwrap();

    assert_eq!(
      sent.preview_url.as_deref(),
      Some("https://ethereal.email/message/abc123")
    );
    assert_eq!(mailer.sent().len(), 1);
  }

  #[test]
  fn test_backoff_doubles() {
    let worker = NotificationWorker::new(
      InMemoryMailer::new(),
      40,
      Duration::from_millis(100),
    );
    assert_eq!(worker.backoff(1), Duration::from_millis(100));
    assert_eq!(worker.backoff(2), Duration::from_millis(200));
    assert_eq!(worker.backoff(4), Duration::from_millis(800));
    assert_eq!(worker.backoff(40), Duration::from_millis(100) * u32::MAX);
  }

  #[actix_rt::test]
  async fn test_run_drains_queue() {
    let mailer = Arc::new(InMemoryMailer::new());
    let (notifier, receiver) = TripNotifier::channel();
    let worker =
      NotificationWorker::new(mailer.clone(), 1, Duration::from_millis(1));

    notifier.enqueue(job());
    notifier.enqueue(job());
    drop(notifier);
    let abandoned = worker.run(receiver).await;

    assert_eq!(abandoned, 0);
    assert_eq!(mailer.sent().len(), 2);
  }

  #[actix_rt::test]
  async fn test_run_waits_for_retrying_delivery_on_shutdown() {
    let mailer = Arc::new(InMemoryMailer::failing(2));
    let (notifier, receiver) = TripNotifier::channel();
    let worker =
      NotificationWorker::new(mailer.clone(), 3, Duration::from_millis(20));

    notifier.enqueue(job());
    drop(notifier);
    let abandoned = worker.run(receiver).await;

    // The queue is already closed when the first attempt fails.
    assert_eq!(abandoned, 0);
    assert_eq!(mailer.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(mailer.sent().len(), 1);
  }

  #[actix_rt::test]
  async fn test_run_waits_for_exhausted_delivery_on_shutdown() {
    let mailer = Arc::new(InMemoryMailer::failing(10));
    let (notifier, receiver) = TripNotifier::channel();
    let worker =
      NotificationWorker::new(mailer.clone(), 2, Duration::from_millis(20));

    notifier.enqueue(job());
    drop(notifier);
    let abandoned = worker.run(receiver).await;

    assert_eq!(abandoned, 0);
    assert_eq!(mailer.attempts.load(Ordering::SeqCst), 2);
    assert!(mailer.sent().is_empty());
  }

  #[actix_rt::test]
  async fn test_run_abandons_deliveries_after_shutdown_timeout() {
    let mailer = Arc::new(InMemoryMailer::failing(100));
    let (notifier, receiver) = TripNotifier::channel();
    let worker =
      NotificationWorker::new(mailer.clone(), 10, Duration::from_secs(5))
        .with_shutdown_timeout(Duration::from_millis(50));

    notifier.enqueue(job());
    notifier.enqueue(job());
    drop(notifier);
    let abandoned = tokio::time::timeout(
      Duration::from_secs(2),
      worker.run(receiver),
    )
    .await
    .expect("run returns once the shutdown timeout elapses");

    assert_eq!(abandoned, 2);
    assert!(mailer.sent().is_empty());
  }

  #[test]
  fn test_enqueue_without_worker_does_not_panic() {
    let (notifier, receiver) = TripNotifier::channel();
    drop(receiver);
    notifier.enqueue(job());
  }
}
