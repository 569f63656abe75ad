mod helpers;
mod mail;
mod shared;
mod trips;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use mail::smtp::SmtpMailer;
use nanoid::nanoid;
use shared::config::Config;
use shared::database::Database;
use trips::error::TripError;
use trips::notification::{NotificationWorker, TripNotifier};
use trips::repository::trip_repository::{TripRepository, TripRepositoryImpl};
use trips::{create_trip, get_trip};

const ID_ALPHABET: [char; 62] = [
  '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e',
  'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't',
  'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
  'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X',
  'Y', 'Z',
];

/// URL-safe identifier without `-` and `_`.
pub fn custom_nanoid() -> String {
  nanoid!(21, &ID_ALPHABET)
}

// This struct represents state
pub struct AppState<TR: TripRepository> {
  pub trip_repository: TR,
  pub notifier: TripNotifier,
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  env_logger::Builder::from_env(
    env_logger::Env::default().default_filter_or("info"),
  )
  .init();

  let app_config = Config::default();

  let database = Database::connect(&app_config.database_url)
    .await
    .map_err(io::Error::other)?;
  let database = Arc::new(database);

  let mailer = SmtpMailer::new(&app_config).map_err(io::Error::other)?;
  let (notifier, receiver) = TripNotifier::channel();
  let shutdown_timeout =
    Duration::from_millis(app_config.notification_shutdown_timeout_ms);
  let worker = NotificationWorker::new(
    mailer,
    app_config.notification_max_attempts,
    Duration::from_millis(app_config.notification_retry_delay_ms),
  )
  .with_shutdown_timeout(shutdown_timeout);
  let worker_handle = actix_web::rt::spawn(worker.run(receiver));

  log::info!("Listening on http://{}", app_config.server_address);

  let served = HttpServer::new(move || {
    let database = database.clone();
    let notifier = notifier.clone();
    App::new().wrap(Logger::default()).configure(move |cfg| {
      let trip_repository = TripRepositoryImpl::new(database);
      config(cfg, trip_repository, notifier)
    })
  })
  .bind(&app_config.server_address)?
  .run()
  .await;

  // The server's notifier clones are gone now, so the worker drains what
  // is still queued and returns.
  let grace = shutdown_timeout + Duration::from_secs(1);
  match tokio::time::timeout(grace, worker_handle).await {
    Ok(Ok(0)) => {}
    Ok(Ok(abandoned)) => {
      log::warn!("Shut down with {} undelivered notifications", abandoned)
    }
    Ok(Err(error)) => log::error!("Notification worker failed: {}", error),
    Err(_) => log::error!("Notification worker did not stop within {:?}", grace),
  }
  served
}

// Function to initialize the App
fn config<TR: TripRepository + 'static>(
  config: &mut web::ServiceConfig,
  trip_repository: TR,
  notifier: TripNotifier,
) {
  // Rate limit
  // Allow bursts with up to five requests per IP address
  // and replenishes two elements per second
  let governor_config = GovernorConfigBuilder::default()
    .requests_per_second(2)
    .burst_size(5)
    .finish()
    .expect("rate limit quota is non-zero");

  // Bodies that fail to parse (bad JSON, uncoercible dates, missing
  // fields) answer with the same error shape as field validation.
  let json_config = web::JsonConfig::default().error_handler(|error, _| {
    TripError::MalformedBody(error.to_string()).into()
  });

  config
    .app_data(web::Data::new(AppState {
      trip_repository,
      notifier,
    }))
    .app_data(json_config)
    .service(
      web::scope("/trips")
        .wrap(Governor::new(&governor_config))
        .route("", web::post().to(create_trip::<TR>))
        .route("/{id}", web::get().to(get_trip::<TR>)),
    );
}
