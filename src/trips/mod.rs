pub mod dto;
pub mod error;
pub mod model;
pub mod notification;
pub mod repository;
pub mod rto;

use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use dto::create_trip_dto::CreateTripDto;
use dto::get_trip_dto::GetTripDto;
use error::TripError;
use model::{check_schedule, Trip};
use notification::{trip_created_mail, NotificationJob};
use repository::trip_repository::{CreateTrip, TripRepository};
use rto::created_trip_rto::CreatedTripRto;
use rto::get_trip_rto::GetTripRto;
use validator::Validate;

use crate::mail::Mailbox;
use crate::AppState;

pub async fn get_trip<TR: TripRepository + 'static>(
  data: web::Data<AppState<TR>>,
  path: web::Path<GetTripDto>,
) -> Result<HttpResponse, TripError> {
  path.validate()?;
  data
    .trip_repository
    .find_one(&path.id)
    .await?
    .ok_or(TripError::NotFound)
    .map(trip_found)
}

fn trip_found(trip: Trip) -> HttpResponse {
  HttpResponse::Ok()
    .content_type("application/json")
    .json(GetTripRto::from(trip))
}

impl From<Trip> for GetTripRto {
  fn from(trip: Trip) -> Self {
    Self {
      id: trip.id,
      destination: trip.destination,
      starts_at: trip.starts_at,
      ends_at: trip.ends_at,
    }
  }
}

/// Validates the request, stores the trip and queues the owner's
/// confirmation mail. The mail goes out after the response; a delivery
/// failure never undoes the stored trip.
pub async fn create_trip<TR: TripRepository + 'static>(
  data: web::Data<AppState<TR>>,
  dto: web::Json<CreateTripDto>,
) -> Result<HttpResponse, TripError> {
  dto.validate()?;
  let dto = dto.into_inner();
  check_schedule(&dto.starts_at, &dto.ends_at, &Utc::now())?;

  let owner = Mailbox::new(dto.owner_name.clone(), dto.owner_email.clone());
  let trip = data.trip_repository.create(CreateTrip::from(dto)).await?;
  log::info!("Created trip {} to {}", trip.id, trip.destination);

  data.notifier.enqueue(NotificationJob {
    trip_id: trip.id.clone(),
    mail: trip_created_mail(&trip, owner),
  });
  Ok(trip_created(trip))
}

fn trip_created(trip: Trip) -> HttpResponse {
  HttpResponse::Created()
    .content_type("application/json")
    .append_header((header::LOCATION, format!("/trips/{}", trip.id)))
    .json(CreatedTripRto::from(trip))
}

impl From<CreateTripDto> for CreateTrip {
  fn from(dto: CreateTripDto) -> Self {
    Self {
      destination: dto.destination,
      starts_at: dto.starts_at,
      ends_at: dto.ends_at,
    }
  }
}

impl From<Trip> for CreatedTripRto {
  fn from(trip: Trip) -> Self {
    Self { trip_id: trip.id }
  }
}
