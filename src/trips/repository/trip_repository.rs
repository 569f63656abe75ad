use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::{postgres::PgRow, Pool, Postgres};
use thiserror::Error;

use crate::custom_nanoid;
use crate::shared::database::Database;
use crate::trips::model::Trip;

#[derive(Debug, Error)]
pub enum TripRepositoryError {
  #[error("Database error: {0}")]
  DatabaseError(#[from] sqlx::Error),

  #[error("Other error: {0}")]
  Other(String),
}

pub trait TripRepository {
  async fn find_one(&self, id: &str) -> Result<Option<Trip>, TripRepositoryError>;
  async fn create(
    &self,
    create_trip: CreateTrip,
  ) -> Result<Trip, TripRepositoryError>;
}

pub struct TripRepositoryImpl {
  pool: Arc<Pool<Postgres>>,
}

impl TripRepositoryImpl {
  pub fn new(database: Arc<Database>) -> Self {
    Self {
      pool: database.pool.clone(),
    }
  }
}

impl TripRepository for TripRepositoryImpl {
  async fn find_one(&self, id: &str) -> Result<Option<Trip>, TripRepositoryError> {
    sqlx::query(
      "SELECT id, destination, starts_at, ends_at, created_at FROM trips WHERE id = $1 LIMIT 1",
    )
    .bind(id)
    .map(|row: PgRow| Trip::from(row))
    .fetch_optional(&*self.pool)
    .await
    .map_err(TripRepositoryError::from)
  }

  async fn create(
    &self,
    create_trip: CreateTrip,
  ) -> Result<Trip, TripRepositoryError> {
    let query = r#"
      INSERT INTO trips (id, destination, starts_at, ends_at)
      VALUES ($1, $2, $3, $4)
      RETURNING id, destination, starts_at, ends_at, created_at
    "#;
    sqlx::query(query)
      .bind(custom_nanoid())
      .bind(&create_trip.destination)
      .bind(create_trip.starts_at)
      .bind(create_trip.ends_at)
      .map(|row: PgRow| Trip::from(row))
      .fetch_one(&*self.pool)
      .await
      .map_err(TripRepositoryError::from)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTrip {
  pub destination: String,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
}

impl From<PgRow> for Trip {
  fn from(row: PgRow) -> Self {
    Self {
      id: row.get("id"),
      destination: row.get("destination"),
      starts_at: row.get::<DateTime<Utc>, _>("starts_at"),
      ends_at: row.get::<DateTime<Utc>, _>("ends_at"),
      created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
  }
}
