use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
  #[error("Connection error: {0}")]
  Connection(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),
}

pub struct Database {
  pub pool: Arc<Pool<Postgres>>,
}

impl Database {
  pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
    let pool = prepare_pool(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Self { pool: Arc::new(pool) })
  }
}

pub async fn prepare_pool(
  database_url: &str,
) -> Result<Pool<Postgres>, sqlx::Error> {
  PgPoolOptions::new()
    .max_connections(10)
    .connect(database_url)
    .await
}
