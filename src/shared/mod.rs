pub mod config;
pub mod database;
pub mod date;
pub mod http_error;
