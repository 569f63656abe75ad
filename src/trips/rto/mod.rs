pub mod created_trip_rto;
pub mod get_trip_rto;
