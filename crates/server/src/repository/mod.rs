mod enrollment_repository;
mod result_repository;
mod submission_repository;

pub use enrollment_repository::SeaOrmEnrollmentRepository;
pub use result_repository::SeaOrmResultRepository;
pub use submission_repository::SeaOrmSubmissionRepository;

use chrono::{DateTime, NaiveDateTime, Utc};
use gradebook_core::domain::StoreError;
use sea_orm::{ConnAcquireErr, DbErr};
use std::str::FromStr;

pub(crate) fn map_db_err(err: DbErr) -> StoreError {
    match err {
        DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => StoreError::Timeout,
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Unavailable(err.to_string()),
        other => StoreError::Failed(other.to_string()),
    }
}

pub(crate) fn parse_id<T>(column: &str, value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    T::from_str(value)
        .map_err(|e| StoreError::Corrupt(format!("invalid {column} '{value}' from database: {e}")))
}

pub(crate) fn to_count(column: &str, value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| {
        StoreError::Corrupt(format!(
            "invalid {column} from database: {value} (must be non-negative)"
        ))
    })
}

pub(crate) fn from_count(column: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Failed(format!("{column} out of range for storage: {value}")))
}

pub(crate) fn to_db_time(value: DateTime<Utc>) -> NaiveDateTime {
    value.naive_utc()
}

pub(crate) fn from_db_time(value: NaiveDateTime) -> DateTime<Utc> {
    value.and_utc()
}
