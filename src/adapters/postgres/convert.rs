//! Column conversions shared by the Postgres adapters.
//!
//! Postgres has no unsigned integers; counters are stored as `INTEGER` and
//! checked on the way back out.

use crate::domain::foundation::{DomainError, ErrorCode};

pub(crate) fn to_pg_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn from_pg_int(column: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Column {} holds negative value {}", column, value),
        )
    })
}

pub(crate) fn from_pg_small(column: &str, value: i16) -> Result<u16, DomainError> {
    u16::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Column {} holds negative value {}", column, value),
        )
    })
}

/// Maps a stored string back through a domain parser.
pub(crate) fn parse_column<T, E>(column: &str, value: &str) -> Result<T, DomainError>
where
    T: std::str::FromStr<Err = E>,
    E: std::fmt::Display,
{
    value.parse().map_err(|e: E| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value '{}': {}", column, value, e),
        )
    })
}
