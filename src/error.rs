//! Error types for the inventory service.
//!
//! Two layers. `DbError` covers the PostgreSQL access machinery: connection
//! setup, the pool, statement execution, and row decoding. `StoreError` is
//! what store operations expose to the transport: not-found, invalid input,
//! or a backing-store failure wrapping a `DbError`.

use may_postgres::Error as PostgresError;
use std::fmt;

/// Database infrastructure error
#[derive(Debug)]
pub enum DbError {
    /// Connection string or pool settings rejected before any connection attempt
    InvalidConfig(String),
    /// Network/protocol/authentication error from may_postgres
    PostgresError(PostgresError),
    /// The pool channel is gone, no client can be checked out or returned
    PoolClosed,
    /// Row or bind-parameter conversion error
    DecodeError(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::InvalidConfig(s) => {
                write!(f, "Invalid database configuration: {s}")
            }
            DbError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            DbError::PoolClosed => {
                write!(f, "Connection pool is closed")
            }
            DbError::DecodeError(s) => {
                write!(f, "Decode error: {s}")
            }
        }
    }
}

impl std::error::Error for DbError {}

impl From<PostgresError> for DbError {
    fn from(err: PostgresError) -> Self {
        DbError::PostgresError(err)
    }
}

/// Store-level error taxonomy surfaced to the transport
///
/// `NotFound` carries the entity noun so `Display` yields the exact
/// client-facing detail string ("Chemical not found").
#[derive(Debug)]
pub enum StoreError {
    /// Requested record does not exist, or a referenced chemical is gone
    NotFound(&'static str),
    /// Input rejected before any store access
    InvalidInput(String),
    /// The backing store is unreachable or rejected the operation
    Db(DbError),
}

impl StoreError {
    /// True for the variants a client caused (mapped to 4xx by the transport)
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::InvalidInput(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(entity) => {
                write!(f, "{entity} not found")
            }
            StoreError::InvalidInput(s) => {
                write!(f, "{s}")
            }
            StoreError::Db(e) => {
                write!(f, "Database error: {e}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Db(err)
    }
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        StoreError::Db(DbError::PostgresError(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_display() {
        let err = DbError::InvalidConfig("empty url".to_string());
        assert!(err.to_string().contains("Invalid database configuration"));

        let err2 = DbError::PoolClosed;
        assert!(err2.to_string().contains("pool is closed"));

        let err3 = DbError::DecodeError("bad column".to_string());
        assert!(err3.to_string().contains("Decode error"));
        assert!(err3.to_string().contains("bad column"));
    }

    #[test]
    fn test_store_error_display_matches_wire_detail() {
        assert_eq!(
            StoreError::NotFound("Chemical").to_string(),
            "Chemical not found"
        );
        assert_eq!(
            StoreError::NotFound("Inventory log").to_string(),
            "Inventory log not found"
        );
    }

    #[test]
    fn test_store_error_classification() {
        assert!(StoreError::NotFound("Chemical").is_client_error());
        assert!(StoreError::InvalidInput("bad id".to_string()).is_client_error());
        assert!(!StoreError::Db(DbError::PoolClosed).is_client_error());
    }

    #[test]
    fn test_db_error_chains_into_store_error() {
        let err: StoreError = DbError::PoolClosed.into();
        assert!(matches!(err, StoreError::Db(DbError::PoolClosed)));
        assert!(err.to_string().contains("Database error"));
    }
}
