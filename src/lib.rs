//! # ministry-site - content-managed church website
//!
//! Public pages (livestream, sermons, meeting times, prayer requests) and an
//! admin area for editing them, backed by a relational record store.
//!
//! ministry-site provides:
//! - Typed records for the four content tables
//! - A `RecordStore` abstraction with SQLite and hosted REST backends
//! - An idempotent schema initializer with default-data seeding
//! - Validated form actions that report which pages to invalidate
//! - An axum server with a session-gated admin area

pub mod model;
pub mod storage;
pub mod auth;
pub mod init;
pub mod actions;
pub mod pages;
pub mod preferences;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{Livestream, Meeting, MeetingType, PrayerRequest, PrayerStatus, Sermon};
pub use storage::{RecordStore, SqliteStore, RestStore, Table, TableStatus};
pub use auth::AuthProvider;
pub use init::SchemaInitializer;

/// Result type alias for ministry-site operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ministry-site operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("relation \"{table}\" does not exist")]
    SchemaMissing { table: String },

    #[error("{0}")]
    Validation(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Store unavailable: {0}")]
    Transient(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error classes used by pages and actions to pick a presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or unusable credentials; fatal for the request
    Configuration,
    /// A required table is absent; the UI offers initialization
    SchemaMissing,
    /// Rejected before any store call
    Validation,
    /// Store, network or lookup failure
    Operation,
    /// Anything else
    Unexpected,
}

impl Error {
    /// Build an error from a raw store message, detecting missing relations.
    pub fn from_store_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match storage::classify::missing_relation(&message) {
            Some(table) => Error::SchemaMissing { table },
            None => Error::Store(message),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Config(_) => ErrorClass::Configuration,
            Error::SchemaMissing { .. } => ErrorClass::SchemaMissing,
            Error::Validation(_) => ErrorClass::Validation,
            Error::NotFound(_) | Error::Store(_) | Error::Transient(_) | Error::Auth(_) => {
                ErrorClass::Operation
            }
            Error::Json(_) | Error::Io(_) => ErrorClass::Unexpected,
        }
    }

    pub fn is_schema_missing(&self) -> bool {
        matches!(self, Error::SchemaMissing { .. })
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("no matching row".to_string()),
            rusqlite::Error::SqliteFailure(ref code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Error::Transient(err.to_string())
            }
            other => Error::from_store_message(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Error::Transient(err.to_string())
        } else if err.is_decode() {
            Error::Store(format!("malformed store response: {}", err))
        } else {
            Error::from_store_message(err.to_string())
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_message_classification() {
        let err = Error::from_store_message("relation \"public.meetings\" does not exist");
        assert!(err.is_schema_missing());
        assert_eq!(err.class(), ErrorClass::SchemaMissing);

        let err = Error::from_store_message("duplicate key value violates unique constraint");
        assert_eq!(err.class(), ErrorClass::Operation);
    }

    #[test]
    fn test_sqlite_missing_table_is_schema_missing() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: Error = conn
            .query_row("SELECT id FROM sermons LIMIT 1", [], |row| row.get::<_, String>(0))
            .unwrap_err()
            .into();
        match err {
            Error::SchemaMissing { table } => assert_eq!(table, "sermons"),
            other => panic!("expected SchemaMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_no_rows_is_not_found() {
        let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, Error::NotFound(_)));
    }
}
