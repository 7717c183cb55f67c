//! Error types for the statistics migrator.
//!
//! Unresolvable ids and malformed values are not errors; they are handled in
//! the mapper. Everything here is either an index failure or a persistence
//! failure, and both abort only the phase that hit them.

use thiserror::Error;

/// Main error type for the migrator.
#[derive(Debug, Error)]
pub enum MigrateError {
    // Index transport errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Index returned HTTP {status}: {message}")]
    Index { status: u16, message: String },

    // Persistence errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for migrator operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MigrateError {
    fn from(err: rusqlite::Error) -> Self {
        MigrateError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MigrateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MigrateError::Timeout(err.to_string())
        } else {
            MigrateError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl From<url::ParseError> for MigrateError {
    fn from(err: url::ParseError) -> Self {
        MigrateError::Config {
            message: format!("Invalid URL: {}", err),
        }
    }
}

impl MigrateError {
    /// True when the failure came from talking to the statistics index.
    pub fn is_index_failure(&self) -> bool {
        matches!(
            self,
            MigrateError::Network { .. }
                | MigrateError::Timeout(_)
                | MigrateError::Index { .. }
                | MigrateError::Json { .. }
        )
    }

    /// True when the failure came from the repository database.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, MigrateError::Database { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrateError::Index {
            status: 400,
            message: "undefined field foo".into(),
        };
        assert_eq!(err.to_string(), "Index returned HTTP 400: undefined field foo");
    }

    #[test]
    fn test_failure_classification() {
        assert!(MigrateError::Timeout("select".into()).is_index_failure());
        assert!(!MigrateError::Timeout("select".into()).is_persistence_failure());

        let db = MigrateError::from(rusqlite::Error::InvalidQuery);
        assert!(db.is_persistence_failure());
        assert!(!db.is_index_failure());
    }

    #[test]
    fn test_url_error_is_config() {
        let err = MigrateError::from(url::Url::parse("not a url").unwrap_err());
        assert!(matches!(err, MigrateError::Config { .. }));
    }
}
