//! Core error types for taskflow-core.
//!
//! Operations that target an unknown id are not errors at all: they resolve
//! to `None`/`false` at the call site. What remains is split between
//! persistence failures (reported, never fatal), configuration failures and
//! rejected invariant violations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for taskflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key/value store errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rejected operations
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the key/value store or of the payloads stored in it.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The SQLite backend rejected the operation
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored payload could not be decoded
    #[error("Malformed payload under '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// In-memory state could not be encoded
    #[error("Failed to encode payload for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store cannot be reached at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Dot-path does not name an existing key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Operations the repository refuses instead of guessing caller intent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Built-in categories can never be deleted
    #[error("Category '{id}' is built in and cannot be deleted")]
    BuiltinCategory { id: String },

    /// A task must point at an existing category
    #[error("Category '{id}' does not exist")]
    UnknownCategory { id: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violation_converts_into_core_error() {
        let err: CoreError = InvariantViolation::BuiltinCategory { id: "work".into() }.into();
        assert!(matches!(err, CoreError::Invariant(_)));
        assert_eq!(
            err.to_string(),
            "Invariant violation: Category 'work' is built in and cannot be deleted"
        );
    }

    #[test]
    fn malformed_payload_names_the_key() {
        let source = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = PersistenceError::Malformed {
            key: "taskflow-tasks".into(),
            source,
        };
        assert!(err.to_string().contains("taskflow-tasks"));
    }
}
