//! Error types for the ORM system
//!
//! Statement failures keep the driver error as their source so callers can
//! inspect exactly what the database reported.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// The underlying statement failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No row matched the requested key
    #[error("No {model} record found for key {key}")]
    NotFound { model: String, key: String },

    /// Primary key is missing or invalid
    #[error("Primary key is missing or invalid")]
    MissingPrimaryKey,

    /// Malformed builder input
    #[error("Query error: {0}")]
    Query(String),

    /// Relationship resolution failed
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transaction bracketing error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ModelError {
    /// Build a `NotFound` error for a model and the key that was looked up
    pub fn not_found(model: impl Into<String>, key: impl std::fmt::Display) -> Self {
        ModelError::NotFound {
            model: model.into(),
            key: key.to_string(),
        }
    }

    /// Whether this is a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }

    /// Whether the database rejected the statement because of a constraint
    pub fn is_constraint_violation(&self) -> bool {
        use sqlx::error::ErrorKind;

        match self {
            ModelError::Database(sqlx::Error::Database(db_err)) => matches!(
                db_err.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ),
            _ => false,
        }
    }
}
