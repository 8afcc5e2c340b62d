//! Storage error types for the patient record store.

use std::fmt;

use medrec_core::{CoreError, ValidationError};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested patient was not found.
    #[error("Patient not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// Attempted to create a patient whose id is already taken.
    #[error("Patient already exists: {id}")]
    AlreadyExists {
        /// The conflicting id.
        id: String,
    },

    /// The record or patch violates field constraints.
    #[error("Invalid patient: {0}")]
    Validation(ValidationError),

    /// Reading or writing the backing store failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The backing store holds data that cannot be decoded, or encoding failed.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    #[must_use]
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Io { .. } => ErrorCategory::Infrastructure,
            Self::Serialization { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { id } => Self::NotFound { id },
            CoreError::AlreadyExists { id } => Self::AlreadyExists { id },
            CoreError::Validation(issues) => Self::Validation(issues),
            // Query parameters are parsed before the store is reached.
            other @ (CoreError::InvalidField(_) | CoreError::InvalidDirection(_)) => {
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<ValidationError> for StorageError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

/// Categories of storage errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Validation,
    /// Backing file or device failure.
    Infrastructure,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
