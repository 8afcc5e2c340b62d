use serde::Serialize;
use thiserror::Error;

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

/// Every constraint violated by a patient record or patch.
///
/// Validation collects all issues before failing, so callers see the full
/// list of offending fields in one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error holding a single issue
    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push(field, reason);
        err
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Names of the offending fields, in the order they were found
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }

    pub fn into_issues(self) -> Vec<FieldIssue> {
        self.issues
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "invalid patient");
        }
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", issue.field, issue.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Core error types for patient record operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid patient: {0}")]
    Validation(#[from] ValidationError),

    #[error("Patient not found: {id}")]
    NotFound { id: String },

    #[error("Patient already exists: {id}")]
    AlreadyExists { id: String },

    #[error("Invalid sort field '{0}', select from height, weight or bmi")]
    InvalidField(String),

    #[error("Invalid sort order '{0}', select ascending or descending")]
    InvalidDirection(String),
}

impl CoreError {
    /// Create a new NotFound error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a new AlreadyExists error
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    pub fn invalid_field(field: impl Into<String>) -> Self {
        Self::InvalidField(field.into())
    }

    pub fn invalid_direction(direction: impl Into<String>) -> Self {
        Self::InvalidDirection(direction.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidField(_) | Self::InvalidDirection(_) => ErrorCategory::Query,
        }
    }
}

/// Error categories for logging and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Query,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = CoreError::not_found("P001");
        assert_eq!(err.to_string(), "Patient not found: P001");
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_already_exists_error() {
        let err = CoreError::already_exists("P002");
        assert_eq!(err.to_string(), "Patient already exists: P002");
        assert!(err.is_already_exists());
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_validation_error_lists_every_issue() {
        let mut err = ValidationError::new();
        err.push("age", "must be between 1 and 99");
        err.push("height", "must be greater than 0");

        assert_eq!(err.fields(), vec!["age", "height"]);
        assert_eq!(
            err.to_string(),
            "age: must be between 1 and 99; height: must be greater than 0"
        );

        let core: CoreError = err.into();
        assert_eq!(core.category(), ErrorCategory::Validation);
        assert!(core.to_string().starts_with("Invalid patient: age:"));
    }

    #[test]
    fn test_query_errors() {
        let field = CoreError::invalid_field("color");
        assert!(field.to_string().contains("'color'"));
        assert_eq!(field.category(), ErrorCategory::Query);

        let direction = CoreError::invalid_direction("sideways");
        assert!(direction.to_string().contains("'sideways'"));
        assert_eq!(direction.category(), ErrorCategory::Query);
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
        assert_eq!(ErrorCategory::Query.to_string(), "query");
    }
}
