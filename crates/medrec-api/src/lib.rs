use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use medrec_core::{CoreError, FieldIssue, ValidationError};
use medrec_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<FieldIssue>>,
}

/// Confirmation body returned by the mutating endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// API errors mapped to HTTP responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// Duplicate id on create. Reported as 400, not 409.
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    InvalidField(String),
    #[error("{0}")]
    InvalidDirection(String),
    #[error("{message}")]
    Validation {
        message: String,
        issues: Vec<FieldIssue>,
    },
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }
    pub fn unsupported_media_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedMediaType(msg.into())
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn validation(err: ValidationError) -> Self {
        Self::Validation {
            message: format!("Invalid patient: {err}"),
            issues: err.into_issues(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::AlreadyExists(_)
            | ApiError::InvalidField(_)
            | ApiError::InvalidDirection(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code carried in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::AlreadyExists(_) => "already_exists",
            ApiError::InvalidField(_) => "invalid_field",
            ApiError::InvalidDirection(_) => "invalid_direction",
            ApiError::Validation { .. } => "validation",
            ApiError::UnsupportedMediaType(_) => "unsupported_media_type",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let issues = match self {
            ApiError::Validation { issues, .. } => Some(issues.clone()),
            _ => None,
        };
        ErrorBody {
            error: self.code(),
            detail: self.to_string(),
            issues,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(issues) => Self::validation(issues),
            e @ CoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            e @ CoreError::AlreadyExists { .. } => Self::AlreadyExists(e.to_string()),
            e @ CoreError::InvalidField(_) => Self::InvalidField(e.to_string()),
            e @ CoreError::InvalidDirection(_) => Self::InvalidDirection(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(issues) => Self::validation(issues),
            e @ StorageError::NotFound { .. } => Self::NotFound(e.to_string()),
            e @ StorageError::AlreadyExists { .. } => Self::AlreadyExists(e.to_string()),
            e @ (StorageError::Io { .. }
            | StorageError::Serialization { .. }
            | StorageError::Internal { .. }) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| {
            br#"{"error":"internal","detail":"Serialization failure"}"#.to_vec()
        });
        json_response(status, body)
    }
}

// -------------------------
// Success responses
// -------------------------

#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
    pub pretty: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value,
            status,
            pretty: false,
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    /// Indent the body with two spaces.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&self.value)
        } else {
            serde_json::to_vec(&self.value)
        };
        match encoded {
            Ok(body) => json_response(self.status, body),
            Err(e) => ApiError::internal(format!("encode response: {e}")).into_response(),
        }
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

// -------------------------
// Content negotiation
// -------------------------

/// Accept must allow JSON when present.
pub fn validate_accept(headers: &HeaderMap) -> Result<(), ApiError> {
    if let Some(accept) = headers.get(header::ACCEPT) {
        let val = accept.to_str().unwrap_or("").to_ascii_lowercase();
        let allowed = val.contains("application/json")
            || val.contains("application/*")
            || val.contains("*/*");
        if !allowed {
            return Err(ApiError::unsupported_media_type(format!(
                "Unsupported Accept: {val}. Only application/json is supported."
            )));
        }
    }
    Ok(())
}

/// Request bodies must be declared as JSON.
pub fn validate_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let val = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if val.starts_with("application/json") {
        Ok(())
    } else if val.is_empty() {
        Err(ApiError::unsupported_media_type(
            "Missing Content-Type. Request bodies must be application/json.",
        ))
    } else {
        Err(ApiError::unsupported_media_type(format!(
            "Unsupported Content-Type: {val}. Only application/json is supported."
        )))
    }
}
