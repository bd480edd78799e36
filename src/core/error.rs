//! Typed error handling for the Tracex client
//!
//! Every failure the client can observe is mapped to a variant of
//! [`TracexError`] so callers can react to the specific case (close an editor
//! on 404, keep form input on 400, show retry guidance on 429) instead of
//! matching on strings.
//!
//! # Error Categories
//!
//! - [`ApiError`]: non-2xx responses returned by the API
//! - [`ValidationError`]: input rejected locally, before any request is sent
//! - [`BatchError`]: bulk operations that only partly succeeded
//! - [`ConfigError`]: configuration parsing and validation
//!
//! # Example
//!
//! ```rust,ignore
//! match dispatcher.update(&id, &patch).await {
//!     Ok(expense) => println!("saved {}", expense.id),
//!     Err(err) if err.kind() == ErrorKind::NotFound => editor.close(),
//!     Err(err) => eprintln!("{}", err),
//! }
//! ```

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for the Tracex client
#[derive(Debug, Error)]
pub enum TracexError {
    /// The API answered with a non-2xx status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Input rejected locally
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A bulk operation failed for some of its items
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request never reached the server, or the connection dropped
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered 2xx with a body we could not decode
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Unexpected client defect
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error taxonomy used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Network,
    PartialBatch,
    Other,
}

/// Severity of a transient notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A user-visible transient message (toast)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl TracexError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TracexError::Api(e) => e.kind(),
            TracexError::Validation(_) => ErrorKind::Validation,
            TracexError::Batch(_) => ErrorKind::PartialBatch,
            TracexError::Network { .. } => ErrorKind::Network,
            TracexError::Config(_)
            | TracexError::InvalidResponse { .. }
            | TracexError::Internal(_) => ErrorKind::Other,
        }
    }

    /// HTTP status associated with the error, if it came from the API
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            TracexError::Api(e) => Some(e.status_code()),
            _ => None,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            TracexError::Api(e) => e.error_code(),
            TracexError::Validation(e) => e.error_code(),
            TracexError::Batch(_) => "PARTIAL_BATCH_FAILURE",
            TracexError::Config(_) => "CONFIG_ERROR",
            TracexError::Network { .. } => "NETWORK_ERROR",
            TracexError::InvalidResponse { .. } => "INVALID_RESPONSE",
            TracexError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether an open editor for the target should be closed
    pub fn closes_editor(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Convert to the notice shown to the user
    pub fn notice(&self) -> Notice {
        match self {
            TracexError::Network { .. } => Notice::error("Check your connection"),
            TracexError::Api(ApiError::Unauthorized { .. }) => Notice::error("Session expired"),
            other => Notice::error(other.to_string()),
        }
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by the API as non-2xx responses
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// 400: the server rejected one or more fields
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldValidationError>,
    },

    /// 401: the session token is missing or expired
    #[error("{message}")]
    Unauthorized { message: String },

    /// 403
    #[error("{message}")]
    Forbidden { message: String },

    /// 404: the target no longer exists
    #[error("{message}")]
    NotFound { message: String },

    /// 429: the message already carries retry guidance
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: Option<RetryAfter>,
    },

    /// Any other non-2xx status
    #[error("{message}")]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

/// Parsed `Retry-After` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAfter {
    Seconds(u64),
    Raw(String),
}

impl fmt::Display for RetryAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryAfter::Seconds(secs) => write!(f, "{}s", secs),
            RetryAfter::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

impl RetryAfter {
    pub fn parse(header: &str) -> Self {
        let header = header.trim();
        match header.parse::<u64>() {
            Ok(secs) => RetryAfter::Seconds(secs),
            Err(_) => RetryAfter::Raw(header.to_string()),
        }
    }

    /// The message shown to the user for a 429
    pub fn message(retry_after: Option<&RetryAfter>) -> String {
        match retry_after {
            Some(RetryAfter::Seconds(secs)) => {
                format!("Too many requests. Retry in {}s.", secs)
            }
            Some(RetryAfter::Raw(raw)) => format!("Too many requests. Retry after {}.", raw),
            None => "Too many requests. Please try again later.".to_string(),
        }
    }
}

impl ApiError {
    /// Build an error from a response status and its decoded body
    pub fn from_status(
        status: StatusCode,
        body: ErrorBody,
        retry_after: Option<RetryAfter>,
    ) -> Self {
        let message = body
            .error
            .clone()
            .or_else(|| body.message.clone())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Request failed".to_string());

        match status {
            StatusCode::BAD_REQUEST => ApiError::Validation {
                message,
                fields: body.fields.unwrap_or_default(),
            },
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
            StatusCode::FORBIDDEN => ApiError::Forbidden { message },
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
                message: RetryAfter::message(retry_after.as_ref()),
                retry_after,
            },
            other => ApiError::Status {
                status: other.as_u16(),
                code: body.code,
                message,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ApiError::Forbidden { .. } => ErrorKind::Forbidden,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::Status { .. } => ErrorKind::Other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::Status { .. } => "API_ERROR",
        }
    }
}

/// Error body returned by the API (`{ "success": false, "error": "..." }`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<FieldValidationError>>,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised locally, before a request is issued
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Single field validation error
    #[error("{}: {}", .0.field, .0.message)]
    Field(FieldValidationError),

    /// Multiple field validation errors
    #[error("{}", join_fields(.0))]
    Fields(Vec<FieldValidationError>),

    /// A bulk update where every field was left blank
    #[error("Nothing to update")]
    NothingToUpdate,

    /// A bulk operation without any item
    #[error("{message}")]
    EmptyBatch { message: String },

    /// A bulk create over the per-request cap
    #[error("Maximum {max} expenses per import.")]
    BatchTooLarge { size: usize, max: usize },

    /// Pasted import rows that could not be parsed
    #[error("{message}")]
    Import { message: String },
}

fn join_fields(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Field(FieldValidationError::new(field, message))
    }

    /// Collapse a list of field errors; `Ok(())` when empty
    pub fn from_fields(mut errors: Vec<FieldValidationError>) -> Result<(), Self> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(ValidationError::Field(errors.remove(0))),
            _ => Err(ValidationError::Fields(errors)),
        }
    }

    /// Field-level details, if any
    pub fn fields(&self) -> Vec<FieldValidationError> {
        match self {
            ValidationError::Field(e) => vec![e.clone()],
            ValidationError::Fields(errors) => errors.clone(),
            _ => Vec::new(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Field(_) | ValidationError::Fields(_) => "VALIDATION_ERROR",
            ValidationError::NothingToUpdate => "NOTHING_TO_UPDATE",
            ValidationError::EmptyBatch { .. } => "EMPTY_BATCH",
            ValidationError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            ValidationError::Import { .. } => "INVALID_IMPORT",
        }
    }
}

// =============================================================================
// Batch Errors
// =============================================================================

/// One item of a bulk operation that failed
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub id: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// A bulk operation where some items failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("{}", describe_partial(.succeeded, .failures))]
    Partial {
        succeeded: usize,
        failures: Vec<BatchFailure>,
    },
}

fn describe_partial(succeeded: &usize, failures: &[BatchFailure]) -> String {
    let succeeded = *succeeded;
    let details = failures
        .iter()
        .map(|f| format!("{} ({})", f.id, f.message))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Deleted {} of {} expense(s); {} failed: {}",
        succeeded,
        succeeded + failures.len(),
        failures.len(),
        details
    )
}

impl BatchError {
    pub fn succeeded(&self) -> usize {
        match self {
            BatchError::Partial { succeeded, .. } => *succeeded,
        }
    }

    pub fn failures(&self) -> &[BatchFailure] {
        match self {
            BatchError::Partial { failures, .. } => failures,
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", in_file(.file))]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

fn in_file(file: &Option<String>) -> String {
    file.as_ref()
        .map(|f| format!(" file '{}'", f))
        .unwrap_or_default()
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<reqwest::Error> for TracexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TracexError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            TracexError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for TracexError {
    fn from(err: serde_json::Error) -> Self {
        TracexError::InvalidResponse {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for Tracex client operations
pub type TracexResult<T> = Result<T, TracexError>;

// =============================================================================
// Tests
// =============================================================================
