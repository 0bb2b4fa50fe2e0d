// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system. Each
//! subsystem owns a typed error (`ManifestError`, `MediaError`,
//! `PageReferenceError`) and `AppError` ties them together for the chain.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Notion API error codes as a typed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded; back off and retry
    RateLimited,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        Self::HttpStatus(status)
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError => true,
            Self::HttpStatus(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this error means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound | Self::HttpStatus(404))
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Notion API returned an error ({code}): {message}")]
    NotionService {
        code: NotionErrorCode,
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stage '{stage}' failed for document {document_id}: {source}")]
    StageFailed {
        stage: &'static str,
        document_id: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    PageReference(#[from] PageReferenceError),
}

impl AppError {
    /// Whether retrying the failed remote call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NotionService { code, .. } => code.is_retryable(),
            AppError::NetworkFailure(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Failures of the directory-backed manifest stores.
///
/// Always surfaced to the caller of the failing store operation.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest entry not found: {key}")]
    NotFound { key: String },

    #[error("Manifest store '{store}' used before initialize()")]
    NotInitialized { store: &'static str },

    #[error("Invalid manifest state: {0}")]
    InvalidState(String),
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Which part of media materialization failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOperation {
    Download,
    Write,
    Upload,
    Cleanup,
}

impl fmt::Display for MediaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Write => write!(f, "write"),
            Self::Upload => write!(f, "upload"),
            Self::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Failures of media strategies.
#[derive(Error, Debug)]
pub enum MediaError {
    /// Programmer error: raised at construction regardless of fail-forward.
    #[error("Invalid media configuration: {0}")]
    Configuration(String),

    #[error("Media {operation} failed for reference {reference_id}: {source}")]
    Processing {
        reference_id: String,
        operation: MediaOperation,
        #[source]
        source: BoxError,
    },
}

impl MediaError {
    pub(crate) fn processing(
        reference_id: impl Into<String>,
        operation: MediaOperation,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Processing {
            reference_id: reference_id.into(),
            operation,
            source: source.into(),
        }
    }
}

/// Failures of page-reference resolution. There is no fail-forward mode.
#[derive(Error, Debug)]
pub enum PageReferenceError {
    #[error("Property '{property}' on document {document_id} is unusable: {reason}")]
    InvalidProperty {
        document_id: String,
        property: String,
        reason: String,
    },

    #[error("Malformed page reference in node {node_id}: {reason}")]
    MalformedReference { node_id: String, reason: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
