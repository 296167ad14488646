//! Run-level error types with context and recovery information
//!
//! Per-file problems (a mirror returning 404, a table that fails to
//! decompress) are not errors at this level: they become
//! [`FetchOutcome`](crate::core::FetchOutcome)s in the report. `SyncError` covers
//! what stops an operation outright, such as bad configuration, an unreadable
//! manifest or a destination root that cannot be created.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors raised by the synchronization engine and its collaborators
#[derive(Error, Debug)]
pub enum SyncError {
    /// HTTP-related errors with context
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Network timeout with retry suggestion
    #[error("Request to '{url}' timed out after {duration_secs}s (try increasing timeout or check network)")]
    NetworkTimeout { url: String, duration_secs: u64 },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}': {operation}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Mirror URL parsing errors with helpful suggestions
    #[error("Invalid URL '{url}': {suggestion}")]
    InvalidUrl {
        url: String,
        suggestion: String,
        #[source]
        source: url::ParseError,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        suggestion: Option<String>,
    },

    /// The manifest document could not be parsed
    #[error("Invalid manifest: {message}")]
    Manifest {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Synchronization cancelled by user or system
    #[error("Synchronization cancelled: {reason}")]
    Cancelled { reason: String },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    CreateDir,
    Metadata,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::CreateDir => write!(f, "creating directory"),
            FileOperation::Metadata => write!(f, "reading metadata"),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Attach a path and operation to an I/O error
    pub fn file_system<P: Into<PathBuf>>(
        path: P,
        operation: FileOperation,
        source: std::io::Error,
    ) -> Self {
        SyncError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Check if error is recoverable (worth retrying later)
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::HttpRequest { source, .. } => source
                .status()
                .map_or(true, |status| status.is_server_error() || status.as_u16() == 429),
            SyncError::NetworkTimeout { .. } => true,
            SyncError::FileSystem { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            SyncError::InvalidUrl { .. } => false,
            SyncError::Configuration { .. } => false,
            SyncError::Manifest { .. } => false,
            SyncError::Cancelled { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::HttpRequest { .. } => "http_request",
            SyncError::NetworkTimeout { .. } => "network_timeout",
            SyncError::FileSystem { .. } => "file_system",
            SyncError::InvalidUrl { .. } => "invalid_url",
            SyncError::Configuration { .. } => "configuration",
            SyncError::Manifest { .. } => "manifest",
            SyncError::Cancelled { .. } => "cancelled",
        }
    }

    /// Get severity level for error prioritization
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SyncError::HttpRequest { .. } => ErrorSeverity::Medium,
            SyncError::NetworkTimeout { .. } => ErrorSeverity::Medium,
            SyncError::FileSystem { .. } => ErrorSeverity::High,
            SyncError::InvalidUrl { .. } => ErrorSeverity::High,
            SyncError::Configuration { .. } => ErrorSeverity::High,
            SyncError::Manifest { .. } => ErrorSeverity::High,
            SyncError::Cancelled { .. } => ErrorSeverity::Low,
        }
    }

    /// Log the error at the level its severity calls for, tagged with its
    /// category
    pub fn log(&self, context: &str) {
        let category = self.category();
        let recoverable = self.is_recoverable();
        match self.severity() {
            ErrorSeverity::High => error!(category, recoverable, "{}: {}", context, self),
            ErrorSeverity::Medium => warn!(category, recoverable, "{}: {}", context, self),
            ErrorSeverity::Low => info!(category, recoverable, "{}: {}", context, self),
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            SyncError::NetworkTimeout { .. } => {
                Some("Check your internet connection or try increasing the timeout value")
            }
            SyncError::InvalidUrl { suggestion, .. } => Some(suggestion),
            SyncError::Configuration { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

/// Error severity levels for prioritization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl SyncError {
    /// Convert a reqwest error, reporting timeouts with the client's timeout
    pub fn from_reqwest(error: reqwest::Error, timeout: std::time::Duration) -> Self {
        if error.is_timeout() {
            SyncError::NetworkTimeout {
                url: request_url(&error),
                duration_secs: timeout.as_secs(),
            }
        } else {
            error.into()
        }
    }
}

fn request_url(error: &reqwest::Error) -> String {
    error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        SyncError::HttpRequest {
            url: request_url(&error),
            source: error,
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(error: url::ParseError) -> Self {
        let suggestion = match error {
            url::ParseError::EmptyHost => "URL must have a valid hostname",
            url::ParseError::InvalidPort => "Port number must be between 1 and 65535",
            url::ParseError::RelativeUrlWithoutBase => {
                "URL must be absolute (include http:// or https://)"
            }
            _ => "Check URL format and try again",
        }
        .to_string();

        SyncError::InvalidUrl {
            url: "<unparseable>".to_string(),
            suggestion,
            source: error,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        SyncError::Manifest {
            message: error.to_string(),
            source: Some(error),
        }
    }
}
