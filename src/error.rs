/*!
 * Error types for tdoc-harvest
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use harvest_core_resilience::{RetryError, Transient};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Could not reach or stay connected to the archive host
    #[error("Connection to {host} failed: {message}")]
    Connectivity { host: String, message: String },

    /// Server replied with an error or an unexpected response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Manifest has no row naming both required columns
    #[error("Manifest has no header row containing both '{id_column}' and '{category_column}'")]
    ManifestSchema {
        id_column: String,
        category_column: String,
    },

    /// Manifest could not be opened or parsed
    #[error("Manifest read error: {0}")]
    ManifestRead(String),

    /// Archive could not be opened or extracted
    #[error("Archive error in {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    /// Operator entered something that is not a valid choice
    #[error("Invalid choice: {0}")]
    OperatorInput(String),

    /// Text completion service refused the request or answered without text
    #[error("Completion service error{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Completion { status: Option<u16>, message: String },

    /// Document text could not be extracted
    #[error("Cannot read document {}: {message}", path.display())]
    Document { path: PathBuf, message: String },

    /// Retries exhausted
    #[error("{operation} failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: String,
    },
}

impl HarvestError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            HarvestError::Config(_)
            | HarvestError::Connectivity { .. }
            | HarvestError::RetriesExhausted { .. } => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error is fatal (should not retry)
    pub fn is_fatal(&self) -> bool {
        match self {
            HarvestError::Config(_) => true,
            HarvestError::RetriesExhausted { .. } => true,
            HarvestError::ManifestSchema { .. } => true,

            HarvestError::Connectivity { .. } => false,
            HarvestError::Protocol(_) => false,
            HarvestError::Io(_) => false,
            HarvestError::ManifestRead(_) => false,
            HarvestError::Archive { .. } => false,
            HarvestError::OperatorInput(_) => false,
            HarvestError::Completion { .. } => false,
            HarvestError::Document { .. } => false,
        }
    }

    /// Check if this error is transient (temporary, worth retrying)
    pub fn is_transient(&self) -> bool {
        match self {
            HarvestError::Connectivity { .. } => true,
            // Server replies are retried regardless of 4xx/5xx class
            HarvestError::Protocol(_) => true,
            HarvestError::Io(io_err) => Self::is_io_transient(io_err),
            // No status means the request never got an answer
            HarvestError::Completion { status, .. } => {
                matches!(status, None | Some(408) | Some(429) | Some(500..=599))
            }
            _ => false,
        }
    }

    /// Check if an I/O error is transient
    fn is_io_transient(io_err: &io::Error) -> bool {
        use io::ErrorKind::*;
        matches!(
            io_err.kind(),
            ConnectionRefused
                | ConnectionReset
                | ConnectionAborted
                | NotConnected
                | BrokenPipe
                | TimedOut
                | Interrupted
                | WouldBlock
                | UnexpectedEof
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::Connectivity { .. }
            | HarvestError::Protocol(_)
            | HarvestError::Completion { .. } => ErrorCategory::Network,
            HarvestError::Io(_) | HarvestError::Archive { .. } | HarvestError::Document { .. } => {
                ErrorCategory::Filesystem
            }
            HarvestError::Config(_) => ErrorCategory::Configuration,
            HarvestError::ManifestSchema { .. } | HarvestError::ManifestRead(_) => {
                ErrorCategory::Manifest
            }
            HarvestError::OperatorInput(_) => ErrorCategory::Input,
            HarvestError::RetriesExhausted { .. } => ErrorCategory::Retry,
        }
    }
}

impl Transient for HarvestError {
    fn is_transient(&self) -> bool {
        HarvestError::is_transient(self)
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection and server reply errors
    Network,
    /// Local file, folder and archive errors
    Filesystem,
    /// Configuration errors
    Configuration,
    /// Manifest spreadsheet errors
    Manifest,
    /// Operator console errors
    Input,
    /// Retry exhaustion
    Retry,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Manifest => write!(f, "manifest"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Retry => write!(f, "retry"),
        }
    }
}

impl From<RetryError<HarvestError>> for HarvestError {
    fn from(err: RetryError<HarvestError>) -> Self {
        match err {
            RetryError::Exhausted {
                operation,
                attempts,
                last,
            } => HarvestError::RetriesExhausted {
                operation,
                attempts,
                last: last.to_string(),
            },
            RetryError::Permanent { error, .. } => error,
        }
    }
}

impl From<dialoguer::Error> for HarvestError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(e) => HarvestError::Io(e),
        }
    }
}

impl From<toml::de::Error> for HarvestError {
    fn from(err: toml::de::Error) -> Self {
        HarvestError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Config(format!("JSON error: {}", err))
    }
}

impl From<regex::Error> for HarvestError {
    fn from(err: regex::Error) -> Self {
        HarvestError::Config(format!("Invalid pattern: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(HarvestError::Config("test".to_string()).is_fatal());
        assert!(HarvestError::RetriesExhausted {
            operation: "connect".to_string(),
            attempts: 3,
            last: "timed out".to_string(),
        }
        .is_fatal());
    }

    #[test]
    fn test_non_fatal_errors() {
        assert!(!HarvestError::Io(io::Error::other("test")).is_fatal());
        assert!(!HarvestError::Protocol("421 too many users".to_string()).is_fatal());
        assert!(!HarvestError::OperatorInput("abc".to_string()).is_fatal());
    }

    #[test]
    fn test_transient_errors() {
        assert!(HarvestError::Protocol("425 can't open data connection".to_string())
            .is_transient());
        assert!(HarvestError::Connectivity {
            host: "ftp.example.org".to_string(),
            message: "refused".to_string(),
        }
        .is_transient());
        assert!(
            HarvestError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
                .is_transient()
        );
        assert!(
            HarvestError::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout")).is_transient()
        );
    }

    #[test]
    fn test_permanent_errors() {
        assert!(
            !HarvestError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
                .is_transient()
        );
        assert!(!HarvestError::Archive {
            path: PathBuf::from("S1-001.zip"),
            message: "invalid central directory".to_string(),
        }
        .is_transient());
        assert!(!HarvestError::Config("bad".to_string()).is_transient());
    }

    #[test]
    fn test_completion_errors() {
        let rate_limited = HarvestError::Completion {
            status: Some(429),
            message: "quota".to_string(),
        };
        assert!(rate_limited.is_transient());
        assert_eq!(rate_limited.to_string(), "Completion service error (HTTP 429): quota");
        assert_eq!(rate_limited.category(), ErrorCategory::Network);

        let unreachable = HarvestError::Completion {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(unreachable.is_transient());
        assert_eq!(unreachable.to_string(), "Completion service error: connection refused");

        let bad_key = HarvestError::Completion {
            status: Some(403),
            message: "API key not valid".to_string(),
        };
        assert!(!bad_key.is_transient());

        let unreadable = HarvestError::Document {
            path: PathBuf::from("S1-001.docx"),
            message: "not a zip archive".to_string(),
        };
        assert!(!unreadable.is_transient());
        assert_eq!(unreadable.category(), ErrorCategory::Filesystem);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(HarvestError::Config("x".to_string()).exit_code(), EXIT_FATAL);
        assert_eq!(
            HarvestError::Connectivity {
                host: "h".to_string(),
                message: "m".to_string()
            }
            .exit_code(),
            EXIT_FATAL
        );
        assert_eq!(
            HarvestError::ManifestRead("x".to_string()).exit_code(),
            EXIT_PARTIAL
        );
    }

    #[test]
    fn test_schema_error_display() {
        let err = HarvestError::ManifestSchema {
            id_column: "TDoc".to_string(),
            category_column: "Type".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Manifest has no header row containing both 'TDoc' and 'Type'"
        );
        assert_eq!(err.category(), ErrorCategory::Manifest);
    }

    #[test]
    fn test_retry_error_conversion() {
        let exhausted: RetryError<HarvestError> = RetryError::Exhausted {
            operation: "connect to ftp.example.org".to_string(),
            attempts: 3,
            last: HarvestError::Protocol("421 service not available".to_string()),
        };
        let err: HarvestError = exhausted.into();
        assert!(matches!(
            err,
            HarvestError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(err.category(), ErrorCategory::Retry);

        let permanent: RetryError<HarvestError> = RetryError::Permanent {
            operation: "cwd".to_string(),
            attempt: 1,
            error: HarvestError::Config("x".to_string()),
        };
        let err: HarvestError = permanent.into();
        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn test_prompt_error_conversion() {
        let prompt_err = dialoguer::Error::IO(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        let err: HarvestError = prompt_err.into();
        match err {
            HarvestError::Io(ref e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected Io, got {:?}", other),
        }
        assert_eq!(err.category(), ErrorCategory::Filesystem);
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Network.to_string(), "network");
        assert_eq!(ErrorCategory::Filesystem.to_string(), "filesystem");
    }
}
