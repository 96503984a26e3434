//! Error types produced by the retry executor

use thiserror::Error;

/// Why a retried operation ultimately gave up.
///
/// The wrapped error `E` is the caller's own error type; the executor never
/// inspects it beyond asking whether it is transient.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error
    #[error("{operation} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: E,
    },

    /// An attempt failed with an error that retrying cannot fix
    #[error("{operation} failed on attempt {attempt}: {error}")]
    Permanent {
        operation: String,
        attempt: u32,
        error: E,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Permanent { attempt, .. } => *attempt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display() {
        let err: RetryError<String> = RetryError::Exhausted {
            operation: "connect".to_string(),
            attempts: 3,
            last: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "connect failed after 3 attempt(s): timed out");
        assert_eq!(err.attempts(), 3);
    }

    #[test]
    fn test_permanent_display() {
        let err: RetryError<String> = RetryError::Permanent {
            operation: "download".to_string(),
            attempt: 1,
            error: "access denied".to_string(),
        };
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.to_string(), "download failed on attempt 1: access denied");
    }
}
