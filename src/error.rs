//! Error types for operator setup.

use thiserror::Error;

/// Result type for operator setup operations.
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Errors that can occur during multithreaded operator setup.
#[derive(Error, Debug)]
pub enum OperatorError {
    /// A collaborator required by the pass is missing or invalid.
    /// Recoverable: the caller may correct the configuration and retry
    /// against the same generation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker thread creation failed. Fatal to the setup operation; the
    /// partially-spawned generation is poisoned and cannot be reused.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The single-pass protocol was violated, e.g. a pass was requested with
    /// no generation set up, or a second pass was requested against a spent
    /// generation. A programming error, reported instead of deadlocking on
    /// the stop barrier.
    #[error("Protocol violation: {0}")]
    Protocol(String),
}

impl OperatorError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a protocol violation error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OperatorError::config("grid descriptor not set");
        assert_eq!(err.to_string(), "Configuration error: grid descriptor not set");

        let err = OperatorError::protocol("pass already consumed");
        assert_eq!(err.to_string(), "Protocol violation: pass already consumed");
    }

    #[test]
    fn test_spawn_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads");
        let err: OperatorError = io.into();
        assert!(matches!(err, OperatorError::Spawn(_)));
    }
}
