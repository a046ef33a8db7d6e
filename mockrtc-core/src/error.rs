//! Error types for MockRTC
//!
//! Configuration errors are the caller's bug and propagate immediately.
//! Environment errors (interception) are absorbed by the facade with a
//! best-effort fallback. Resource errors (load, canvas) propagate to the
//! immediate caller of the operation that triggered them.

use std::time::Duration;
use thiserror::Error;

/// Main error type for MockRTC operations
#[derive(Error, Debug)]
pub enum MockRtcError {
    /// Invalid argument passed to a public operation
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message
        message: String,
    },

    /// Asset load exceeded the configured timeout
    #[error("Timed out loading media {reference} after {duration:?}")]
    LoadTimeout {
        /// Media reference being loaded
        reference: String,
        /// Timeout that elapsed
        duration: Duration,
    },

    /// Asset could not be fetched or decoded
    #[error("Failed to load media {reference}: {reason}")]
    LoadFailure {
        /// Media reference being loaded
        reference: String,
        /// Failure reason
        reason: String,
    },

    /// The host refused to let an entry point be replaced
    #[error("Cannot intercept {entry_point}: {reason}")]
    InterceptionFailure {
        /// Entry point name
        entry_point: String,
        /// Failure reason
        reason: String,
    },

    /// Drawing context acquisition failed
    #[error("Canvas context unavailable: {reason}")]
    CanvasContextFailure {
        /// Failure reason
        reason: String,
    },

    /// Operation not valid in the current state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// State error message
        message: String,
    },

    /// Entry point missing on the host
    #[error("Not supported: {operation}")]
    NotSupported {
        /// Operation that is not available
        operation: String,
    },

    /// Device id not present in the active preset
    #[error("Device not found: {device_id}")]
    DeviceNotFound {
        /// Device identifier
        device_id: String,
    },

    /// Configuration could not be applied
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Failure reason
        reason: String,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// JSON (de)serialization failed
    #[error("JSON error: {source}")]
    Json {
        #[from]
        /// Underlying serde_json error
        source: serde_json::Error,
    },
}

/// Result type alias for MockRTC operations
pub type MockRtcResult<T> = Result<T, MockRtcError>;

impl MockRtcError {
    /// Shorthand for [`MockRtcError::InvalidInput`]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        MockRtcError::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for [`MockRtcError::LoadFailure`]
    pub fn load_failure(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        MockRtcError::LoadFailure {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is recoverable by retrying with the same input
    pub fn is_recoverable(&self) -> bool {
        match self {
            MockRtcError::LoadTimeout { .. } => true,
            MockRtcError::Io { .. } => true,
            MockRtcError::InterceptionFailure { .. } => true,
            MockRtcError::InvalidInput { .. } => false,
            MockRtcError::LoadFailure { .. } => false,
            MockRtcError::CanvasContextFailure { .. } => false,
            _ => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MockRtcError::InvalidInput { .. } => ErrorCategory::Configuration,
            MockRtcError::Configuration { .. } => ErrorCategory::Configuration,
            MockRtcError::Json { .. } => ErrorCategory::Configuration,
            MockRtcError::InterceptionFailure { .. } => ErrorCategory::Environment,
            MockRtcError::NotSupported { .. } => ErrorCategory::Environment,
            MockRtcError::LoadTimeout { .. } => ErrorCategory::Resource,
            MockRtcError::LoadFailure { .. } => ErrorCategory::Resource,
            MockRtcError::CanvasContextFailure { .. } => ErrorCategory::Resource,
            MockRtcError::Io { .. } => ErrorCategory::Resource,
            MockRtcError::DeviceNotFound { .. } => ErrorCategory::Device,
            MockRtcError::InvalidState { .. } => ErrorCategory::State,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller supplied bad input or configuration
    Configuration,
    /// Host environment refused an operation
    Environment,
    /// Asset or surface resources failed
    Resource,
    /// Device lookup errors
    Device,
    /// State management errors
    State,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let timeout = MockRtcError::LoadTimeout {
            reference: "cam.png".to_string(),
            duration: Duration::from_millis(500),
        };
        assert_eq!(timeout.category(), ErrorCategory::Resource);
        assert!(timeout.is_recoverable());

        let input = MockRtcError::invalid_input("empty media url");
        assert_eq!(input.category(), ErrorCategory::Configuration);
        assert!(!input.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = MockRtcError::load_failure("missing.png", "file not found");
        assert_eq!(
            error.to_string(),
            "Failed to load media missing.png: file not found"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        match MockRtcError::from(io_error) {
            MockRtcError::Io { .. } => (),
            other => panic!("Expected Io error variant, got {other:?}"),
        }
    }
}
