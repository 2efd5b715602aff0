//! Error types for taskdesk

use thiserror::Error;

/// Result type alias for taskdesk operations
pub type Result<T> = std::result::Result<T, DeskError>;

/// Main error type for taskdesk operations
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid date '{date}'. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS.")]
    InvalidDate { date: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Task {id} not found.")]
    TaskNotFound { id: String },

    #[error("Reminder {id} not found.")]
    ReminderNotFound { id: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl DeskError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_serialization_error_from_serde() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: DeskError = json_error.into();
        assert!(matches!(err, DeskError::Serialization(_)));
    }

    #[test]
    fn test_io_error_from_std() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: DeskError = io_error.into();
        assert!(matches!(err, DeskError::Io(_)));
    }

    #[test]
    fn test_messages() {
        let err = DeskError::TaskNotFound { id: "42".into() };
        assert_eq!(err.to_string(), "Task 42 not found.");

        let err = DeskError::validation("end must be after start");
        assert!(err.to_string().contains("end must be after start"));

        let err = DeskError::InvalidDate { date: "tomorrow".into() };
        assert!(err.to_string().contains("'tomorrow'"));
    }
}
