//! Error types and handling for `MeteoFuse`

use thiserror::Error;

/// Main error type for the `MeteoFuse` library
#[derive(Error, Debug)]
pub enum MeteoFuseError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Caller supplied input that cannot be aggregated or classified
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Weather provider collaborator errors
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MeteoFuseError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            MeteoFuseError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            MeteoFuseError::InvalidInput { message } => {
                format!("Invalid input: {message}")
            }
            MeteoFuseError::Provider { .. } => {
                "No weather provider returned data. Please check your internet connection."
                    .to_string()
            }
            MeteoFuseError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
