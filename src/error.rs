//! Error types and handling for `Skycast`
//!
//! Every remote call and parse step in the pipeline reports failure as a
//! [`WeatherError`]; nothing escapes as a panic.

use std::fmt;

use thiserror::Error;

/// How a transport-level failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection could not be established or was dropped mid-response
    Network,
    /// Connect or read deadline elapsed
    Timeout,
    /// Provider answered with a status other than 200, 401 or 404
    Status(u16),
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Network => write!(f, "network failure"),
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::Status(code) => write!(f, "HTTP {code}"),
        }
    }
}

/// Main error type for the weather pipeline
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Invalid or missing credential, detected before any request
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Provider rejected the credential (HTTP 401)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Provider does not know the queried location (HTTP 404)
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Timeouts, connection failures and unexpected status codes
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportFailure,
        message: String,
    },

    /// Payload did not have the expected shape
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },
}

/// Error categories ordered from least to most specific.
///
/// The orchestrator reports the greatest kind it saw when a whole cycle fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorKind {
    Validation,
    Parse,
    Transport,
    NotFound,
    Auth,
    Configuration,
}

impl WeatherError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(kind: TransportFailure, message: S) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::Configuration { .. } => ErrorKind::Configuration,
            WeatherError::Auth { .. } => ErrorKind::Auth,
            WeatherError::NotFound { .. } => ErrorKind::NotFound,
            WeatherError::Transport { .. } => ErrorKind::Transport,
            WeatherError::Parse { .. } => ErrorKind::Parse,
            WeatherError::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// Status code carried by a transport error, if any
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WeatherError::Transport {
                kind: TransportFailure::Status(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Configuration { .. } => {
                "A valid OpenWeatherMap API key is required. Get one at openweathermap.org and add it to your config file."
                    .to_string()
            }
            WeatherError::Auth { .. } => {
                "Error 401: the API key is invalid or not authorized.".to_string()
            }
            WeatherError::NotFound { .. } => "Error 404: location not found.".to_string(),
            WeatherError::Transport {
                kind: TransportFailure::Status(429),
                ..
            } => "Error 429: API call limit exceeded.".to_string(),
            WeatherError::Transport {
                kind: TransportFailure::Status(code),
                ..
            } => format!("The weather service answered with HTTP {code}."),
            WeatherError::Transport { .. } => {
                "Unable to reach the weather service. Please check your internet connection."
                    .to_string()
            }
            WeatherError::Parse { .. } => {
                "The weather service returned data that could not be read.".to_string()
            }
            WeatherError::Validation { message } => format!("Invalid input: {message}"),
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::transport(TransportFailure::Timeout, err.to_string())
        } else if let Some(status) = err.status() {
            WeatherError::transport(TransportFailure::Status(status.as_u16()), err.to_string())
        } else {
            WeatherError::transport(TransportFailure::Network, err.to_string())
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::parse(err.to_string())
    }
}
