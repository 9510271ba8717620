//! Error handling for registry operations.
//!
//! This module defines the error type shared by frame building, the transport
//! session and response interpretation. The variants keep transport-level
//! failures apart from failures reported by the registry itself.

use std::fmt;
use std::time::Duration;

/// Main error type for registry operations.
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// A required session or file setting is missing or invalid.
    ///
    /// Raised before any network attempt.
    ConfigError { message: String },

    /// TLS handshake, connection or HTTP level failure.
    Transport {
        message: String,
        source: Option<String>,
    },

    /// No complete response arrived within the exchange ceiling.
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The registry answered with a non-success result code.
    Protocol { message: String, code: u32 },

    /// The response payload could not be decoded.
    Data {
        message: String,
        content: Option<String>,
    },

    /// Caller supplied data that violates a record invariant.
    InvalidInput { field: String, reason: String },

    /// Certificate or configuration file could not be read.
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl RegistryError {
    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new transport error.
    pub fn transport<M: Into<String>>(message: M) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new transport error with source information.
    pub fn transport_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new protocol error from a registry result.
    pub fn protocol<M: Into<String>>(message: M, code: u32) -> Self {
        Self::Protocol {
            message: message.into(),
            code,
        }
    }

    /// Create a new data (decoding) error.
    pub fn data<M: Into<String>>(message: M) -> Self {
        Self::Data {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new invalid input error.
    pub fn invalid_input<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this failure happened below the protocol layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Registry result code, when the registry produced one.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Message suitable for the host platform's `{error: ...}` record.
    ///
    /// Undecodable payloads are reported with a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Protocol { message, .. } => message.clone(),
            Self::Data { .. } => "Invalid response received from registry".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::Transport { message, source } => {
                if let Some(source) = source {
                    write!(f, "Transport error: {} (source: {})", message, source)
                } else {
                    write!(f, "Transport error: {}", message)
                }
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Protocol { message, code } => {
                write!(f, "Registry error {}: {}", code, message)
            }
            Self::Data { message, content: _ } => {
                write!(f, "Data error: {}", message)
            }
            Self::InvalidInput { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport_with_source("HTTPS request timed out", err.to_string())
        } else if err.is_connect() {
            Self::transport_with_source("Connection failed", err.to_string())
        } else if let Some(status) = err.status() {
            Self::transport_with_source(format!("Registry returned HTTP {}", status), err.to_string())
        } else {
            Self::transport_with_source("HTTPS request failed", err.to_string())
        }
    }
}

impl From<quick_xml::Error> for RegistryError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Data {
            message: format!("XML processing failed: {}", err),
            content: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for RegistryError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Data {
            message: format!("Malformed XML attribute: {}", err),
            content: None,
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization failed: {}", err))
    }
}

impl From<toml::de::Error> for RegistryError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
