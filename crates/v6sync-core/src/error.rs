//! Error types for v6sync
//!
//! The variants follow how far a failure is allowed to travel during a run:
//! configuration errors abort before anything is touched, detection errors
//! skip one phase, everything else skips one target.

use thiserror::Error;

/// Result type alias for v6sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for v6sync
#[derive(Error, Debug)]
pub enum Error {
    /// A required configuration value is absent (fatal, pre-run)
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// A configuration value is present but malformed (fatal, pre-run)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Public IP detection failed (skips the phase)
    #[error("IP detection failed: {0}")]
    Detection(String),

    /// Text is not an IPv6 address this crate accepts
    #[error("Invalid IPv6 address '{text}': {reason}")]
    InvalidAddress {
        /// The offending input
        text: String,
        /// Why it was rejected
        reason: String,
    },

    /// A suffix expands to more than the 9 bytes available after the prefix
    #[error("Suffix '{suffix}' needs {bytes} bytes, at most 9 fit after the prefix")]
    SuffixTooLarge {
        /// The configured suffix
        suffix: String,
        /// Bytes the suffix would occupy without padding
        bytes: usize,
    },

    /// An external collaborator call failed
    #[error("{collaborator} error: {message}")]
    Collaborator {
        /// Collaborator name (e.g. "cloud-dns", "unifi")
        collaborator: String,
        /// Error message
        message: String,
    },

    /// Remote object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors (token files, helper processes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a missing-configuration error
    pub fn config_missing(msg: impl Into<String>) -> Self {
        Self::ConfigMissing(msg.into())
    }

    /// Create a malformed-configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a detection error
    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    /// Create an invalid-address error
    pub fn invalid_address(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Create a suffix-too-large error
    pub fn suffix_too_large(suffix: impl Into<String>, bytes: usize) -> Self {
        Self::SuffixTooLarge {
            suffix: suffix.into(),
            bytes,
        }
    }

    /// Create a collaborator error
    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error must abort the run before any target is processed
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigMissing(_) | Self::Config(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
