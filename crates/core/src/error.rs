//! Core error types

use thiserror::Error;

/// Core error type for ensdex
#[derive(Debug, Error)]
pub enum CoreError {
    /// Label cannot be normalized into a registrable label
    #[error("Invalid label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: &'static str },

    /// Text claimed to be a fallback-encoded label hash but is not
    #[error("Malformed label hash encoding: {0}")]
    MalformedLabel(String),

    /// Hex digest or address could not be parsed
    #[error("Invalid hex value: {0}")]
    InvalidHex(String),

    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
