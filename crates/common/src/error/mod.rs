//! Errors shared by the `credstore-common` building blocks.
//!
//! [`CommonError`] covers failures that are not specific to one module.
//! Module errors such as `StorageError` wrap it with `#[from]` rather than
//! repeating its variants, and implement [`ErrorClassification`] so callers
//! can tell transient failures from broken configuration or tampering.

use std::fmt;

use thiserror::Error;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Wrong key, bad nonce or altered ciphertext.
    #[error("Cryptographic error: {message}")]
    Crypto { message: String },

    #[error("Serialization error ({format}): {message}")]
    Serialization { format: &'static str, message: String },

    #[error("Storage error during '{operation}': {message}")]
    Storage { operation: String, message: String },

    #[error("Lock contention on '{resource}'")]
    Lock { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CommonError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto { message: message.into() }
    }

    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage { operation: operation.into(), message: message.into() }
    }

    pub fn lock(resource: impl Into<String>) -> Self {
        Self::Lock { resource: resource.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Lock { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Crypto { .. } | Self::Internal { .. } => ErrorSeverity::Critical,
            Self::Lock { .. } => ErrorSeverity::Warning,
            Self::Config { .. } | Self::Serialization { .. } | Self::Storage { .. } => {
                ErrorSeverity::Error
            }
        }
    }
}

/// Classifies errors so callers can decide whether to retry and how loudly
/// to log.
pub trait ErrorClassification {
    /// Transient failures (lock contention, busy database) that may succeed
    /// on retry.
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Data integrity or security problems.
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { format: "JSON", message: err.to_string() }
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization { format: "TOML", message: err.to_string() }
    }
}
