//! Error types for the famlog extraction pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using famlog's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for extraction operations.
///
/// Adapters propagate these internally with `?` and convert them exactly once
/// into a failed [`crate::ExtractionResult`] at the adapter boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend requires a credential that is not configured
    #[error("Credential missing: {0}")]
    CredentialMissing(String),

    /// The referenced media does not exist
    #[error("Media not found: {0}")]
    MediaNotFound(String),

    /// A local capability the backend depends on is absent
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// HTTP/network request failed or timed out
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Remote returned a non-2xx status or a payload that could not be decoded
    #[error("Remote error: {0}")]
    RemoteError(String),

    /// Structured fields could not be located or decoded in model output
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// Every backend in a chain failed
    #[error("Chain exhausted: {0}")]
    ChainExhausted(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error into the failure kind reported on a failed result.
    ///
    /// Ambient variants fold into the closest extraction kind: a broken
    /// configuration makes the backend unavailable, undecodable JSON is a
    /// parse failure, and unreadable media counts as missing media.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::CredentialMissing(_) => FailureKind::CredentialMissing,
            Error::MediaNotFound(_) | Error::Io(_) => FailureKind::MediaNotFound,
            Error::BackendUnavailable(_) | Error::Config(_) => FailureKind::BackendUnavailable,
            Error::NetworkFailure(_) => FailureKind::NetworkFailure,
            Error::RemoteError(_) => FailureKind::RemoteError,
            Error::ParseFailure(_) | Error::Serialization(_) => FailureKind::ParseFailure,
            Error::ChainExhausted(_) => FailureKind::ChainExhausted,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() || e.is_status() {
            Error::RemoteError(e.to_string())
        } else {
            Error::NetworkFailure(e.to_string())
        }
    }
}

/// Inspectable failure classification carried by a failed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    CredentialMissing,
    MediaNotFound,
    BackendUnavailable,
    NetworkFailure,
    RemoteError,
    ParseFailure,
    ChainExhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "CredentialMissing",
            Self::MediaNotFound => "MediaNotFound",
            Self::BackendUnavailable => "BackendUnavailable",
            Self::NetworkFailure => "NetworkFailure",
            Self::RemoteError => "RemoteError",
            Self::ParseFailure => "ParseFailure",
            Self::ChainExhausted => "ChainExhausted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
