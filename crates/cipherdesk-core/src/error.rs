//! Error taxonomy shared by every orchestrator operation.
//!
//! Nothing crosses the IPC boundary as a panic: every operation returns an
//! [`Outcome`], and callers branch on [`ErrorKind`] rather than message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::engine::EngineError;

/// Result channel for every cross-boundary call.
pub type Outcome<T> = std::result::Result<T, OrchestratorError>;

/// RSA key component named in a [`OrchestratorError::MissingKeyField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyField {
    N,
    E,
    D,
}

impl KeyField {
    pub fn describe(&self) -> &'static str {
        match self {
            KeyField::N => "modulus",
            KeyField::E => "public exponent, required for encryption",
            KeyField::D => "private exponent, required for decryption",
        }
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyField::N => "n",
            KeyField::E => "e",
            KeyField::D => "d",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("No active file to process")]
    NoActiveFile,

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid RSA key size: {bits} bits is below the minimum of {min} bits")]
    InvalidKeySize { bits: u32, min: u32 },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("RSA key is missing field \"{0}\" ({})", .0.describe())]
    MissingKeyField(KeyField),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Cancelled by user")]
    Cancelled,

    #[error("The log is empty, nothing to export")]
    NothingToExport,
}

/// Fieldless discriminant of [`OrchestratorError`], serialised for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoActiveFile,
    InvalidOptions,
    InvalidKeySize,
    InvalidFormat,
    MissingKeyField,
    ProcessingFailed,
    Io,
    Cancelled,
    NothingToExport,
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::NoActiveFile => ErrorKind::NoActiveFile,
            OrchestratorError::InvalidOptions(_) => ErrorKind::InvalidOptions,
            OrchestratorError::InvalidKeySize { .. } => ErrorKind::InvalidKeySize,
            OrchestratorError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            OrchestratorError::MissingKeyField(_) => ErrorKind::MissingKeyField,
            OrchestratorError::ProcessingFailed(_) => ErrorKind::ProcessingFailed,
            OrchestratorError::Io(_) => ErrorKind::Io,
            OrchestratorError::Cancelled => ErrorKind::Cancelled,
            OrchestratorError::NothingToExport => ErrorKind::NothingToExport,
        }
    }

    /// `Cancelled` reflects user intent and must not be shown as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestratorError::Cancelled)
    }
}

impl From<std::io::Error> for OrchestratorError {
    fn from(e: std::io::Error) -> Self {
        OrchestratorError::Io(e.to_string())
    }
}

impl From<EngineError> for OrchestratorError {
    fn from(e: EngineError) -> Self {
        OrchestratorError::ProcessingFailed(e.to_string())
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        OrchestratorError::InvalidFormat(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_the_field() {
        let err = OrchestratorError::MissingKeyField(KeyField::E);
        let msg = err.to_string();
        assert!(msg.contains("\"e\""));
        assert!(msg.contains("public exponent"));
        assert_eq!(err.kind(), ErrorKind::MissingKeyField);
    }

    #[test]
    fn engine_errors_become_processing_failed() {
        let err: OrchestratorError = EngineError::Rejected("key too short".into()).into();
        assert_eq!(err.kind(), ErrorKind::ProcessingFailed);
        assert!(err.to_string().contains("key too short"));
    }

    #[test]
    fn kinds_serialise_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NothingToExport).unwrap();
        assert_eq!(json, "\"nothing_to_export\"");
        assert!(OrchestratorError::Cancelled.is_cancelled());
        assert!(!OrchestratorError::Io("disk full".into()).is_cancelled());
    }
}
