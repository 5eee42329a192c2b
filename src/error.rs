//! Error types for the tracker store and client cache.

use crate::types::TrackerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Journal is locked by another process")]
    Locked,

    #[error("Journal not initialized")]
    NotInitialized,

    #[error("Invalid journal format: {0}")]
    InvalidFormat(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for StoreError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        StoreError::Deserialization(e.to_string())
    }
}

/// A single field-level constraint violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field path, e.g. `problem` or `timeSpent`.
    pub path: String,
    pub message: String,
}

/// Every violation found while validating one input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether any violation was recorded against `path`.
    pub fn has(&self, path: &str) -> bool {
        self.0.iter().any(|e| e.path == path)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.path, e.message)?;
        }
        Ok(())
    }
}

/// Domain error taxonomy surfaced to callers.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Tracker not found: {0}")]
    NotFound(TrackerId),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Transport error ({status}): {message}")]
    Transport { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Unauthorized")]
    Unauthorized,
}

impl TrackerError {
    /// Whether the caller may reasonably try again. Nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrackerError::StoreUnavailable(_) | TrackerError::Transport { .. } | TrackerError::Timeout
        )
    }
}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        TrackerError::StoreUnavailable(e.to_string())
    }
}

impl From<ValidationErrors> for TrackerError {
    fn from(e: ValidationErrors) -> Self {
        TrackerError::Validation(e)
    }
}

/// Result type for backend operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        errors.push("problem", "Problem name is required");
        errors.push("attempts", "Attempts must be non-negative");

        assert_eq!(
            errors.to_string(),
            "problem: Problem name is required; attempts: Attempts must be non-negative"
        );
        assert!(errors.has("attempts"));
        assert!(!errors.has("notes"));
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_store_error_becomes_unavailable() {
        let err: TrackerError = StoreError::Unavailable("connection reset".into()).into();
        assert!(matches!(err, TrackerError::StoreUnavailable(_)));
        assert!(err.is_retryable());
        assert!(!TrackerError::NotFound(TrackerId::from("x")).is_retryable());
    }
}
