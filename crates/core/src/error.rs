//! Error types for docrank
//!
//! This module defines all error types used throughout the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Only registry lifecycle misuse and configuration/storage failures are
//! surfaced as errors. Per-candidate conditions during ranking (missing filter
//! attributes, comparison mismatches, deleted candidates) are logged and
//! skipped, never returned.

use crate::attribute::CompareOp;
use std::io;
use thiserror::Error;

/// Result type alias for docrank operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for docrank
#[derive(Debug, Error)]
pub enum Error {
    /// `init` was called on a registry that is already initialized
    #[error("Registry is already initialized")]
    AlreadyInitialized,

    /// A registry operation was attempted before `init`
    #[error("Registry has not been initialized")]
    NotInitialized,

    /// Full documents were requested from an ID-only registry
    #[error("Mode mismatch: {0}")]
    ModeMismatch(String),

    /// A filter value cannot be compared with the stored attribute value
    #[error("Cannot compare attribute '{attr}' ({stored}) with {given} using {op}")]
    TypeMismatch {
        /// Attribute name
        attr: String,
        /// Kind of the stored value
        stored: &'static str,
        /// Kind of the filter value
        given: &'static str,
        /// Operator that was attempted
        op: CompareOp,
    },

    /// Invalid configuration value or file
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Document store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_lifecycle() {
        assert!(Error::AlreadyInitialized
            .to_string()
            .contains("already initialized"));
        assert!(Error::NotInitialized
            .to_string()
            .contains("not been initialized"));
    }

    #[test]
    fn test_error_display_type_mismatch() {
        let err = Error::TypeMismatch {
            attr: "color".to_string(),
            stored: "string",
            given: "int",
            op: CompareOp::Gt,
        };
        let msg = err.to_string();
        assert!(msg.contains("color"));
        assert!(msg.contains("string"));
        assert!(msg.contains("int"));
        assert!(msg.contains("gt"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let result: Result<u64> = serde_json::from_str::<u64>("not a number").map_err(|e| e.into());
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_error_from_toml() {
        let result: Result<toml::Value> = toml::from_str("= broken").map_err(|e| e.into());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
