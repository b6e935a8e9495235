//! Error types for sodalite-k8s.
//!
//! Module-level failures are [`ModuleError`]s. This crate-level [`Error`]
//! wraps them together with the I/O and serialization failures met while
//! reading parameter files and cluster state.

use crate::modules::ModuleError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sodalite-k8s operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for sodalite-k8s.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Module Errors
    // ========================================================================
    /// Module not found.
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    /// Building, validating or applying a definition failed.
    #[error("Module '{module}' failed: {source}")]
    Module {
        /// Module name
        module: String,
        /// Underlying module error
        #[source]
        source: ModuleError,
    },

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// A parameter or state file could not be understood.
    #[error("Invalid file '{path}': {message}")]
    InvalidFile {
        /// Path to the file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Wrapped Errors
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach the module name to a [`ModuleError`].
    pub fn module(module: impl Into<String>, source: ModuleError) -> Self {
        match source {
            ModuleError::NotFound(name) => Error::ModuleNotFound(name),
            source => Error::Module {
                module: module.into(),
                source,
            },
        }
    }

    /// The module error behind this error, if any.
    pub fn as_module_error(&self) -> Option<&ModuleError> {
        match self {
            Error::Module { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Process exit code for this error.
    ///
    /// Validation failures exit with 2 so scripts can tell bad input apart
    /// from failures talking to the cluster.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Module {
                source:
                    ModuleError::Validation(_)
                    | ModuleError::InvalidParameter(_)
                    | ModuleError::MissingParameter(_),
                ..
            } => 2,
            Error::ModuleNotFound(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ValidationError, ValidationErrors};

    #[test]
    fn test_error_display() {
        let err = Error::ModuleNotFound("k8s_pod".to_string());
        assert_eq!(err.to_string(), "Module 'k8s_pod' not found");

        let err = Error::module(
            "k8s_configmap",
            ModuleError::MissingParameter("name".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Module 'k8s_configmap' failed: Missing required parameter: name"
        );
    }

    #[test]
    fn test_not_found_is_lifted() {
        let err = Error::module("x", ModuleError::NotFound("k8s_pod".to_string()));
        assert!(matches!(err, Error::ModuleNotFound(ref m) if m == "k8s_pod"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_codes() {
        let validation = ModuleError::Validation(ValidationErrors::from(vec![
            ValidationError::new("name", "'name' is invalid"),
        ]));
        assert_eq!(Error::module("k8s_namespace", validation).exit_code(), 2);
        assert_eq!(
            Error::module("k8s_namespace", ModuleError::ExecutionFailed("boom".into())).exit_code(),
            1
        );
        assert_eq!(Error::Config("bad".into()).exit_code(), 1);
    }
}
