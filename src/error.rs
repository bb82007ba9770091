//! Launcher error types

use std::io;
use std::path::PathBuf;

use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    // Configuration
    #[error("invalid value {value:?} for {key}: expected one of {expected}")]
    InvalidConfig {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    // Lookups
    #[error("cannot read script {}", .path.display())]
    ScriptUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("module '{module}' not found")]
    ModuleNotFound {
        module: String,
        #[source]
        source: Option<PyErr>,
    },

    #[error("module '{module}' has no attribute '{attr}'")]
    AttributeNotFound { module: String, attr: String },

    #[error("'{what}' is not callable")]
    NotCallable { what: String },

    // Runtime lifecycle
    #[error("the Python runtime is already active")]
    AlreadyActive,

    #[error("the Python runtime has been finalized")]
    Finalized,

    #[error("Python error: {0}")]
    Python(#[from] PyErr),
}

impl LaunchError {
    pub fn invalid_config(key: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        LaunchError::InvalidConfig {
            key,
            value: value.into(),
            expected,
        }
    }

    pub fn module_not_found(module: impl Into<String>, source: Option<PyErr>) -> Self {
        LaunchError::ModuleNotFound {
            module: module.into(),
            source,
        }
    }

    pub fn not_callable(what: impl Into<String>) -> Self {
        LaunchError::NotCallable { what: what.into() }
    }
}
