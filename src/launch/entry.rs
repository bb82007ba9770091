//! Import strategy: resolve `module.attr` and run it as `attr()()`
//!
//! The entry point is a factory. Calling it builds the application object
//! and calling that object runs it; its return value is the exit status.

use std::ffi::{OsStr, OsString};

use pyo3::exceptions::{PyAttributeError, PyModuleNotFoundError};
use pyo3::prelude::*;
use tracing::{debug, info};

use super::{ExitStatus, prepend_sys_path, set_argv, settle};
use crate::error::LaunchError;

pub fn run_entry(
    py: Python<'_>,
    module_name: &str,
    attr: &str,
    program: &OsStr,
    args: &[OsString],
) -> Result<ExitStatus, LaunchError> {
    // Same lookup root as `python -m`
    let cwd = std::env::current_dir().map_err(PyErr::from)?;
    prepend_sys_path(py, &cwd)?;
    set_argv(py, program, args)?;

    let module = match py.import(module_name) {
        Ok(module) => module,
        Err(err) if is_missing_module(py, &err, module_name) => {
            return Err(LaunchError::module_not_found(module_name, Some(err)));
        }
        // The module exists but failed while importing
        Err(err) => return settle(py, Err(err)),
    };

    let factory = match module.getattr(attr) {
        Ok(factory) => factory,
        Err(err) if err.is_instance_of::<PyAttributeError>(py) => {
            return Err(LaunchError::AttributeNotFound {
                module: module_name.to_string(),
                attr: attr.to_string(),
            });
        }
        Err(err) => return settle(py, Err(err)),
    };
    if !factory.is_callable() {
        return Err(LaunchError::not_callable(format!("{}.{}", module_name, attr)));
    }
    info!("calling {}.{}", module_name, attr);

    let app = match factory.call0() {
        Ok(app) => app,
        Err(err) => return settle(py, Err(err)),
    };
    if !app.is_callable() {
        return Err(LaunchError::not_callable(format!("{}.{}()", module_name, attr)));
    }
    debug!("entry factory returned {}", app.get_type());

    settle(py, app.call0())
}

/// Whether `err` says `module` (or one of its parent packages) is absent
///
/// A `ModuleNotFoundError` about some other module means the target was
/// found but one of its own imports failed.
pub(super) fn is_missing_module(py: Python<'_>, err: &PyErr, module: &str) -> bool {
    if !err.is_instance_of::<PyModuleNotFoundError>(py) {
        return false;
    }
    let name: Option<String> = err
        .value(py)
        .getattr("name")
        .and_then(|name| name.extract())
        .unwrap_or(None);

    match name {
        Some(name) => module == name || module.starts_with(&format!("{}.", name)),
        None => true,
    }
}
