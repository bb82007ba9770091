//! File strategy: execute a file as the top-level script

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use pyo3::prelude::*;
use pyo3::types::PyBytes;
use tracing::{debug, info};

use super::{ExitStatus, prepend_sys_path, set_argv, settle_completion};
use crate::error::LaunchError;

/// Run `script` in the `__main__` namespace, the way `python script` does
pub fn run_file(
    py: Python<'_>,
    script: &Path,
    args: &[OsString],
) -> Result<ExitStatus, LaunchError> {
    // Read the whole file up front: a missing script is a launcher error,
    // not something for the runtime to stumble over
    let source = fs::read(script).map_err(|source| LaunchError::ScriptUnreadable {
        path: script.to_path_buf(),
        source,
    })?;
    let absolute = std::path::absolute(script).map_err(|source| LaunchError::ScriptUnreadable {
        path: script.to_path_buf(),
        source,
    })?;
    info!("running script {} ({} bytes)", absolute.display(), source.len());

    if let Some(dir) = absolute.parent() {
        prepend_sys_path(py, dir)?;
    }
    set_argv(py, script.as_os_str(), args)?;

    let globals = py.import("__main__")?.dict();
    globals.set_item("__file__", script.as_os_str())?;
    globals.set_item("__cached__", py.None())?;
    debug!("__main__ prepared for {}", script.display());

    // Compiling from bytes lets the runtime honor coding declarations
    let builtins = py.import("builtins")?;
    let outcome = builtins
        .getattr("compile")?
        .call1((PyBytes::new(py, &source), script.as_os_str(), "exec"))
        .and_then(|code| builtins.getattr("exec")?.call1((code, &globals)));

    settle_completion(py, outcome)
}
