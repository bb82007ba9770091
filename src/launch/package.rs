//! Package strategy: run `package.__main__` as the top-level script

use std::ffi::{OsStr, OsString};

use pyo3::prelude::*;
use pyo3::types::PyDict;
use tracing::info;

use super::entry::is_missing_module;
use super::{ExitStatus, prepend_sys_path, set_argv, settle, settle_completion};
use crate::error::LaunchError;

/// Equivalent of `python -m package args...`
pub fn run_package(
    py: Python<'_>,
    package: &str,
    args: &[OsString],
) -> Result<ExitStatus, LaunchError> {
    let cwd = std::env::current_dir().map_err(PyErr::from)?;
    prepend_sys_path(py, &cwd)?;
    // runpy replaces argv[0] with the path of the module it runs
    set_argv(py, OsStr::new(package), args)?;

    // Check the package exists before handing over, so that an absent
    // package is reported as such and not as an application failure
    let find_spec = py.import("importlib.util")?.getattr("find_spec")?;
    match find_spec.call1((package,)) {
        Ok(spec) if spec.is_none() => {
            return Err(LaunchError::module_not_found(package, None));
        }
        Ok(_) => {}
        Err(err) if is_missing_module(py, &err, package) => {
            return Err(LaunchError::module_not_found(package, Some(err)));
        }
        Err(err) => return settle(py, Err(err)),
    }
    info!("running package {} as __main__", package);

    let kwargs = PyDict::new(py);
    kwargs.set_item("run_name", "__main__")?;
    kwargs.set_item("alter_sys", true)?;
    let outcome = py
        .import("runpy")?
        .call_method("run_module", (package,), Some(&kwargs));

    settle_completion(py, outcome)
}
