pub mod entry;
pub mod package;
pub mod script;

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::ExitCode;

use pyo3::exceptions::{PyKeyboardInterrupt, PySystemExit};
use pyo3::prelude::*;
use pyo3::types::{PyInt, PyList};
use tracing::{debug, info};

use crate::config::{LaunchConfig, Strategy};
use crate::error::LaunchError;

/// Process exit status reported by the launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(u8);

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus(0);
    pub const FAILURE: ExitStatus = ExitStatus(1);
    /// Uncaught KeyboardInterrupt, as a shell reports a SIGINT death
    pub const INTERRUPTED: ExitStatus = ExitStatus(130);

    pub fn code(self) -> u8 {
        self.0
    }
}

impl From<u8> for ExitStatus {
    fn from(code: u8) -> Self {
        ExitStatus(code)
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.0)
    }
}

/// Dispatch to the configured startup strategy
pub fn run(py: Python<'_>, config: &LaunchConfig) -> Result<ExitStatus, LaunchError> {
    info!("starting application ({} strategy)", config.strategy.name());

    let status = match &config.strategy {
        Strategy::File { script } => script::run_file(py, script, &config.args)?,
        Strategy::Import { module, attr } => {
            entry::run_entry(py, module, attr, &config.program, &config.args)?
        }
        Strategy::Package { package } => package::run_package(py, package, &config.args)?,
    };

    info!("application finished with status {}", status.code());
    Ok(status)
}

/// Replace `sys.argv` with `[argv0, *args]`
pub(crate) fn set_argv(py: Python<'_>, argv0: &OsStr, args: &[OsString]) -> PyResult<()> {
    let argv: Vec<&OsStr> = std::iter::once(argv0)
        .chain(args.iter().map(OsString::as_os_str))
        .collect();
    let list = PyList::new(py, argv)?;
    debug!("sys.argv = {}", list);
    py.import("sys")?.setattr("argv", list)
}

/// Put `dir` in front of `sys.path` unless it is already first
pub(crate) fn prepend_sys_path(py: Python<'_>, dir: &Path) -> PyResult<()> {
    let path = py.import("sys")?.getattr("path")?;
    let entry = dir.as_os_str();

    let already_first = match path.get_item(0) {
        Ok(first) => first.eq(entry)?,
        Err(_) => false,
    };
    if !already_first {
        path.call_method1("insert", (0, entry))?;
        debug!("sys.path[0] = {}", dir.display());
    }
    Ok(())
}

/// Turn the application's outcome into an exit status
///
/// A returned value and a `SystemExit` code follow the same rules:
/// `None` is success, an integer is the status, anything else is printed to
/// `sys.stderr` and counts as failure. Other exceptions are printed with
/// their traceback.
pub(crate) fn settle(
    py: Python<'_>,
    outcome: PyResult<Bound<'_, PyAny>>,
) -> Result<ExitStatus, LaunchError> {
    match outcome {
        Ok(value) => exit_status_for(py, &value),
        Err(err) if err.is_instance_of::<PySystemExit>(py) => {
            // Intercepted here: printing a SystemExit would exit the process
            let code = err.value(py).getattr("code")?;
            debug!("application raised SystemExit({})", code);
            exit_status_for(py, &code)
        }
        Err(err) => {
            debug!("uncaught exception in application: {}", err);
            let interrupted = err.is_instance_of::<PyKeyboardInterrupt>(py);
            err.print(py);
            Ok(if interrupted {
                ExitStatus::INTERRUPTED
            } else {
                ExitStatus::FAILURE
            })
        }
    }
}

/// Like [`settle`], for strategies whose return value carries no status
pub(crate) fn settle_completion<T>(
    py: Python<'_>,
    outcome: PyResult<T>,
) -> Result<ExitStatus, LaunchError> {
    settle(py, outcome.map(|_| py.None().into_bound(py)))
}

fn exit_status_for(py: Python<'_>, value: &Bound<'_, PyAny>) -> Result<ExitStatus, LaunchError> {
    if value.is_none() {
        return Ok(ExitStatus::SUCCESS);
    }
    if value.is_instance_of::<PyInt>() {
        // Codes that do not fit a C long end up as -1, like CPython
        let code = value.extract::<i64>().unwrap_or(-1);
        return Ok(ExitStatus::from((code & 0xff) as u8));
    }

    let message = value.str()?;
    py.import("sys")?
        .getattr("stderr")?
        .call_method1("write", (format!("{}\n", message),))?;
    Ok(ExitStatus::FAILURE)
}
