//! Lifecycle of the embedded Python runtime
//!
//! The interpreter is process-wide. Access goes through an [`Interpreter`]
//! guard so that bring-up and shutdown are explicit and paired:
//!
//! ```text
//! NotStarted -> Active -> Released -> Active -> ... -> Finalized
//! ```
//!
//! Dropping the guard flushes Python's standard streams and releases the
//! runtime for a later bring-up. [`Interpreter::finalize`] tears the runtime
//! down for good; nothing can be brought up afterwards.

use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use pyo3::prelude::*;
use tracing::{debug, info, warn};

use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::launch::{self, ExitStatus};

/// Exit status CPython uses when flushing buffered data fails at shutdown
const FINALIZE_FAILURE: u8 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    NotStarted,
    Active,
    Released,
    Finalized,
}

static RUNTIME_STATE: OnceLock<Mutex<RuntimeState>> = OnceLock::new();

fn lock_state() -> MutexGuard<'static, RuntimeState> {
    RUNTIME_STATE
        .get_or_init(|| Mutex::new(RuntimeState::NotStarted))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Current lifecycle state of the runtime
pub fn state() -> RuntimeState {
    *lock_state()
}

/// Scoped handle on the active runtime
///
/// Only one guard exists at a time. The guard is tied to the thread that
/// brought the runtime up.
pub struct Interpreter {
    _not_send: PhantomData<*const ()>,
}

impl Interpreter {
    /// Bring the runtime up and take the active guard
    pub fn bring_up() -> Result<Self, LaunchError> {
        let mut state = lock_state();
        match *state {
            RuntimeState::Active => return Err(LaunchError::AlreadyActive),
            RuntimeState::Finalized => return Err(LaunchError::Finalized),
            RuntimeState::NotStarted => {
                Python::initialize();
                info!("Python runtime initialized");
            }
            RuntimeState::Released => debug!("Python runtime reacquired"),
        }
        *state = RuntimeState::Active;

        Ok(Self {
            _not_send: PhantomData,
        })
    }

    /// Hand control to the application using the configured strategy
    pub fn run(&self, config: &LaunchConfig) -> Result<ExitStatus, LaunchError> {
        Python::attach(|py| launch::run(py, config))
    }

    /// Shut the runtime down for good
    ///
    /// Runs Python's own shutdown sequence: atexit handlers, non-daemon
    /// thread joins, and the final flush of the standard streams.
    pub fn finalize(self) -> ExitStatus {
        // Drop must not run: it would touch the runtime after teardown
        std::mem::forget(self);

        let mut state = lock_state();
        info!("finalizing Python runtime");

        // SAFETY: the runtime was initialized by `bring_up` and every Python
        // object the launcher created lives inside a `Python::attach` scope
        // that has already ended. The state switch below prevents any later
        // use of the runtime through this module.
        let rc = unsafe {
            let _gil = pyo3::ffi::PyGILState_Ensure();
            pyo3::ffi::Py_FinalizeEx()
        };
        *state = RuntimeState::Finalized;

        if rc < 0 {
            warn!("Python runtime failed to flush buffered data at shutdown");
            ExitStatus::from(FINALIZE_FAILURE)
        } else {
            ExitStatus::SUCCESS
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        Python::attach(|py| {
            if let Err(e) = flush_std_streams(py) {
                warn!("failed to flush Python streams: {}", e);
            }
        });
        *lock_state() = RuntimeState::Released;
        debug!("Python runtime released");
    }
}

/// Flush `sys.stdout` and `sys.stderr` when they exist
fn flush_std_streams(py: Python<'_>) -> PyResult<()> {
    let sys = py.import("sys")?;
    for name in ["stdout", "stderr"] {
        let stream = sys.getattr(name)?;
        if !stream.is_none() {
            stream.call_method0("flush")?;
        }
    }
    Ok(())
}
