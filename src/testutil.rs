use std::sync::{Mutex, MutexGuard, PoisonError};

static RUNTIME_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that bring the process-wide runtime up
pub fn lock() -> MutexGuard<'static, ()> {
    RUNTIME_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
