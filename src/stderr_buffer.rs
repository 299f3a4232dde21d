use std::sync::{Mutex, MutexGuard};

static BUFFER: Mutex<Option<Vec<String>>> = Mutex::new(None);

/// Serializes tests that activate the shared buffer
#[cfg(test)]
pub(crate) static TEST_GUARD: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, Option<Vec<String>>> {
    // A panic while holding the lock leaves the Vec intact
    BUFFER.lock().unwrap_or_else(|e| e.into_inner())
}

/// Start holding back diagnostics, e.g. while a watch refresh redraws the
/// score card. Messages are released by `drain`.
pub fn activate() {
    *lock() = Some(Vec::new());
}

/// Stop buffering and return everything collected since `activate`.
pub fn drain() -> Vec<String> {
    lock().take().unwrap_or_default()
}

/// Emit a diagnostic line. Buffered when active, otherwise written to stderr.
pub fn warn(msg: String) {
    let mut guard = lock();
    if let Some(buf) = guard.as_mut() {
        buf.push(msg);
    } else {
        drop(guard);
        eprintln!("{}", msg);
    }
}

/// `eprintln!` that routes through the stderr buffer when it is active.
#[macro_export]
macro_rules! buffered_eprintln {
    ($($arg:tt)*) => {
        $crate::stderr_buffer::warn(format!($($arg)*))
    };
}
