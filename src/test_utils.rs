#![expect(
    clippy::unwrap_used,
    reason = "Test helpers fail the test on setup errors"
)]

//! Shared helpers for unit tests that touch the file system.

use std::sync::Mutex;
use tempfile::TempDir;

/// Serialises tests that override `APPDATA`
static APPDATA_LOCK: Mutex<()> = Mutex::new(());

/// Fresh temp directory, removed on drop
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Points `APPDATA` at a temp directory for the guard's lifetime
///
/// `HandsOff` resolves `%APPDATA%\HandsOff` for its config and log files, so
/// tests redirect it. Guards are serialised through `APPDATA_LOCK`; the
/// previous value (or its absence) is restored on drop, including on panic.
pub struct AppdataGuard {
    original: Option<String>,
    // Held until drop
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[expect(
    unsafe_code,
    reason = "Test-only APPDATA override, serialised by APPDATA_LOCK"
)]
impl AppdataGuard {
    /// Create a new guard that sets APPDATA to the given temp directory path.
    pub fn new(temp_dir: &TempDir) -> Self {
        // A test that panicked while holding the lock still restored APPDATA
        let lock = APPDATA_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let original = std::env::var("APPDATA").ok();
        // SAFETY: APPDATA_LOCK serialises every writer; readers are the tests
        // holding this guard.
        unsafe {
            std::env::set_var("APPDATA", temp_dir.path());
        }
        Self {
            original,
            _lock: lock,
        }
    }
}

#[expect(
    unsafe_code,
    reason = "Test-only APPDATA restore, serialised by APPDATA_LOCK"
)]
impl Drop for AppdataGuard {
    fn drop(&mut self) {
        // SAFETY: the lock is still held by this guard.
        if let Some(ref original) = self.original {
            unsafe {
                std::env::set_var("APPDATA", original);
            }
        } else {
            unsafe {
                std::env::remove_var("APPDATA");
            }
        }
    }
}
