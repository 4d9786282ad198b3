//! Single instance enforcement through a named mutex

use crate::error::Result;

#[cfg(windows)]
use crate::error::{HandsOffError, StringError};
#[cfg(windows)]
use windows::Win32::Foundation::{CloseHandle, HANDLE};
#[cfg(windows)]
use windows::Win32::System::Threading::{CreateMutexW, OpenMutexW, SYNCHRONIZATION_SYNCHRONIZE};

/// Mutex name shared by every session on the machine
pub const MUTEX_NAME: &str = "Global\\HandsOff_SingleInstance_Mutex";

/// Holds the named mutex until dropped
#[cfg(windows)]
pub struct SingleInstanceGuard {
    mutex_handle: HANDLE,
}

#[cfg(windows)]
impl SingleInstanceGuard {
    /// Take the mutex, or fail if another instance holds it
    #[expect(unsafe_code, reason = "Windows FFI for named mutex")]
    pub fn new() -> Result<Self> {
        use tracing::{debug, error};
        use windows::core::HSTRING;

        let mutex_name = HSTRING::from(MUTEX_NAME);

        // SAFETY: mutex_name is a valid null-terminated wide string for both calls.
        unsafe {
            if let Ok(existing) = OpenMutexW(SYNCHRONIZATION_SYNCHRONIZE, false, &mutex_name) {
                error!("Another instance of HandsOff is already running");
                let _ = CloseHandle(existing);
                return Err(HandsOffError::ConfigError(StringError::new(
                    "Another instance of HandsOff is already running",
                )));
            }

            let mutex_handle = CreateMutexW(None, true, &mutex_name)?;
            debug!("Single instance mutex acquired");
            Ok(Self { mutex_handle })
        }
    }
}

#[cfg(windows)]
impl Drop for SingleInstanceGuard {
    #[expect(unsafe_code, reason = "Windows FFI for mutex cleanup")]
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateMutexW and is closed exactly once.
        unsafe {
            let _ = CloseHandle(self.mutex_handle);
        }
        tracing::debug!("Single instance mutex released");
    }
}

/// No-op guard off Windows
#[cfg(not(windows))]
pub struct SingleInstanceGuard;

#[cfg(not(windows))]
impl SingleInstanceGuard {
    /// Always succeeds
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}
