//! Launch on startup
//!
//! Registered as a Task Scheduler task rather than a `Run` registry value:
//! changing device state needs elevation, and only a task can start an
//! elevated process at logon without a UAC prompt.

use crate::error::{HandsOffError, Result, StringError};
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// Name of the scheduled task
pub const TASK_NAME: &str = "HandsOff";

/// Persistence of the "launch on startup" choice
pub trait StartupRegistration {
    /// Whether the application is registered to start at logon
    fn is_registered(&self) -> Result<bool>;

    /// Register or unregister; unregistering when absent succeeds
    fn set_registered(&self, registered: bool) -> Result<()>;
}

/// `schtasks` arguments creating a logon task that runs `exe` elevated
pub fn create_task_args(exe: &Path) -> Vec<String> {
    vec![
        "/Create".to_string(),
        "/TN".to_string(),
        TASK_NAME.to_string(),
        "/TR".to_string(),
        format!("\"{}\"", exe.display()),
        "/SC".to_string(),
        "ONLOGON".to_string(),
        "/RL".to_string(),
        "HIGHEST".to_string(),
        "/F".to_string(),
    ]
}

/// `schtasks` arguments querying the task
pub fn query_task_args() -> Vec<String> {
    vec!["/Query".to_string(), "/TN".to_string(), TASK_NAME.to_string()]
}

/// `schtasks` arguments deleting the task
pub fn delete_task_args() -> Vec<String> {
    vec![
        "/Delete".to_string(),
        "/TN".to_string(),
        TASK_NAME.to_string(),
        "/F".to_string(),
    ]
}

/// Registration through `schtasks.exe`
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskSchedulerAutoStart;

impl TaskSchedulerAutoStart {
    fn schtasks(args: &[String]) -> Result<std::process::Output> {
        let mut command = std::process::Command::new("schtasks");
        command.args(args);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        debug!("schtasks {}", args.join(" "));
        command
            .output()
            .map_err(|e| HandsOffError::StartupRegistrationFailed(Box::new(e)))
    }

    fn run_checked(args: &[String]) -> Result<()> {
        let output = Self::schtasks(args)?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(HandsOffError::StartupRegistrationFailed(StringError::new(
                stderr.trim().to_string(),
            )))
        }
    }
}

impl StartupRegistration for TaskSchedulerAutoStart {
    fn is_registered(&self) -> Result<bool> {
        // Non-zero exit means the task doesn't exist
        Ok(Self::schtasks(&query_task_args())?.status.success())
    }

    fn set_registered(&self, registered: bool) -> Result<()> {
        if registered {
            let exe = std::env::current_exe()?;
            Self::run_checked(&create_task_args(&exe))?;
            info!("Registered startup task for {}", exe.display());
        } else if self.is_registered()? {
            Self::run_checked(&delete_task_args())?;
            info!("Removed startup task");
        }
        Ok(())
    }
}

/// In-memory registration for tests
#[derive(Debug, Default)]
pub struct MemoryAutoStart {
    registered: Mutex<bool>,
}

impl StartupRegistration for MemoryAutoStart {
    fn is_registered(&self) -> Result<bool> {
        Ok(*self.registered.lock())
    }

    fn set_registered(&self, registered: bool) -> Result<()> {
        *self.registered.lock() = registered;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_create_args_quote_path_and_elevate() {
        let exe = PathBuf::from("C:\\Program Files\\HandsOff\\handsoff.exe");
        let args = create_task_args(&exe);

        assert_eq!(args[0], "/Create");
        assert!(args.contains(&"\"C:\\Program Files\\HandsOff\\handsoff.exe\"".to_string()));
        let sc = args.iter().position(|a| a == "/SC").unwrap();
        assert_eq!(args[sc + 1], "ONLOGON");
        let rl = args.iter().position(|a| a == "/RL").unwrap();
        assert_eq!(args[rl + 1], "HIGHEST");
    }

    #[test]
    fn test_query_and_delete_name_the_task() {
        assert!(query_task_args().contains(&TASK_NAME.to_string()));
        let delete = delete_task_args();
        assert_eq!(delete.first().map(String::as_str), Some("/Delete"));
        assert!(delete.contains(&TASK_NAME.to_string()));
    }

    #[test]
    fn test_memory_registration() {
        let autostart = MemoryAutoStart::default();
        assert!(!autostart.is_registered().unwrap());

        autostart.set_registered(true).unwrap();
        assert!(autostart.is_registered().unwrap());

        autostart.set_registered(false).unwrap();
        autostart.set_registered(false).unwrap();
        assert!(!autostart.is_registered().unwrap());
    }
}
