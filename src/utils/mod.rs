//! Utility modules
//!
//! Launch-on-startup registration, logging and single instance enforcement.

pub mod autostart;
pub mod logging;
pub mod single_instance;

pub use autostart::{MemoryAutoStart, StartupRegistration, TaskSchedulerAutoStart};
pub use logging::init_logging;
pub use single_instance::SingleInstanceGuard;
