//! Logging utilities.
//!
//! Logger initialization over the `log` facade plus the file sink used for backend
//! diagnostics.

mod debug_log;
mod init;

pub use debug_log::DebugLog;
pub use init::{init_logging, LoggingConfig};
