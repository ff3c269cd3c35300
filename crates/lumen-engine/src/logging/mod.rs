//! Logger setup.
//!
//! Everything in the engine logs through the `log` facade; binaries pick the
//! backend by calling [`init_logging`] once at startup.

mod init;

pub use init::{init_logging, LoggingConfig};
