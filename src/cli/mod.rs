//! Command-line interface components
//!
//! Argument parsing and the handlers that turn arguments into a mirror run.

pub mod args;
pub mod commands;

pub use args::{Cli, GlobalArgs, SyncArgs};
pub use commands::{handle_init_config, handle_sync, session_config};
