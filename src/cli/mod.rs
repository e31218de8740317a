//! CLI module for the work timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `display`: Output formatting and the timer panel
//! - `prompt`: Confirmation gate for destructive commands
//! - `watch`: The live, self-updating panel

pub mod commands;
pub mod display;
pub mod prompt;
pub mod watch;

pub use commands::{AddArgs, Cli, Commands, ConfirmArgs, ConfirmedProjectArgs, ProjectArgs};
pub use display::Display;
pub use watch::run_watch;
