//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{AdjustArgs, Args, Command, ConfigAction};
pub use commands::{
    handle_config_action, list_palettes, record, run_live, snapshot, CommandResult, RunContext,
};
pub use enums::{ColorArg, PaletteArg, ShareArg, SourceKind};
