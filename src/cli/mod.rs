// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! Argument parsing, console logging and the `index` and `build` subcommands.

/// CLI arguments.
pub mod args;

/// Subcommand implementations.
pub mod commands;

/// Console logging macros and the verbosity switch.
pub mod logging;
