// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Console logging for the indexer and the CLI.
//!
//! Plain and verbose messages go to stdout, warnings and errors to stderr. Verbose
//! output, section headers and progress lines are gated by one process-wide flag.

use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(true);

/// Enable or disable verbose output for the whole process.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Whether verbose output is enabled. Defaults to `true`.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print a message unconditionally.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*));
    }
}

/// Print a warning to stderr.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "WARNING ⚠️".yellow().bold(), format!($($arg)*));
    }}
}

/// Print an error to stderr.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "Error:".red().bold(), format!($($arg)*));
    }}
}

/// Print a completion message.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        println!("{} {}", "✅".green(), format!($($arg)*));
    }}
}

/// Print a message only in verbose mode.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::cli::logging::is_verbose() {
            println!("{}", format!($($arg)*));
        }
    }
}

/// Print a bold section header in verbose mode.
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        if $crate::cli::logging::is_verbose() {
            println!();
            println!("{}", format!($($arg)*).cyan().bold());
        }
    }}
}

/// Print a `done/total` progress line in verbose mode.
#[macro_export]
macro_rules! progress {
    ($done:expr, $total:expr, $what:expr) => {{
        use colored::Colorize;
        if $crate::cli::logging::is_verbose() {
            println!("{} {}", format!("{}/{}", $done, $total).dimmed(), $what);
        }
    }};
}
