// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use pose_targets::cli::args::{Cli, Commands};
use pose_targets::cli::commands::{run_build, run_index};
use pose_targets::cli::logging::set_verbose;
use pose_targets::error;

fn main() {
    let cli = Cli::parse();
    set_verbose(cli.verbose);

    let outcome = match &cli.command {
        Commands::Index(args) => run_index(args),
        Commands::Build(args) => run_build(args),
    };

    if let Err(e) = outcome {
        error!("{e}");
        process::exit(1);
    }
}
