//! MCUF CLI - TrueType fonts to microcontroller C source

use clap::Parser;
use mcuf::error::Result;
use mcuf_cli::cli::{Cli, Commands};
use mcuf_cli::commands;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Convert(args) => commands::convert::run(args, cli.quiet),
        Commands::Info(args) => commands::info::run(args),
    }
}

/// Initialize logging based on verbosity flags; `RUST_LOG` still applies.
fn init_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
