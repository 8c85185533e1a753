//! Dealerscope CLI entry point

use clap::Parser;
use dealerscope::{init_logging, level_for};
use dealerscope_cli::{apply_color, run, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    apply_color(cli.color);
    let _ = init_logging(cli.log_format, level_for(cli.verbose, cli.quiet));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
