//! `chamelium` -- control a Chameleon board from the command line.
//!
//! Exit status: 0 on success, 2 for usage or configuration errors (clap's
//! own parse errors included), 1 for everything else.

use std::io;
use std::process::ExitCode;

use clap::Parser;

use chamelium_cli::cli::Cli;
use chamelium_cli::dispatch::{self, Environment};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let env = Environment::from_process();
    let mut stdout = io::stdout();
    match dispatch::run(&cli, &env, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("chamelium: error: {e}");
            if e.is_usage() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
