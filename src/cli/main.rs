use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod args;
mod commands;
mod format;
#[path = "../shared/mod.rs"]
mod shared;

use crate::shared::{logging, AzaError};

async fn run(cli: args::Cli) -> Result<()> {
    commands::dispatch(cli).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = args::Cli::parse();
    let debug = cli.global.debug;
    logging::init_cli_logging(debug);

    let Err(err) = run(cli).await else {
        return ExitCode::SUCCESS;
    };

    if err.downcast_ref::<AzaError>().is_some_and(AzaError::is_usage) {
        eprintln!("{err}");
        eprintln!("Use --help for usage.");
        return ExitCode::from(2);
    }

    eprintln!("[ERROR] {err}");
    if debug {
        eprintln!("{err:?}");
    }
    ExitCode::FAILURE
}
