//! # rtsim-cli
//!
//! Command-line entry point: parses arguments and dispatches to the
//! matching subcommand handler.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::prelude::*;

use crate::args::{Cli, Command, LogFormat};
use crate::logging::SimulationFormatter;

mod args;
mod commands;
mod logging;
mod scenario;
mod wiring;

fn main() -> Result<()> {
    let args = Cli::parse();

    match args.log {
        LogFormat::Human => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .event_format(SimulationFormatter::new())
                        .with_ansi(true),
                )
                .with(tracing_subscriber::EnvFilter::from_default_env())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().json())
                .with(tracing_subscriber::EnvFilter::from_default_env())
                .init();
        }
    }

    match args.command {
        Command::Run(opts) => commands::run::exec(opts),
        Command::Validate { scenario } => commands::validate::exec(scenario),
        Command::ListDistributions => commands::list_distributions::exec(),
    }
}
