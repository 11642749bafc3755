//! # rtsim-cli::args
//!
//! Defines the command-line argument structure using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "human")]
    pub log: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation from a scenario file.
    Run(RunOpts),
    /// Validate a scenario file for correctness without running it.
    Validate {
        #[arg(value_name = "SCENARIO_PATH")]
        scenario: PathBuf,
    },
    /// List the named `RandomVar` distributions the catalog can construct.
    ListDistributions,
}

#[derive(Args, Debug)]
pub struct RunOpts {
    /// Path to the scenario file (TOML or YAML).
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// Override the RNG seed from the scenario file.
    #[arg(long)]
    pub seed: Option<i64>,

    /// Override the horizon (in ticks) from the scenario file.
    #[arg(long)]
    pub length: Option<i64>,

    /// Override the replica count (`nRuns`, §4.3) from the scenario file.
    #[arg(long)]
    pub n_runs: Option<i64>,

    /// Enable the named debug-stream level (repeatable).
    #[arg(long = "debug", value_name = "LEVEL")]
    pub debug_levels: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}
