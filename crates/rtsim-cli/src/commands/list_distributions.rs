//! # rtsim-cli::commands::list_distributions
//!
//! Implements the `list-distributions` subcommand.

use anyhow::Result;
use rtsim_engine::randvar::CATALOG;

pub fn exec() -> Result<()> {
    println!("Available distributions:");
    for name in CATALOG {
        println!("  {name}");
    }
    Ok(())
}
