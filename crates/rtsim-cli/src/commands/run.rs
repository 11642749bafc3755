//! # rtsim-cli::commands::run
//!
//! Implements the `run` subcommand.

use std::fs;

use anyhow::Result;
use rtsim_engine::prelude::Tick;

use crate::args::RunOpts;
use crate::scenario::Scenario;
use crate::wiring;

fn load_scenario(path: &std::path::Path) -> Result<Scenario> {
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("toml") => Ok(toml::from_str(&content)?),
        _ => Err(anyhow::anyhow!(
            "unsupported scenario file extension: {:?}",
            path
        )),
    }
}

pub fn exec(opts: RunOpts) -> Result<()> {
    let scenario = load_scenario(&opts.scenario)?;
    scenario.validate().map_err(|e| anyhow::anyhow!(e))?;

    let seed = opts.seed.unwrap_or(scenario.seed);
    let length = opts.length.map(Tick::new).unwrap_or(scenario.length);
    let n_runs = opts.n_runs.unwrap_or(scenario.n_runs);

    println!(
        "running scenario '{}' (seed={seed}, length={length}, n_runs={n_runs})",
        scenario.name
    );

    let mut wiring = wiring::build(&scenario, seed)?;
    for level in &opts.debug_levels {
        wiring.sim.debug_mut().enable(level.clone());
    }
    wiring.run(length, n_runs)?;

    println!("simulation ended at t = {}", wiring.sim.time());
    Ok(())
}
