//! # rtsim-cli::commands::validate
//!
//! Implements the `validate` subcommand.

use std::{fs, path::PathBuf};

use anyhow::Result;

use crate::scenario::Scenario;

pub fn exec(path: PathBuf) -> Result<()> {
    println!("validating scenario: {:?}", path);
    let content = fs::read_to_string(&path)?;
    let scenario: Scenario = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => return Err(anyhow::anyhow!("unsupported scenario file extension")),
    };

    scenario.validate().map_err(|e| anyhow::anyhow!(e))?;

    println!("scenario '{}' is valid.", scenario.name);
    Ok(())
}
