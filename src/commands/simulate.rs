//! Simulate subcommand handler

use std::path::Path;

use anyhow::{Context, Result};

use adseq::simulate::{self, Scenario};
use adseq::Config;

/// Run a scenario file and print its transcript.
///
/// Ad-list paths in the scenario are relative to the scenario's directory
/// unless `resolver.base_dir` is configured.
#[cfg(not(tarpaulin_include))]
pub fn handle(file: &Path, json: bool) -> Result<()> {
    let config = Config::load()?;
    let scenario = Scenario::load(file)?;
    let base_dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let transcript = simulate::run(&scenario, &config, base_dir)
        .with_context(|| format!("Simulation of {:?} failed", file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    } else {
        println!("{transcript}");
    }
    Ok(())
}
