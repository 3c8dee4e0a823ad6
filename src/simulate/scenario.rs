//! Scenario files for the simulator.
//!
//! ```toml
//! step = 1.0
//! seek_to_start = true
//! failing = ["broken.mp4"]
//!
//! [[content]]
//! uri = "main.m3u8"
//! max = 120.0
//!
//! [[ad]]
//! uri = "mid.mp4"
//! roll = "midroll"
//! at = 40.0
//! duration = 15.0
//!
//! [[vast]]
//! url = "breaks/late.json"
//! at = 90.0
//!
//! [[seek]]
//! tick = 10
//! position = 100.0
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::playlist::{AdType, PlaybackPolicy};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Seconds of media advanced per tick
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: usize,
    /// Install an on-demand seek-to-start marker
    #[serde(default)]
    pub seek_to_start: bool,
    /// Install a live seek-to-start entry playing this URI
    #[serde(default)]
    pub live_start_uri: Option<String>,
    /// URIs the simulated renderer refuses to play
    #[serde(default)]
    pub failing: Vec<String>,
    #[serde(default)]
    pub content: Vec<ContentClip>,
    #[serde(default, rename = "ad")]
    pub ads: Vec<AdClip>,
    #[serde(default)]
    pub vast: Vec<VastSlot>,
    #[serde(default, rename = "seek")]
    pub seeks: Vec<ScriptedSeek>,
}

fn default_step() -> f64 {
    1.0
}

fn default_max_ticks() -> usize {
    10_000
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentClip {
    pub uri: String,
    #[serde(default)]
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdClip {
    pub uri: String,
    pub roll: AdType,
    /// Linear time, midrolls only
    #[serde(default)]
    pub at: Option<f64>,
    pub duration: f64,
    #[serde(default)]
    pub delete_after_play: bool,
    #[serde(default)]
    pub policy: PlaybackPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VastSlot {
    pub url: String,
    #[serde(default = "default_roll")]
    pub roll: AdType,
    #[serde(default)]
    pub at: Option<f64>,
    #[serde(default)]
    pub one_shot: bool,
}

fn default_roll() -> AdType {
    AdType::Midroll
}

/// A seek issued before the given tick is played.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedSeek {
    pub tick: usize,
    /// Linear target
    #[serde(default)]
    pub position: Option<f64>,
    /// Seekbar target
    #[serde(default)]
    pub seekbar: Option<f64>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid scenario: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.step.is_nan() || self.step <= 0.0 {
            bail!("step must be positive, got {}", self.step);
        }
        if self.content.is_empty() {
            bail!("scenario needs at least one [[content]] clip");
        }
        for seek in &self.seeks {
            if seek.position.is_some() == seek.seekbar.is_some() {
                bail!(
                    "seek at tick {} needs exactly one of 'position' or 'seekbar'",
                    seek.tick
                );
            }
        }
        Ok(())
    }
}
