//! Configuration file handling.
//!
//! The config lives at `~/.config/adseq/config.toml` (platform config dir,
//! overridable with `ADSEQ_CONFIG`) and every field has a default, so a
//! missing file or a partial file both load.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::playlist::PlaybackPolicy;

/// Environment variable pointing at an alternative config file.
pub const CONFIG_ENV: &str = "ADSEQ_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sequencer: SequencerConfig,
    pub resolver: ResolverConfig,
}

/// Tunables for the scheduler and sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Slack when comparing positions, absorbs float roundoff (seconds)
    pub time_tolerance: f64,
    /// Shortest clip the scheduler accepts (seconds)
    pub min_clip_duration: f64,
    /// Fastest playback rate at which the next segment is prefetched
    pub max_prefetch_rate: f64,
    /// Policy applied to appended content clips
    pub content_policy: PlaybackPolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            time_tolerance: 0.001,
            min_clip_duration: 1.0,
            max_prefetch_rate: 2.0,
            content_policy: PlaybackPolicy::default(),
        }
    }
}

/// Ad resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long to wait for outstanding resolutions before playback starts
    pub timeout_secs: u64,
    /// Base directory for relative ad-list paths
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            base_dir: None,
        }
    }
}

impl Config {
    /// Path of the user config file.
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join("adseq").join("config.toml"))
    }

    /// Load the user config, falling back to defaults when the file is missing.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config to the user config path, creating the directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config: {:?}", path))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let seq = &self.sequencer;
        if seq.time_tolerance.is_nan() || seq.time_tolerance <= 0.0 || seq.time_tolerance >= 1.0 {
            bail!(
                "sequencer.time_tolerance must be in (0, 1), got {}",
                seq.time_tolerance
            );
        }
        if seq.min_clip_duration.is_nan() || seq.min_clip_duration < 0.0 {
            bail!(
                "sequencer.min_clip_duration cannot be negative, got {}",
                seq.min_clip_duration
            );
        }
        if seq.max_prefetch_rate.is_nan() || seq.max_prefetch_rate <= 0.0 {
            bail!(
                "sequencer.max_prefetch_rate must be positive, got {}",
                seq.max_prefetch_rate
            );
        }
        if self.resolver.timeout_secs == 0 {
            bail!("resolver.timeout_secs cannot be 0");
        }
        Ok(())
    }
}
