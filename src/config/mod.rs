// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the playback scheduler.
//!
//! Sequencer settings live in a TOML file; every field has a default so
//! an empty file (or no file at all) yields a working setup.

pub mod watcher;

pub use watcher::{SongEvent, SongWatcher};

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SequencerError;

/// Scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SequencerConfig {
    /// Lookahead window in seconds
    pub schedule_ahead_time: f64,
    /// Step slots per measure
    pub step_precision: usize,
    /// Worker ticker period in milliseconds
    pub tick_interval_ms: u64,
    /// Mixer channel the metronome click is routed to
    pub metronome_channel: usize,
    /// Loop the song instead of stopping at the end of a recording
    pub looping: bool,
    /// One measure of metronome before a recording starts
    pub count_in: bool,
    /// Metronome enabled at startup
    pub metronome: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            schedule_ahead_time: 0.2,
            step_precision: 64,
            tick_interval_ms: 25,
            metronome_channel: 2,
            looping: false,
            count_in: false,
            metronome: false,
        }
    }
}

impl SequencerConfig {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml(&contents)
    }

    /// Parse settings from a TOML string
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Check that the values can drive the scheduler
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.step_precision == 0 {
            return Err(SequencerError::InvalidConfig(
                "step_precision must be at least 1".to_string(),
            ));
        }
        if !(self.schedule_ahead_time.is_finite() && self.schedule_ahead_time > 0.0) {
            return Err(SequencerError::InvalidConfig(format!(
                "schedule_ahead_time must be positive, got {}",
                self.schedule_ahead_time
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(SequencerError::InvalidConfig(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker ticker period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
