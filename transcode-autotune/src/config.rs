//! Benchmark configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::preset::Preset;
use crate::types::{FrameRate, Resolution, STANDARD_SIZES};

/// Tunables for a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Length of each trial in seconds of encoded frames.
    pub trial_duration_secs: f64,
    /// Seconds into a trial before CPU sampling begins.
    pub warmup_secs: f64,
    /// CPU share kept back for the rest of the application.
    pub reserved_cpu: f64,
    /// System-wide CPU ceiling above which a trial is always discarded.
    pub max_system_cpu: f64,
    /// Keyframe interval given to trial encoders, in seconds.
    pub key_interval_secs: u32,
    /// Presets in testing order, highest quality first.
    pub presets: Vec<Preset>,
    /// Output sizes in testing order, smallest first.
    pub sizes: Vec<Resolution>,
    /// Frame rates in testing order.
    pub frame_rates: Vec<FrameRate>,
    /// Lowest preset considered "good enough" when recommending.
    pub recommend_min_preset: Preset,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            trial_duration_secs: 6.1,
            warmup_secs: 1.0,
            reserved_cpu: 0.05,
            max_system_cpu: 0.9,
            key_interval_secs: 2,
            presets: vec![
                Preset::Faster,
                Preset::Veryfast,
                Preset::Superfast,
                Preset::Ultrafast,
            ],
            sizes: STANDARD_SIZES.to_vec(),
            frame_rates: vec![FrameRate::FPS_30, FrameRate::FPS_60],
            recommend_min_preset: Preset::Veryfast,
        }
    }
}

impl BenchmarkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trial length.
    pub fn trial_duration_secs(mut self, secs: f64) -> Self {
        self.trial_duration_secs = secs;
        self
    }

    /// Set the warm-up before sampling.
    pub fn warmup_secs(mut self, secs: f64) -> Self {
        self.warmup_secs = secs;
        self
    }

    /// Set the reserved CPU share.
    pub fn reserved_cpu(mut self, fraction: f64) -> Self {
        self.reserved_cpu = fraction;
        self
    }

    /// Set the preset testing order.
    pub fn presets(mut self, presets: Vec<Preset>) -> Self {
        self.presets = presets;
        self
    }

    /// Set the size testing order.
    pub fn sizes(mut self, sizes: Vec<Resolution>) -> Self {
        self.sizes = sizes;
        self
    }

    /// Set the frame rates to test.
    pub fn frame_rates(mut self, rates: Vec<FrameRate>) -> Self {
        self.frame_rates = rates;
        self
    }

    /// Total number of grid points, used for progress reporting.
    pub fn total_tests(&self) -> u32 {
        (self.presets.len() * self.sizes.len() * self.frame_rates.len()) as u32
    }

    /// Check that the configuration describes a searchable grid.
    pub fn validate(&self) -> Result<()> {
        if self.presets.is_empty() {
            return Err(Error::InvalidConfig("preset table is empty".into()));
        }
        if self.sizes.is_empty() {
            return Err(Error::InvalidConfig("size table is empty".into()));
        }
        if self.frame_rates.is_empty() {
            return Err(Error::InvalidConfig("frame rate table is empty".into()));
        }
        if let Some(rate) = self.frame_rates.iter().find(|r| r.as_f64() <= 0.0) {
            return Err(Error::InvalidConfig(format!("frame rate {rate} is not positive")));
        }
        if !(self.trial_duration_secs > 0.0) {
            return Err(Error::InvalidConfig("trial duration must be positive".into()));
        }
        if !(0.0..self.trial_duration_secs).contains(&self.warmup_secs) {
            return Err(Error::InvalidConfig(format!(
                "warm-up of {}s must be shorter than the {}s trial",
                self.warmup_secs, self.trial_duration_secs
            )));
        }
        if !(0.0..1.0).contains(&self.reserved_cpu) {
            return Err(Error::InvalidConfig("reserved CPU must be in [0, 1)".into()));
        }
        if !(self.max_system_cpu > 0.0 && self.max_system_cpu <= 1.0) {
            return Err(Error::InvalidConfig("system CPU ceiling must be in (0, 1]".into()));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
