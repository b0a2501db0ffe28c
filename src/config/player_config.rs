//! PlayerConfig data structure
//!
//! Tuning knobs for the scheduler, loadable from a JSON file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Frame rate used when the container declares none
    #[serde(default = "default_fallback_frame_rate")]
    pub fallback_frame_rate: f64,

    /// Re-anchor the clock once playback lags by more than this (milliseconds).
    /// Unset keeps catching up back-to-back however far behind decoding is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resync_threshold_ms: Option<u64>,

    /// Consecutive failed decode cycles tolerated before playback pauses
    #[serde(default = "default_max_consecutive_decode_errors")]
    pub max_consecutive_decode_errors: u32,
}

fn default_fallback_frame_rate() -> f64 {
    30.0
}

fn default_max_consecutive_decode_errors() -> u32 {
    3
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fallback_frame_rate: default_fallback_frame_rate(),
            resync_threshold_ms: None,
            max_consecutive_decode_errors: default_max_consecutive_decode_errors(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: PlayerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.fallback_frame_rate.is_finite() || self.fallback_frame_rate <= 0.0 {
            anyhow::bail!("fallback_frame_rate must be positive, got {}", self.fallback_frame_rate);
        }
        Ok(())
    }

    /// Resync threshold as a duration
    pub fn resync_threshold(&self) -> Option<Duration> {
        self.resync_threshold_ms.map(Duration::from_millis)
    }
}
