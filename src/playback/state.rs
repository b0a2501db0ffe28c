//! Playback state machine
//!
//! `Unloaded -> Loaded -> Playing <-> Paused -> Finished`, plus the status
//! snapshot the scheduler publishes after every transition.

use serde::{Deserialize, Serialize};

/// Playback state of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No file open
    #[default]
    Unloaded,
    /// File open, playback not started
    Loaded,
    /// Decode/pace loop running
    Playing,
    /// Loop halted, position kept
    Paused,
    /// End of stream reached or playback stopped
    Finished,
}

impl PlaybackState {
    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaybackState::Unloaded => "Unloaded",
            PlaybackState::Loaded => "Loaded",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Finished => "Finished",
        }
    }

    /// States `start()` can leave from
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            PlaybackState::Loaded | PlaybackState::Paused | PlaybackState::Finished
        )
    }

    /// State after a successful seek
    pub fn after_seek(&self) -> Self {
        match self {
            PlaybackState::Finished => PlaybackState::Paused,
            other => *other,
        }
    }
}

/// Snapshot of the scheduler, readable without a round-trip
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Status {
    pub state: PlaybackState,
    /// Frames produced since the start of the stream
    pub produced_frames: u64,
    /// Stream position in seconds
    pub position: f64,
}
