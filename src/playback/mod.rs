//! Playback module
//!
//! State machine, pacing policy, scheduler thread and the [`Player`] handle.

pub mod pacing;
mod player;
mod scheduler;
mod state;

pub use pacing::{Pace, PlaybackClock};
pub use player::Player;
pub use state::{PlaybackState, Status};
