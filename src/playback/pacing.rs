//! Pacing
//!
//! Decides, after each decoded frame, whether the next decode cycle runs now
//! or after a delay. Wall-clock time since the anchor is compared with stream
//! time since the anchor; a positive difference is how far decoding is ahead
//! of schedule and becomes the timer delay.

use std::time::{Duration, Instant};

use super::state::PlaybackState;

/// Reference clock: a (wall time, stream time) pair recorded when playback
/// starts, resumes or is re-anchored by a seek
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    anchor_wall: Instant,
    anchor_video_ms: f64,
    frame_interval_ms: f64,
}

impl PlaybackClock {
    pub fn new(frame_rate: f64, now: Instant) -> Self {
        Self {
            anchor_wall: now,
            anchor_video_ms: 0.0,
            frame_interval_ms: 1000.0 / frame_rate,
        }
    }

    /// Anchor the clock at `now` for a stream positioned after `produced` frames
    pub fn anchor(&mut self, now: Instant, produced: u64) {
        self.anchor_wall = now;
        self.anchor_video_ms = self.video_time_ms(produced);
    }

    /// Stream time at which the frame after `produced` is due
    pub fn video_time_ms(&self, produced: u64) -> f64 {
        produced as f64 * self.frame_interval_ms
    }

    /// Stream time elapsed minus wall time elapsed since the anchor.
    /// Positive: decoding is ahead of schedule. Zero or negative: on time or behind.
    pub fn lag_ms(&self, produced: u64, now: Instant) -> f64 {
        let elapsed_wall = now.saturating_duration_since(self.anchor_wall).as_secs_f64() * 1000.0;
        let elapsed_video = self.video_time_ms(produced) - self.anchor_video_ms;
        elapsed_video - elapsed_wall
    }
}

/// When to run the next decode cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pace {
    /// Dispatch right away
    Immediate,
    /// Dispatch once the delay has passed
    Delay(Duration),
    /// Too far behind: re-anchor the clock, then dispatch right away
    Resync,
    /// Not playing, nothing to dispatch
    Stop,
}

/// Pacing decision for a finished cycle
pub fn decide(state: PlaybackState, lag_ms: f64, resync_threshold: Option<Duration>) -> Pace {
    if state != PlaybackState::Playing {
        return Pace::Stop;
    }

    if lag_ms > 0.0 {
        return Pace::Delay(Duration::from_secs_f64(lag_ms / 1000.0));
    }

    match resync_threshold {
        Some(threshold) if -lag_ms > threshold.as_secs_f64() * 1000.0 => Pace::Resync,
        _ => Pace::Immediate,
    }
}
