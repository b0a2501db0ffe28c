//! Stream metadata

use serde::{Deserialize, Serialize};

/// Pixel layout of decoded frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Yuv420p,
    Rgb24,
    Rgb32,
    #[default]
    Unknown,
}

impl PixelFormat {
    /// Name surfaced to subscribers
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Rgb32 => "rgb32",
            PixelFormat::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Video stream metadata, emitted once per successful load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
    /// Total frame count declared by the container, 0 when unknown
    pub num_frames: i64,
    /// Average frame rate in frames per second
    pub frame_rate: f64,
    /// Container duration in seconds
    pub duration: f64,
    pub pixel_format: PixelFormat,
}

impl Metadata {
    /// Frame rate to pace with, falling back when the container declares none
    pub fn effective_frame_rate(&self, fallback: f64) -> f64 {
        if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            self.frame_rate
        } else {
            fallback
        }
    }
}
