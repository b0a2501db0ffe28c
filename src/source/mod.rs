//! Media source module
//!
//! Capability interface over a container/codec engine. The decode cycle only
//! talks to a [`MediaSource`]; the engine behind it is pluggable.
//!
//! # Usage
//!
//! ```rust,ignore
//! use videodemux::source::{MediaSource, SyntheticSource, SyntheticSpec};
//!
//! let mut source = SyntheticSource::new(SyntheticSpec::default());
//! while let Some(mut packet) = source.next_packet() {
//!     // feed it to the decoder
//! }
//! ```

mod error;
mod metadata;
mod synthetic;

#[cfg(feature = "ffmpeg")]
mod ffmpeg;

use std::path::Path;

pub use error::SourceError;
pub use metadata::{Metadata, PixelFormat};
pub use synthetic::{SyntheticPacket, SyntheticSource, SyntheticSpec};

#[cfg(feature = "ffmpeg")]
pub use self::ffmpeg::{FfmpegPacket, FfmpegSource};

/// One plane of a decoded picture as the engine hands it out
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    /// Raw plane memory, `stride * rows` bytes (the last row may be short)
    pub data: &'a [u8],
    /// Distance in bytes between two rows in `data`
    pub stride: usize,
    /// Meaningful bytes per row, without alignment padding
    pub row_bytes: usize,
    /// Number of rows in this plane
    pub rows: usize,
}

impl Plane<'_> {
    /// Size of this plane once packed
    pub fn packed_len(&self) -> usize {
        self.row_bytes * self.rows
    }
}

/// A decoded picture borrowed from the engine's internal frame
#[derive(Debug, Clone)]
pub struct FrameData<'a> {
    pub planes: Vec<Plane<'a>>,
}

impl FrameData<'_> {
    /// Total size of the packed picture (all planes, no padding)
    pub fn packed_len(&self) -> usize {
        self.planes.iter().map(Plane::packed_len).sum()
    }
}

/// Result of one decode call
#[derive(Debug)]
pub enum Decoded<'a> {
    /// The decoder produced a full frame
    Frame(FrameData<'a>),
    /// The decoder needs more input before it can emit a frame
    NeedsMorePackets,
}

/// A compressed packet that may take several decode calls to consume
pub trait PendingPacket: Send + 'static {
    /// Index of the stream this packet belongs to
    fn stream_index(&self) -> usize;

    /// True once the decoder has consumed the packet and drained every frame it produced
    fn is_exhausted(&self) -> bool;
}

/// Container/codec engine used by the decode cycle
pub trait MediaSource: Send + 'static {
    type Packet: PendingPacket;

    /// Stream metadata captured when the source was opened
    fn metadata(&self) -> &Metadata;

    /// Index of the selected video stream
    fn video_stream_index(&self) -> usize;

    /// Next packet of any stream, `None` at end of stream
    fn next_packet(&mut self) -> Option<Self::Packet>;

    /// Feed `packet` to the decoder, or flush buffered frames when `None`
    fn decode(&mut self, packet: Option<&mut Self::Packet>) -> Result<Decoded<'_>, SourceError>;

    /// Reposition on the keyframe at or before `seconds`
    fn seek(&mut self, seconds: f64) -> Result<(), SourceError>;
}

/// Opens a source for a path. Called on the scheduler thread for every `load`.
pub type Opener<S> = Box<dyn Fn(&Path) -> Result<S, SourceError> + Send + 'static>;
