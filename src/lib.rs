//! Paced video frame demuxer
//!
//! Decodes a container file one frame at a time on a worker thread and
//! delivers the frames to subscribers at the stream's native frame rate.
//!
//! ```rust,ignore
//! use videodemux::{EventKind, Player, PlayerConfig, SyntheticSpec};
//!
//! let player = Player::spawn(PlayerConfig::default(), SyntheticSpec::default().opener())?;
//! player.on(EventKind::Frame, |event| println!("{event:?}"))?;
//! player.load("clip.mp4")?;
//! player.start()?;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod ipc;
pub mod playback;
pub mod source;
pub mod video;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use events::{Event, EventKind};
pub use playback::{PlaybackState, Player, Status};
pub use source::{MediaSource, Metadata, PixelFormat, SourceError, SyntheticSpec};
