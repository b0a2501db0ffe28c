//! IPC protocol definitions
//!
//! Line-delimited JSON messages exchanged with a controlling process.

use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::playback::Status;
use crate::source::Metadata;

/// IPC message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum IpcMessage {
    // === Client -> Player ===

    /// Open a file
    Load { path: String },

    /// Begin or resume playback (also echoed back as the `start` event)
    Start,

    /// Pause playback
    Pause,

    /// Stop and rewind
    Stop,

    /// Reposition, in seconds
    Seek { timestamp: f64 },

    /// Ask for a `state_update`
    Status,

    /// Shut the player down
    Shutdown,

    // === Player -> Client ===

    /// Player ready for commands
    Ready,

    /// Stream metadata after a successful load
    Metadata(Metadata),

    /// A frame was decoded
    Frame { index: u64, length: usize },

    /// End of stream or stop
    End,

    /// Status snapshot
    StateUpdate(Status),

    /// Error occurred
    Error { code: i32, message: String },
}

impl IpcMessage {
    /// Create a ready message
    pub fn ready() -> Self {
        IpcMessage::Ready
    }

    /// Create an error message
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        IpcMessage::Error {
            code,
            message: message.into(),
        }
    }

    /// Outgoing message for a player event
    pub fn from_event(event: &Event<'_>) -> Self {
        match event {
            Event::Error(message) => IpcMessage::error(error_codes::PLAYBACK_ERROR, *message),
            Event::Metadata(metadata) => IpcMessage::Metadata((*metadata).clone()),
            Event::Start => IpcMessage::Start,
            Event::Frame(frame) => IpcMessage::Frame {
                index: frame.index,
                length: frame.len(),
            },
            Event::End => IpcMessage::End,
        }
    }

    /// Serialize to JSON string (line-delimited)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = 1;
    pub const UNEXPECTED_MESSAGE: i32 = 2;
    pub const COMMAND_FAILED: i32 = 3;
    pub const PLAYBACK_ERROR: i32 = 4;
}
