//! Media source errors

use thiserror::Error;

/// Failures reported by a media source or while handling its frames
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// File unreadable or stream information missing
    #[error("{0}")]
    Open(String),

    /// No video stream in the container
    #[error("could not find video stream in input file")]
    Stream,

    /// No decoder for the stream, or decoder initialization failed
    #[error("{0}")]
    Codec(String),

    /// Mid-stream decode failure
    #[error("could not decode video frame: {0}")]
    Decode(String),

    /// Seek rejected
    #[error("could not seek video to specified frame: {0}")]
    Seek(String),

    /// Frame buffer could not be allocated
    #[error("could not allocate raw video buffer ({0} bytes)")]
    Allocation(usize),
}

impl SourceError {
    /// Error for a file that cannot be opened
    pub fn open_failed(path: &std::path::Path) -> Self {
        SourceError::Open(format!("could not open source file: {}", path.display()))
    }

    /// Error for a file whose stream information cannot be read
    pub fn no_stream_info() -> Self {
        SourceError::Open("could not find stream information".to_string())
    }

    /// Error for a stream without a decoder
    pub fn codec_not_found() -> Self {
        SourceError::Codec("failed to find codec".to_string())
    }

    /// Error for a decoder that failed to initialize
    pub fn codec_open_failed() -> Self {
        SourceError::Codec("failed to open codec".to_string())
    }
}
