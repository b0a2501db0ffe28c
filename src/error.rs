//! Player errors

use thiserror::Error;

use crate::source::SourceError;

/// Errors returned by the [`crate::Player`] control surface
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The media source failed (open, seek, decode)
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The operation needs a loaded file
    #[error("no video loaded")]
    NotLoaded,

    /// The scheduler thread is gone
    #[error("player scheduler is not running")]
    Disconnected,

    /// A player thread could not be started
    #[error("failed to spawn player thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;
