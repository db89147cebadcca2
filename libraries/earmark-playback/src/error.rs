//! Error types for the listening-test engine

use earmark_audio::AudioError;
use earmark_core::EarmarkError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The play cursor left the region the fragment filler can serve
    #[error("Play cursor at byte {position} is past the last full fragment (byte {limit})")]
    CursorOverrun {
        /// Cursor byte offset
        position: usize,
        /// Last offset a fragment can start at
        limit: usize,
    },

    /// No samples were given
    #[error("No samples to compare")]
    NoSamples,

    /// Session options do not fit the samples
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Worker thread could not be started
    #[error("Could not spawn {0} thread")]
    ThreadSpawn(String),

    /// Signal preparation error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Error from a collaborator (loader, device, input)
    #[error(transparent)]
    Core(#[from] EarmarkError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

impl From<PlaybackError> for EarmarkError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::CursorOverrun { .. } => EarmarkError::internal(err.to_string()),
            PlaybackError::NoSamples | PlaybackError::InvalidSession(_) => {
                EarmarkError::usage(err.to_string())
            }
            PlaybackError::ThreadSpawn(what) => EarmarkError::ThreadSpawn(what),
            PlaybackError::Audio(e) => e.into(),
            PlaybackError::Core(e) => e,
        }
    }
}

impl From<std::collections::TryReserveError> for PlaybackError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::Core(err.into())
    }
}
