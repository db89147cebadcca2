/// Audio-specific errors
use earmark_core::EarmarkError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Container or codec error while decoding
    #[error("Decode error in {path}: {reason}")]
    Decode {
        /// File being decoded
        path: PathBuf,
        /// Symphonia message
        reason: String,
    },

    /// Native depth or working format not handled
    #[error("Unsupported format in {path}: {detail}")]
    UnsupportedFormat {
        /// File the sample came from
        path: PathBuf,
        /// What was unsupported
        detail: String,
    },

    /// NaN or infinity in float data
    #[error("Invalid floating point value in {0}")]
    InvalidFloat(PathBuf),

    /// Layouts name different role sets
    #[error("Cannot map channel layout {target} of {target_path} onto {reference} of {reference_path}")]
    ChannelRoleMismatch {
        /// Reference file
        reference_path: PathBuf,
        /// Reference layout
        reference: String,
        /// File being reconciled
        target_path: PathBuf,
        /// Layout being reconciled
        target: String,
    },

    /// Buffer allocation failed
    #[error("Out of memory: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error from the core sample model
    #[error(transparent)]
    Core(#[from] EarmarkError),
}

impl AudioError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

impl From<AudioError> for EarmarkError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::FileNotFound(path) => EarmarkError::load(path, "file not found"),
            AudioError::Decode { path, reason } => EarmarkError::load(path, reason),
            AudioError::UnsupportedFormat { path, detail } => EarmarkError::unsupported(path, detail),
            AudioError::InvalidFloat(path) => EarmarkError::InvalidFloat(path),
            AudioError::ChannelRoleMismatch {
                reference_path,
                reference,
                target_path,
                target,
            } => EarmarkError::ChannelRoleMismatch {
                reference_path,
                reference,
                target_path,
                target,
            },
            AudioError::Allocation(e) => EarmarkError::allocation(e.to_string()),
            AudioError::Io(e) => EarmarkError::Io(e),
            AudioError::Core(e) => e,
        }
    }
}
