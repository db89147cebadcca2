/// Core error types for Earmark
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `EarmarkError`
pub type Result<T> = std::result::Result<T, EarmarkError>;

/// Core error type for Earmark
///
/// Every variant maps to a stable process exit code through
/// [`EarmarkError::exit_code`], so wrapper scripts can tell a bad file
/// from a missing sound card.
#[derive(Error, Debug)]
pub enum EarmarkError {
    /// Bad command line or configuration
    #[error("Usage error: {0}")]
    Usage(String),

    /// A sample file could not be read or decoded
    #[error("Could not load {path}: {reason}")]
    Load {
        /// File that failed
        path: PathBuf,
        /// Decoder or I/O message
        reason: String,
    },

    /// Two samples disagree on sample rate
    #[error("Sample rate mismatch: {first} is {first_rate} Hz but {other} is {other_rate} Hz")]
    RateMismatch {
        /// Reference file (the first sample)
        first: PathBuf,
        /// Reference rate
        first_rate: u32,
        /// Offending file
        other: PathBuf,
        /// Offending rate
        other_rate: u32,
    },

    /// Two samples disagree on channel count
    #[error("Channel count mismatch: {first} has {first_channels} channels but {other} has {other_channels}")]
    ChannelMismatch {
        /// Reference file (the first sample)
        first: PathBuf,
        /// Reference channel count
        first_channels: u16,
        /// Offending file
        other: PathBuf,
        /// Offending channel count
        other_channels: u16,
    },

    /// No output device accepted the requested configuration
    #[error("Could not open output device: {0}")]
    DeviceOpen(String),

    /// A buffer could not be allocated
    #[error("Out of memory: {0}")]
    Allocation(String),

    /// Native or working sample format not supported
    #[error("Unsupported sample format in {path}: {detail}")]
    UnsupportedFormat {
        /// File the sample was loaded from
        path: PathBuf,
        /// What was unsupported
        detail: String,
    },

    /// Float data contained NaN or infinity
    #[error("Invalid floating point data in {0}")]
    InvalidFloat(PathBuf),

    /// Inconsistent sample construction (buffer length vs. layout)
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// A worker thread could not be started
    #[error("Could not spawn {0} thread")]
    ThreadSpawn(String),

    /// Channel layouts name different role sets
    #[error("Channel layout mismatch: {target_path} ({target}) cannot be mapped onto {reference_path} ({reference})")]
    ChannelRoleMismatch {
        /// Reference file (the first sample)
        reference_path: PathBuf,
        /// Layout of the reference sample
        reference: String,
        /// Offending file
        target_path: PathBuf,
        /// Layout of the sample being reconciled
        target: String,
    },

    /// Terminal could not be configured for key input
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Internal invariant violated; this is a bug
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EarmarkError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a load error for `path`
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-format error for `path`
    pub fn unsupported(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create an allocation error
    pub fn allocation(what: impl Into<String>) -> Self {
        Self::Allocation(what.into())
    }

    /// Create an internal invariant error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Terminal(_) => 1,
            Self::Load { .. } | Self::Io(_) => 2,
            Self::RateMismatch { .. } | Self::ChannelMismatch { .. } => 3,
            Self::DeviceOpen(_) => 4,
            Self::Allocation(_) => 5,
            Self::UnsupportedFormat { .. } | Self::InvalidFloat(_) | Self::InvalidSample(_) => 6,
            Self::ThreadSpawn(_) => 7,
            Self::ChannelRoleMismatch { .. } => 8,
            Self::Internal(_) => 100,
        }
    }
}

impl From<std::collections::TryReserveError> for EarmarkError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::Allocation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_category() {
        let cases = [
            (EarmarkError::usage("x"), 1),
            (EarmarkError::load("a.wav", "eof"), 2),
            (
                EarmarkError::RateMismatch {
                    first: "a".into(),
                    first_rate: 44_100,
                    other: "b".into(),
                    other_rate: 48_000,
                },
                3,
            ),
            (EarmarkError::DeviceOpen("busy".into()), 4),
            (EarmarkError::allocation("fragment"), 5),
            (EarmarkError::unsupported("a.wav", "12-bit"), 6),
            (EarmarkError::ThreadSpawn("output".into()), 7),
            (
                EarmarkError::ChannelRoleMismatch {
                    reference_path: "a.wav".into(),
                    reference: "L,R".into(),
                    target_path: "b.wav".into(),
                    target: "L,C".into(),
                },
                8,
            ),
            (EarmarkError::internal("cursor"), 100),
        ];

        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{err}");
        }
    }

    #[test]
    fn rate_mismatch_names_both_files() {
        let err = EarmarkError::RateMismatch {
            first: "a.flac".into(),
            first_rate: 44_100,
            other: "b.flac".into(),
            other_rate: 48_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("a.flac"));
        assert!(msg.contains("b.flac"));
    }
}
