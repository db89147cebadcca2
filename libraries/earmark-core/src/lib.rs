//! Earmark Core
//!
//! Platform-agnostic data model, collaborator traits and error handling for
//! Earmark, a terminal tool for blind A/B, A/B/X and X/X/Y listening tests.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Sample model**: [`Sample`], its working [`SampleFormat`] and the
//!   [`NativeDepth`] of the file it was loaded from
//! - **Channel layouts**: [`ChannelRole`] and [`ChannelLayout`], the ordered
//!   role list that defines interleave order
//! - **Collaborator traits**: [`SampleLoader`], [`DeviceOpener`],
//!   [`DeviceSink`] and [`InputSource`], implemented by the audio and desktop
//!   crates (or by test doubles)
//! - **Error handling**: unified [`EarmarkError`] with process exit codes
//!
//! # Example
//!
//! ```rust
//! use earmark_core::{ChannelLayout, NativeDepth, Sample, SampleFormat};
//!
//! let layout: ChannelLayout = "L,R".parse().unwrap();
//! let sample = Sample::from_f32("tone.wav", 48_000, layout, NativeDepth::Integer(16), vec![0.0; 960])
//!     .unwrap();
//!
//! assert_eq!(sample.format(), SampleFormat::Float32);
//! assert_eq!(sample.frames(), 480);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EarmarkError, Result};
pub use traits::{DeviceOpener, DeviceSink, DeviceSpec, InputSource, InputWaker, SampleLoader};
pub use types::{ChannelLayout, ChannelRole, Key, NativeDepth, Sample, SampleFormat};

/// Duration of one fragment in milliseconds
pub const FRAGMENT_MS: u32 = 100;

/// Number of frames in one fragment at `rate` Hz
///
/// Never returns zero, even for degenerate rates below 10 Hz.
pub fn fragment_frames(rate: u32) -> usize {
    ((rate / (1000 / FRAGMENT_MS)) as usize).max(1)
}
