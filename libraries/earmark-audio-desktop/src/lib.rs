//! Desktop collaborators for Earmark
//!
//! This crate provides the hardware-facing halves of the playback engine:
//!
//! - [`CpalOpener`] / [`CpalSink`]: an output sink on top of CPAL, with the
//!   stream owned by a dedicated thread and device selection by index or name
//! - [`TerminalInput`]: a raw-mode terminal key source that blocks in
//!   `poll(2)` and can be woken from another thread (Unix only)
//! - [`KeyDecoder`]: escape-sequence decoding for terminal input
//!
//! # Example
//!
//! ```no_run
//! use earmark_audio_desktop::{CpalOpener, DeviceSelector};
//! use earmark_core::{ChannelLayout, DeviceOpener, DeviceSpec, SampleFormat};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opener = CpalOpener::new(DeviceSelector::parse(Some("USB")));
//! let mut sink = opener.open(&DeviceSpec {
//!     rate: 48_000,
//!     format: SampleFormat::Int16,
//!     layout: ChannelLayout::stereo(),
//! })?;
//!
//! // 100 ms of silence
//! let written = sink.play(&vec![0u8; 4_800 * 2 * 2]);
//! assert_eq!(written, 4_800);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod keys;
mod output;
#[cfg(unix)]
mod terminal;

pub use error::{DesktopError, Result};
pub use keys::KeyDecoder;
pub use output::{CpalOpener, CpalSink, DeviceSelector};
#[cfg(unix)]
pub use terminal::TerminalInput;
