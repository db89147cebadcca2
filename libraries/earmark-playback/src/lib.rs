//! Earmark Playback - Listening-test engine
//!
//! Platform-agnostic engine for A/B, A/B/X, X/X/Y and casual comparisons.
//!
//! This crate provides:
//! - Fragment filling with a click-free looping crossfade
//! - Flip, choice, seek and pause transitions
//! - Slot randomization, trial history with undo/redo, binomial scoring
//! - Session preparation (device open with 24-bit to 16-bit fallback,
//!   conversion, channel reconciliation, length equalisation)
//! - The three-thread playback coordinator
//!
//! # Architecture
//!
//! `earmark-playback` does not touch hardware:
//! - No dependency on CPAL (desktop audio)
//! - No dependency on the terminal
//!
//! The output device and key input are provided through the
//! [`earmark_core::DeviceSink`] and [`earmark_core::InputSource`] traits.
//!
//! # Example: Driving a session by hand
//!
//! ```rust
//! use earmark_audio::TransitionWindows;
//! use earmark_core::{ChannelLayout, NativeDepth, Sample, SampleFormat};
//! use earmark_playback::{Command, RenderOutcome, Session, SessionOptions, TestMode};
//!
//! let tone = |name: &str, level: i16| {
//!     let data = (0..48_000).flat_map(|_| level.to_le_bytes()).collect();
//!     Sample::from_bytes(name, 48_000, ChannelLayout::mono(), NativeDepth::Integer(16), SampleFormat::Int16, data)
//!         .unwrap()
//! };
//!
//! let mut session = Session::new(
//!     vec![tone("a.wav", 1_000), tone("b.wav", 2_000)],
//!     TransitionWindows::new(48_000, SampleFormat::Int16),
//!     SessionOptions { mode: TestMode::Abx, trials: 1, seed: Some(1), ..Default::default() },
//! )
//! .unwrap();
//!
//! let mut fragment = vec![0u8; session.fragment_bytes()];
//! assert_eq!(session.render(&mut fragment).unwrap(), RenderOutcome::Ready);
//!
//! session.apply(Command::Choose(0));
//! assert_eq!(session.render(&mut fragment).unwrap(), RenderOutcome::Finished);
//! println!("{}", session.report());
//! ```

pub mod coordinator;
pub mod error;
pub mod fragment;
pub mod keymap;
pub mod prepare;
pub mod report;
pub mod session;
pub mod stats;
pub mod transition;
pub mod trial;

pub use coordinator::{run, StopReason};
pub use error::{PlaybackError, Result};
pub use fragment::{fill_fragment, Cursor, FillMode, LoopRegion};
pub use keymap::{command_for, Command, KEYMAP_HELP};
pub use prepare::{prepare, PrepareOptions, PreparedSession};
pub use report::{format_time, SessionStats, TrialReport};
pub use session::{RenderOutcome, RestartMode, Session, SessionOptions, SessionStatus};
pub use stats::{is_significant, p_dual, p_single, SIGNIFICANCE};
pub use transition::{blend_transition, fade, FlipStyle, Transition};
pub use trial::{Assignment, TestMode, TrialHistory, TrialRecord, MAX_CASUAL_SAMPLES};
