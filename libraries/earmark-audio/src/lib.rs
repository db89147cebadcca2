//! Earmark Audio
//!
//! Everything that happens to a sample between the file on disk and the
//! playback engine:
//! - Decoding via Symphonia (WAV, FLAC, Ogg, MP3, AAC, ...) and raw `.sw`
//! - Bit-depth conversion with triangular dither
//! - Role-aware downmix and clip detection
//! - Channel-order reconciliation across samples
//! - Transition envelopes, marker tones and short-sample extension
//!
//! # Example
//!
//! ```rust
//! use earmark_audio::{convert_bit_depth, TransitionWindows};
//! use earmark_core::{ChannelLayout, NativeDepth, Sample, SampleFormat};
//! use rand::SeedableRng;
//!
//! let mut sample = Sample::from_f32(
//!     "tone.wav",
//!     48_000,
//!     ChannelLayout::mono(),
//!     NativeDepth::Integer(16),
//!     vec![0.5; 48_000],
//! )
//! .unwrap();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! convert_bit_depth(&mut sample, SampleFormat::Int16, &mut rng).unwrap();
//! assert_eq!(sample.value(0, 0), 16_384.0);
//!
//! let windows = TransitionWindows::new(48_000, SampleFormat::Int16);
//! assert_eq!(windows.frames(), 4_800);
//! ```

pub mod clipping;
pub mod convert;
pub mod dither;
pub mod downmix;
pub mod error;
pub mod headroom;
pub mod loader;
pub mod reconcile;
pub mod windows;

pub use clipping::{detect_clipping, ClipReport};
pub use convert::convert_bit_depth;
pub use dither::TriangularDither;
pub use downmix::{downmix, DownmixTarget};
pub use error::{AudioError, Result};
pub use headroom::headroom_factor;
pub use loader::FileLoader;
pub use reconcile::reconcile_layout;
pub use windows::{extend_to_minimum, TransitionWindows, MIN_FRAGMENTS};
