/// Clip detection on decoded samples
use crate::error::{AudioError, Result};
use crate::headroom::{headroom_factor, peak_range};
use earmark_core::{NativeDepth, Sample, SampleFormat};
use serde::Serialize;

/// Run length (in frames, per channel) at which over-range values count as clipping
const MIN_CLIP_RUN: usize = 2;

/// Result of [`detect_clipping`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipReport {
    /// At least one channel held an over-range value for two or more consecutive frames
    pub clipped: bool,
    /// The clipping lives only in decoded float data and can be undone by attenuation
    pub fixable: bool,
    /// Gain that removes fixable clipping (1.0 otherwise)
    pub attenuation: f32,
}

impl ClipReport {
    /// Report for a clean sample
    pub const CLEAN: Self = Self {
        clipped: false,
        fixable: false,
        attenuation: 1.0,
    };
}

/// Scan a `Float32` sample for clipping
///
/// Integer sources clip at their own positive limit (`32767/32768` for
/// 16-bit) or at -1.0; that clipping is baked into the file and cannot be
/// fixed. Float and lossy sources clip above ±1.0, which attenuation can
/// still repair.
///
/// # Errors
/// Fails if the working format is not `Float32`.
pub fn detect_clipping(sample: &Sample) -> Result<ClipReport> {
    if sample.format() != SampleFormat::Float32 {
        return Err(AudioError::unsupported(
            sample.path(),
            format!("clip detection needs float working data, found {:?}", sample.format()),
        ));
    }

    let native = sample.native();
    let over: Box<dyn Fn(f32) -> bool> = match native {
        NativeDepth::Integer(_) => {
            let positive = native.positive_full_scale();
            Box::new(move |v| v >= positive || v <= -1.0)
        }
        NativeDepth::Float => Box::new(|v: f32| v.abs() > 1.0),
    };

    let channels = sample.layout().len();
    let bps = SampleFormat::Float32.bytes();
    let mut runs = vec![0usize; channels];
    let mut clipped = false;

    'frames: for frame in sample.data().chunks_exact(sample.bytes_per_frame()) {
        for (run, chunk) in runs.iter_mut().zip(frame.chunks_exact(bps)) {
            if over(SampleFormat::Float32.read(chunk)) {
                *run += 1;
                if *run >= MIN_CLIP_RUN {
                    clipped = true;
                    break 'frames;
                }
            } else {
                *run = 0;
            }
        }
    }

    if !clipped {
        return Ok(ClipReport::CLEAN);
    }

    let fixable = native == NativeDepth::Float;
    let attenuation = if fixable {
        let (min, max) = peak_range(sample.data());
        headroom_factor(min, max)
    } else {
        1.0
    };
    Ok(ClipReport {
        clipped,
        fixable,
        attenuation,
    })
}
