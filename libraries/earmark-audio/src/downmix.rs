/// Role-aware downmix to mono or stereo
use crate::error::{AudioError, Result};
use crate::headroom::{headroom_factor, peak_range};
use earmark_core::{ChannelLayout, ChannelRole, Sample, SampleFormat};
use serde::{Deserialize, Serialize};

/// Downmix target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownmixTarget {
    /// Single channel
    Mono,
    /// Left/right pair
    Stereo,
}

const CENTER: f32 = std::f32::consts::FRAC_1_SQRT_2;
const SIDE: f32 = 0.866;
const BACK: f32 = 0.5;

/// Left and right gain for a source channel
fn stereo_gains(role: ChannelRole) -> (f32, f32) {
    use ChannelRole::*;
    match role {
        Left => (1.0, 0.0),
        Right => (0.0, 1.0),
        Mono | Center | Unknown => (CENTER, CENTER),
        Lfe => (0.0, 0.0),
        SideLeft => (SIDE, 0.0),
        SideRight => (0.0, SIDE),
        BackLeft => (CENTER, 0.0),
        BackRight => (0.0, CENTER),
        BackCenter => (BACK, BACK),
        CenterLeft => (SIDE, BACK),
        CenterRight => (BACK, SIDE),
    }
}

/// Mono gain for a source channel
fn mono_gain(role: ChannelRole) -> f32 {
    match role {
        ChannelRole::Mono | ChannelRole::Center => 1.0,
        other => {
            let (l, r) = stereo_gains(other);
            (l + r) * CENTER
        }
    }
}

/// Downmix a `Float32` sample in place
///
/// Returns the gain that would bring the mix back inside full scale (1.0 if
/// none is needed). The gain is not applied here: when several samples are
/// compared the caller applies one common factor to all of them.
///
/// A sample already at the target channel count is left alone.
///
/// # Errors
/// Fails if the working format is not `Float32`.
pub fn downmix(sample: &mut Sample, target: DownmixTarget) -> Result<f32> {
    if sample.format() != SampleFormat::Float32 {
        return Err(AudioError::unsupported(
            sample.path(),
            format!("downmix needs float working data, found {:?}", sample.format()),
        ));
    }

    let (layout, gains): (ChannelLayout, Vec<Vec<f32>>) = match target {
        DownmixTarget::Mono => {
            if sample.channels() == 1 {
                return Ok(1.0);
            }
            let gains = sample.layout().roles().iter().map(|r| vec![mono_gain(*r)]).collect();
            (ChannelLayout::mono(), gains)
        }
        DownmixTarget::Stereo => {
            if sample.channels() == 2 {
                return Ok(1.0);
            }
            let gains = sample
                .layout()
                .roles()
                .iter()
                .map(|role| {
                    // a lone mono channel feeds both sides at unity
                    if sample.channels() == 1 {
                        vec![1.0, 1.0]
                    } else {
                        let (l, r) = stereo_gains(*role);
                        vec![l, r]
                    }
                })
                .collect();
            (ChannelLayout::stereo(), gains)
        }
    };

    let out_channels = layout.len();
    let bps = SampleFormat::Float32.bytes();
    let in_bpf = sample.bytes_per_frame();
    let frames = sample.frames();

    let mut mixed = Vec::new();
    mixed.try_reserve_exact(frames * out_channels * bps)?;
    let mut acc = vec![0.0f32; out_channels];
    for frame in sample.data().chunks_exact(in_bpf) {
        acc.fill(0.0);
        for (ch, chunk) in frame.chunks_exact(bps).enumerate() {
            let v = SampleFormat::Float32.read(chunk);
            for (out, g) in acc.iter_mut().zip(&gains[ch]) {
                *out += v * g;
            }
        }
        for v in &acc {
            mixed.extend_from_slice(&v.to_le_bytes());
        }
    }

    let (min, max) = peak_range(&mixed);
    tracing::debug!(
        "{}: downmixed {} -> {} (peak range {min:.3}..{max:.3})",
        sample.name(),
        sample.layout(),
        layout
    );
    sample.replace_contents(layout, SampleFormat::Float32, mixed)?;
    Ok(headroom_factor(min, max))
}
