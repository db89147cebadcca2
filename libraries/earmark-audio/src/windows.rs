/// Transition envelopes, marker tones and short-sample extension
use crate::error::Result;
use earmark_core::{fragment_frames, Sample, SampleFormat};
use std::f64::consts::PI;

/// Fragments a sample must span for the looping crossfade to work
pub const MIN_FRAGMENTS: usize = 3;

/// Level of the beep tones relative to full scale
const BEEP_LEVEL: f64 = 0.0625;

/// Weights of the odd harmonics that give the beeps their edge
const HARMONICS: [(f64, f64); 5] = [(1.0, 1.0), (3.0, 0.33), (5.0, 0.2), (7.0, 0.14), (9.0, 0.11)];

/// Per-session envelopes and marker tones, one value per frame of a fragment
///
/// Envelopes are gains in [0, 1] for the outgoing signal; the incoming
/// signal uses the same envelope read backwards. Tones are in the working
/// format's code units and are added to every channel.
#[derive(Debug, Clone)]
pub struct TransitionWindows {
    frames: usize,
    crossfade: Vec<f32>,
    gap: Vec<f32>,
    duck: Vec<f32>,
    beep: Vec<f32>,
    double_beep: Vec<f32>,
}

impl TransitionWindows {
    /// Build all windows for `rate` Hz and the working `format`
    pub fn new(rate: u32, format: SampleFormat) -> Self {
        let n = fragment_frames(rate);
        let nf = n as f64;
        let mul = f64::from(format.full_scale()) * BEEP_LEVEL;
        let tone = |f: f64, hz: f64| -> f64 {
            let base = 2.0 * PI * hz / f64::from(rate);
            HARMONICS
                .iter()
                .map(|(h, w)| w * (f * h * base).sin())
                .sum()
        };
        let cos2 = |x: f64| x.cos().powi(2);

        let mut crossfade = Vec::with_capacity(n);
        let mut gap = Vec::with_capacity(n);
        let mut duck = Vec::with_capacity(n);
        let mut beep = Vec::with_capacity(n);
        let mut double_beep = Vec::with_capacity(n);

        for i in 0..n {
            let x = i as f64 + 0.5;

            let fade_out = cos2(PI / 2.0 * x / nf);
            let gap_gain = if i < n / 3 { cos2(1.5 * PI * x / nf) } else { 0.0 };
            let duck_gain = if i < n / 4 {
                cos2(2.0 * PI * x / nf) * 0.875 + 0.125
            } else if i < n * 3 / 4 {
                0.125
            } else {
                cos2(2.0 * PI * (x - (n * 3 / 4) as f64) / nf) * 0.125
            };
            let single = if (n / 4..n * 3 / 4).contains(&i) {
                let f = (i - n / 4) as f64 + 0.5;
                cos2(PI * f / nf) * tone(f, 1000.0) * mul
            } else {
                0.0
            };
            let double = if (n / 4..n / 2).contains(&i) {
                let f = (i - n / 4) as f64 + 0.5;
                cos2(2.0 * PI * f / nf) * tone(f, 1000.0) * mul
            } else if (n / 2..n * 3 / 4).contains(&i) {
                let f = (i - n / 2) as f64 + 0.5;
                cos2(2.0 * PI * f / nf) * tone(f, 1500.0) * mul * 2.0
            } else {
                0.0
            };

            crossfade.push(fade_out as f32);
            gap.push(gap_gain as f32);
            duck.push(duck_gain as f32);
            beep.push(single as f32);
            double_beep.push(double as f32);
        }

        Self {
            frames: n,
            crossfade,
            gap,
            duck,
            beep,
            double_beep,
        }
    }

    /// Frames per fragment
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Complementary crossfade (gains sum to one), used for seamless flips, seeks, pause and loop wrap
    pub fn crossfade(&self) -> &[f32] {
        &self.crossfade
    }

    /// Fade out over the first third, silence, fade in over the last third
    pub fn gap(&self) -> &[f32] {
        &self.gap
    }

    /// Duck to 1/8 level for the middle half, leaving room for a tone
    pub fn duck(&self) -> &[f32] {
        &self.duck
    }

    /// Single 1 kHz tone in the middle half
    pub fn beep(&self) -> &[f32] {
        &self.beep
    }

    /// 1 kHz then 1.5 kHz tone, marking a recorded choice
    pub fn double_beep(&self) -> &[f32] {
        &self.double_beep
    }
}

/// Pad samples shorter than [`MIN_FRAGMENTS`] fragments
///
/// The last quarter of the original content fades toward silence and the
/// rest is filled with zeros. Fragment length never changes. Returns
/// whether any sample was extended.
///
/// # Errors
/// Fails if the padded buffer cannot be allocated.
pub fn extend_to_minimum(samples: &mut [Sample]) -> Result<bool> {
    let mut extended = false;
    for sample in samples.iter_mut() {
        let min_frames = fragment_frames(sample.rate()) * MIN_FRAGMENTS;
        let frames = sample.frames();
        if frames >= min_frames {
            continue;
        }

        let format = sample.format();
        let bps = format.bytes();
        let bpf = sample.bytes_per_frame();
        let fade = (frames / 4).max(1).min(frames);

        tracing::warn!(
            "{} is shorter than {} ms; extending with silence",
            sample.name(),
            MIN_FRAGMENTS * earmark_core::FRAGMENT_MS as usize
        );

        let mut data = sample.take_data();
        for j in 0..fade {
            let gain = (PI / 2.0 * (j as f64 + 0.5) / fade as f64).cos() as f32;
            let frame = frames - fade + j;
            for chunk in data[frame * bpf..(frame + 1) * bpf].chunks_exact_mut(bps) {
                let v = format.read(chunk);
                format.write(chunk, v * gain);
            }
        }
        data.try_reserve_exact(min_frames * bpf - data.len())?;
        data.resize(min_frames * bpf, 0);
        sample.replace_data(format, data)?;
        extended = true;
    }
    Ok(extended)
}
