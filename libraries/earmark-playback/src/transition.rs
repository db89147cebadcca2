//! Transition blending between two fragments
//!
//! Flips, seeks and recorded choices are heard as a one-fragment blend of
//! the outgoing fragment into the incoming one, optionally ducked or gapped
//! with a marker tone on top.

use earmark_audio::TransitionWindows;
use earmark_core::SampleFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a flip between samples sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipStyle {
    /// Short silence between the two samples
    Mark,
    /// Duck both samples and play a tone
    Beep,
    /// Plain crossfade
    #[default]
    Seamless,
}

impl FlipStyle {
    /// Next style in the cycle Mark -> Beep -> Seamless -> Mark
    pub fn next(self) -> Self {
        match self {
            Self::Mark => Self::Beep,
            Self::Beep => Self::Seamless,
            Self::Seamless => Self::Mark,
        }
    }
}

impl fmt::Display for FlipStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mark => "mark",
            Self::Beep => "beep",
            Self::Seamless => "seamless",
        })
    }
}

/// What caused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Switched to another slot
    Flip(FlipStyle),
    /// A choice was recorded
    Select,
    /// Jumped within the sample
    Seek,
}

impl Transition {
    fn shape<'a>(self, windows: &'a TransitionWindows) -> (&'a [f32], Option<&'a [f32]>) {
        match self {
            Self::Select => (windows.duck(), Some(windows.double_beep())),
            Self::Flip(FlipStyle::Mark) => (windows.gap(), None),
            Self::Flip(FlipStyle::Beep) => (windows.duck(), Some(windows.beep())),
            Self::Flip(FlipStyle::Seamless) | Self::Seek => (windows.crossfade(), None),
        }
    }
}

/// Blend `incoming` into `outgoing` in place
///
/// Frame `i` becomes `A[i] * w[i] + B[i] * w[n-1-i] + tone[i]` on every
/// channel, saturating at the format limits.
pub fn blend_transition(
    outgoing: &mut [u8],
    incoming: &[u8],
    format: SampleFormat,
    channels: usize,
    windows: &TransitionWindows,
    transition: Transition,
) {
    let (envelope, tone) = transition.shape(windows);
    let n = envelope.len();
    let bps = format.bytes();
    let bpf = bps * channels;

    for (i, (a, b)) in outgoing
        .chunks_exact_mut(bpf)
        .zip(incoming.chunks_exact(bpf))
        .enumerate()
        .take(n)
    {
        let wa = envelope[i];
        let wb = envelope[n - 1 - i];
        let extra = tone.map_or(0.0, |t| t[i]);
        for (x, y) in a.chunks_exact_mut(bps).zip(b.chunks_exact(bps)) {
            let v = format.read(x) * wa + format.read(y) * wb + extra;
            format.write(x, v);
        }
    }
}

/// Fade a fragment out (`fade_in == false`) or in, using the crossfade envelope
pub fn fade(fragment: &mut [u8], format: SampleFormat, channels: usize, windows: &TransitionWindows, fade_in: bool) {
    let envelope = windows.crossfade();
    let n = envelope.len();
    let bps = format.bytes();
    for (i, frame) in fragment.chunks_exact_mut(bps * channels).enumerate().take(n) {
        let w = if fade_in { envelope[n - 1 - i] } else { envelope[i] };
        for x in frame.chunks_exact_mut(bps) {
            let v = format.read(x) * w;
            format.write(x, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(frames: usize, channels: usize, value: f32) -> Vec<u8> {
        let mut out = vec![0u8; frames * channels * 2];
        for chunk in out.chunks_exact_mut(2) {
            SampleFormat::Int16.write(chunk, value);
        }
        out
    }

    fn channel0(buf: &[u8], channels: usize) -> Vec<f32> {
        buf.chunks_exact(2 * channels)
            .map(|f| SampleFormat::Int16.read(f))
            .collect()
    }

    #[test]
    fn seamless_flip_between_equal_signals_is_flat() {
        let w = TransitionWindows::new(8_000, SampleFormat::Int16);
        let n = w.frames();
        let mut a = constant(n, 2, 1_000.0);
        let b = constant(n, 2, 1_000.0);
        blend_transition(&mut a, &b, SampleFormat::Int16, 2, &w, Transition::Flip(FlipStyle::Seamless));
        for v in channel0(&a, 2) {
            assert!((v - 1_000.0).abs() <= 1.0, "{v}");
        }
    }

    #[test]
    fn seek_moves_from_a_to_b() {
        let w = TransitionWindows::new(8_000, SampleFormat::Int16);
        let n = w.frames();
        let mut a = constant(n, 1, 10_000.0);
        let b = constant(n, 1, -10_000.0);
        blend_transition(&mut a, &b, SampleFormat::Int16, 1, &w, Transition::Seek);
        let out = channel0(&a, 1);
        assert!(out[0] > 9_900.0);
        assert!(out[n - 1] < -9_900.0);
    }

    #[test]
    fn mark_flip_is_silent_in_the_middle() {
        let w = TransitionWindows::new(8_000, SampleFormat::Int16);
        let n = w.frames();
        let mut a = constant(n, 1, 10_000.0);
        let b = constant(n, 1, 10_000.0);
        blend_transition(&mut a, &b, SampleFormat::Int16, 1, &w, Transition::Flip(FlipStyle::Mark));
        let out = channel0(&a, 1);
        assert!(out[n / 3..n - n / 3].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn select_adds_tone_over_silence() {
        let w = TransitionWindows::new(8_000, SampleFormat::Int16);
        let n = w.frames();
        let mut a = constant(n, 1, 0.0);
        let b = constant(n, 1, 0.0);
        blend_transition(&mut a, &b, SampleFormat::Int16, 1, &w, Transition::Select);
        let out = channel0(&a, 1);
        assert!(out[n / 4..n * 3 / 4].iter().any(|&v| v.abs() > 500.0));
        assert!(out[..n / 4].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn fade_out_then_in() {
        let w = TransitionWindows::new(8_000, SampleFormat::Int16);
        let n = w.frames();
        let mut out = constant(n, 1, 8_000.0);
        fade(&mut out, SampleFormat::Int16, 1, &w, false);
        let v = channel0(&out, 1);
        assert!(v[0] > 7_900.0 && v[n - 1] < 10.0);

        let mut inc = constant(n, 1, 8_000.0);
        fade(&mut inc, SampleFormat::Int16, 1, &w, true);
        let v = channel0(&inc, 1);
        assert!(v[0] < 10.0 && v[n - 1] > 7_900.0);
    }

    #[test]
    fn flip_style_cycles() {
        assert_eq!(FlipStyle::Mark.next().next().next(), FlipStyle::Mark);
        assert_eq!(FlipStyle::Beep.next(), FlipStyle::Seamless);
    }
}
