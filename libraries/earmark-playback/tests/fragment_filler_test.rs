//! Property tests for the looping fragment filler
//!
//! Feeds each call's cursor into the next, over random loop markers and
//! start positions, and checks the stream stays readable and click-free.

use earmark_audio::TransitionWindows;
use earmark_core::{ChannelLayout, NativeDepth, Sample, SampleFormat};
use earmark_playback::{fill_fragment, Cursor, FillMode, LoopRegion, PlaybackError};
use proptest::prelude::*;

// ===== Helpers =====

/// Mono 16-bit ramp: frame `i` holds value `i`
fn ramp(rate: u32, frames: usize) -> Sample {
    let data = (0..frames as i16).flat_map(|i| i.to_le_bytes()).collect();
    Sample::from_bytes(
        "ramp.wav",
        rate,
        ChannelLayout::mono(),
        NativeDepth::Integer(16),
        SampleFormat::Int16,
        data,
    )
    .unwrap()
}

/// Mono 16-bit constant
fn flat(rate: u32, frames: usize, level: i16) -> Sample {
    let data = (0..frames).flat_map(|_| level.to_le_bytes()).collect();
    Sample::from_bytes(
        "flat.wav",
        rate,
        ChannelLayout::mono(),
        NativeDepth::Integer(16),
        SampleFormat::Int16,
        data,
    )
    .unwrap()
}

fn values(out: &[u8]) -> Vec<i32> {
    out.chunks_exact(2)
        .map(|c| i32::from(i16::from_le_bytes([c[0], c[1]])))
        .collect()
}

/// Fragment length, sample length, loop markers (all in frames) and a start frame
fn layout() -> impl Strategy<Value = (usize, usize, usize, usize, usize)> {
    (2usize..12)
        .prop_flat_map(|n| (Just(n), 3 * n..400))
        .prop_flat_map(|(n, frames)| (Just(n), Just(frames), 0..frames, 1..=frames, 0..=frames))
}

// ===== Property Tests =====

proptest! {
    /// Chained late-safe fills never trip the overrun check
    #[test]
    fn late_safe_chain_never_overruns((n, frames, start, end, at) in layout()) {
        let rate = (n * 10) as u32;
        let sample = ramp(rate, frames);
        let windows = TransitionWindows::new(rate, SampleFormat::Int16);
        let region = LoopRegion { start: start * 2, end: end.max(start + 1) * 2 };
        let mut cursor = Cursor::at(at.min(frames - n) * 2);
        let mut out = vec![0u8; n * 2];

        for _ in 0..(3 * frames / n + 5) {
            fill_fragment(&mut out, &sample, region, &mut cursor, windows.crossfade(), FillMode::LateSafe)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(cursor.position % 2, 0);
            prop_assert!(cursor.position <= frames * 2);
        }
    }

    /// After a seek, an on-schedule fill from anywhere in the buffer hands a
    /// cursor the late-safe filler can continue from
    #[test]
    fn on_schedule_then_late_safe_never_overruns((n, frames, start, end, at) in layout()) {
        let rate = (n * 10) as u32;
        let sample = ramp(rate, frames);
        let windows = TransitionWindows::new(rate, SampleFormat::Int16);
        let region = LoopRegion { start: start * 2, end: end.max(start + 1) * 2 };
        let effective = region.effective(frames * 2, n * 2, 2);
        let seek_to = at.clamp(effective.start / 2, effective.end / 2);
        let mut cursor = Cursor::at(seek_to * 2);
        let mut out = vec![0u8; n * 2];

        fill_fragment(&mut out, &sample, region, &mut cursor, windows.crossfade(), FillMode::OnSchedule)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        for _ in 0..(2 * frames / n + 5) {
            fill_fragment(&mut out, &sample, region, &mut cursor, windows.crossfade(), FillMode::LateSafe)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
        }
    }

    /// A constant signal loops without any step at the seam
    #[test]
    fn constant_signal_loops_flat((n, frames, start, end, at) in layout(), level in -20_000i16..20_000) {
        let rate = (n * 10) as u32;
        let sample = flat(rate, frames, level);
        let windows = TransitionWindows::new(rate, SampleFormat::Int16);
        let region = LoopRegion { start: start * 2, end: end.max(start + 1) * 2 };
        let mut cursor = Cursor::at(at.min(frames - n) * 2);
        let mut out = vec![0u8; n * 2];

        for _ in 0..(2 * frames / n + 5) {
            fill_fragment(&mut out, &sample, region, &mut cursor, windows.crossfade(), FillMode::LateSafe)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            for v in values(&out) {
                prop_assert!((v - i32::from(level)).abs() <= 1, "{} != {}", v, level);
            }
        }
    }

    /// Consecutive frames of a looping ramp never jump by more than the
    /// crossfade can explain
    #[test]
    fn ramp_has_no_hard_edges((n, frames, start, end) in layout().prop_map(|(n, f, s, e, _)| (n, f, s, e))) {
        let rate = (n * 10) as u32;
        let sample = ramp(rate, frames);
        let windows = TransitionWindows::new(rate, SampleFormat::Int16);
        let region = LoopRegion { start: start * 2, end: end.max(start + 1) * 2 };
        let effective = region.effective(frames * 2, n * 2, 2);
        let mut cursor = Cursor::at(effective.start);
        let mut out = vec![0u8; n * 2];
        // the crossfade weight moves by at most pi/2n per frame
        let bound = 2 + (frames * 2 / n) as i32;

        let mut previous: Option<i32> = None;
        for _ in 0..(3 * frames / n + 5) {
            fill_fragment(&mut out, &sample, region, &mut cursor, windows.crossfade(), FillMode::LateSafe)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            for v in values(&out) {
                if let Some(p) = previous {
                    prop_assert!((v - p).abs() <= bound, "jump {} -> {} (bound {})", p, v, bound);
                }
                previous = Some(v);
            }
        }
    }

    /// Crossfade weights are complementary at every frame
    #[test]
    fn crossfade_weights_sum_to_one(n in 1usize..2_000) {
        let windows = TransitionWindows::new((n * 10) as u32, SampleFormat::Int16);
        let w = windows.crossfade();
        prop_assert_eq!(w.len(), n);
        for i in 0..n {
            prop_assert!((w[i] + w[n - 1 - i] - 1.0).abs() < 1e-5);
        }
    }
}

// ===== Boundary Tests =====

#[test]
fn cursor_past_last_fragment_is_an_invariant_violation() {
    let sample = ramp(100, 100);
    let windows = TransitionWindows::new(100, SampleFormat::Int16);
    let mut out = vec![0u8; 20];
    let mut cursor = Cursor::at(182);
    let err = fill_fragment(
        &mut out,
        &sample,
        LoopRegion::whole(200),
        &mut cursor,
        windows.crossfade(),
        FillMode::LateSafe,
    )
    .unwrap_err();
    assert!(matches!(err, PlaybackError::CursorOverrun { .. }));
}

#[test]
fn loop_end_pulled_behind_cursor_restarts_crossfade_at_once() {
    let sample = ramp(100, 100);
    let windows = TransitionWindows::new(100, SampleFormat::Int16);
    let mut out = vec![0u8; 20];
    let mut cursor = Cursor::at(100);
    // end marker at frame 40, cursor at frame 50
    let region = LoopRegion { start: 0, end: 80 };
    fill_fragment(&mut out, &sample, region, &mut cursor, windows.crossfade(), FillMode::LateSafe).unwrap();

    let got = values(&out);
    assert!((got[0] - 50).abs() <= 1, "starts from the cursor");
    assert!(got[9] <= 10, "ends on the loop start");
    assert_eq!(cursor, Cursor::at(20));
}

#[test]
fn sample_shorter_than_three_fragments_is_rejected() {
    let sample = ramp(100, 25);
    let windows = TransitionWindows::new(100, SampleFormat::Int16);
    let mut out = vec![0u8; 20];
    let mut cursor = Cursor::at(0);
    let err = fill_fragment(
        &mut out,
        &sample,
        LoopRegion::whole(50),
        &mut cursor,
        windows.crossfade(),
        FillMode::LateSafe,
    )
    .unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidSession(_)));
}
