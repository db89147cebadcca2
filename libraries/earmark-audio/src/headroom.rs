/// Peak scanning and headroom factors shared by downmix and clip repair
use earmark_core::SampleFormat;

/// Largest positive value an attenuated signal may reach, as a fraction of
/// full scale (the 24-bit positive limit)
pub const POSITIVE_CLAMP: f32 = 8_388_607.0 / 8_388_608.0;

/// Minimum and maximum `Float32` value in an interleaved buffer
pub fn peak_range(data: &[u8]) -> (f32, f32) {
    data.chunks_exact(SampleFormat::Float32.bytes())
        .map(|c| SampleFormat::Float32.read(c))
        .fold((0.0f32, 0.0f32), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Gain that brings `[min, max]` inside `[-1.0, POSITIVE_CLAMP]`
///
/// Returns 1.0 when the range already fits.
pub fn headroom_factor(min: f32, max: f32) -> f32 {
    let mut factor = 1.0f32;
    if min < -1.0 {
        factor = factor.min(-1.0 / min);
    }
    if max > POSITIVE_CLAMP {
        factor = factor.min(POSITIVE_CLAMP / max);
    }
    factor
}
