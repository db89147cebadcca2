/// Bit-depth conversion between working formats
use crate::dither::TriangularDither;
use crate::error::{AudioError, Result};
use earmark_core::{NativeDepth, Sample, SampleFormat};
use rand::Rng;

/// Convert `sample` to `target` in place
///
/// - Float to integer scales by the integer full scale, rounds half-to-even
///   and saturates.
/// - 24-bit to 16-bit divides by 256.
/// - Reductions to 16 bits add triangular dither when the sample's dither
///   flag is set; nothing else is dithered.
/// - Widening conversions are exact, so `Int16 -> Float32 -> Int16` is lossless.
///
/// # Errors
/// - [`AudioError::UnsupportedFormat`] for a native depth outside 1..=32 bits
/// - [`AudioError::InvalidFloat`] if float data holds NaN or infinity; the
///   sample is left untouched
/// - [`AudioError::Allocation`] if a widening conversion cannot grow the buffer
pub fn convert_bit_depth<R: Rng>(sample: &mut Sample, target: SampleFormat, rng: &mut R) -> Result<()> {
    let source = sample.format();
    if source == target {
        return Ok(());
    }
    if let NativeDepth::Integer(bits) = sample.native() {
        if bits == 0 || bits > 32 {
            return Err(AudioError::unsupported(
                sample.path(),
                format!("{bits}-bit native samples"),
            ));
        }
    }
    if source == SampleFormat::Float32 && has_non_finite(sample.data()) {
        return Err(AudioError::InvalidFloat(sample.path().to_path_buf()));
    }

    let scale = target.full_scale() / source.full_scale();
    let mut data = sample.take_data();

    if target.bytes() < source.bytes() {
        let dither = (target == SampleFormat::Int16 && sample.dither())
            .then(|| TriangularDither::new(sample.layout().len(), &mut *rng));
        narrow(&mut data, source, target, scale, dither);
    } else if let Err(e) = data.try_reserve_exact(data.len() / source.bytes() * target.bytes() - data.len()) {
        sample.replace_data(source, data)?;
        return Err(e.into());
    } else {
        widen(&mut data, source, target, scale);
    }

    tracing::debug!(
        "{}: converted {:?} -> {:?}{}",
        sample.name(),
        source,
        target,
        if target == SampleFormat::Int16 && sample.dither() { " with dither" } else { "" }
    );
    sample.replace_data(target, data)?;
    Ok(())
}

fn has_non_finite(data: &[u8]) -> bool {
    data.chunks_exact(4)
        .any(|c| !SampleFormat::Float32.read(c).is_finite())
}

/// Front-to-back rewrite; each write lands at or before the bytes just read.
fn narrow<R: Rng>(
    data: &mut Vec<u8>,
    from: SampleFormat,
    to: SampleFormat,
    scale: f32,
    mut dither: Option<TriangularDither<R>>,
) {
    let (fb, tb) = (from.bytes(), to.bytes());
    let count = data.len() / fb;
    for i in 0..count {
        let mut v = from.read(&data[i * fb..i * fb + fb]) * scale;
        if let Some(d) = dither.as_mut() {
            v += d.next_value();
        }
        to.write(&mut data[i * tb..i * tb + tb], v);
    }
    data.truncate(count * tb);
}

/// Back-to-front rewrite after growing; each write lands at or after its source.
fn widen(data: &mut Vec<u8>, from: SampleFormat, to: SampleFormat, scale: f32) {
    let (fb, tb) = (from.bytes(), to.bytes());
    let count = data.len() / fb;
    data.resize(count * tb, 0);
    for i in (0..count).rev() {
        let v = from.read(&data[i * fb..i * fb + fb]) * scale;
        to.write(&mut data[i * tb..i * tb + tb], v);
    }
}
