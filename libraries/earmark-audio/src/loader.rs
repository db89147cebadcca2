/// File loading via Symphonia, plus headerless `.sw` files
use crate::error::{AudioError, Result};
use earmark_core::{ChannelLayout, NativeDepth, Sample, SampleLoader};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample as SymphoniaSample;

/// Rate assumed for headerless `.sw` files
pub const RAW_RATE: u32 = 48_000;

/// Loads samples from disk
///
/// Supports everything Symphonia decodes (WAV, FLAC, Ogg Vorbis, MP3, AAC,
/// ALAC, ...) plus `.sw`: headerless mono signed 16-bit little-endian PCM
/// at 48 kHz.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    /// Create a loader
    pub fn new() -> Self {
        Self
    }

    /// Decode `path` into a `Float32` sample
    ///
    /// # Errors
    /// Returns an error if the file is missing, cannot be probed, or has no
    /// decodable audio track.
    pub fn load_file(&self, path: &Path) -> Result<Sample> {
        if !path.exists() {
            return Err(AudioError::FileNotFound(path.to_path_buf()));
        }
        let is_raw = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("sw"));

        let sample = if is_raw {
            load_raw(path)?
        } else {
            decode(path)?
        };

        tracing::info!(
            "Loaded {}: {} Hz, {} ({} ch), native {:?}, {:.2} s",
            sample.name(),
            sample.rate(),
            sample.layout(),
            sample.channels(),
            sample.native(),
            sample.duration_secs()
        );
        Ok(sample)
    }
}

impl SampleLoader for FileLoader {
    fn load(&self, path: &Path) -> earmark_core::Result<Sample> {
        Ok(self.load_file(path)?)
    }
}

fn load_raw(path: &Path) -> Result<Sample> {
    let bytes = std::fs::read(path)?;
    let mut values = Vec::new();
    values.try_reserve_exact(bytes.len() / 2)?;
    values.extend(
        bytes
            .chunks_exact(2)
            .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])) / 32_768.0),
    );
    Ok(Sample::from_f32(
        path,
        RAW_RATE,
        ChannelLayout::mono(),
        NativeDepth::Integer(16),
        values,
    )?)
}

fn decode(path: &Path) -> Result<Sample> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::decode(path, format!("failed to probe file: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::decode(path, "no audio tracks found"))?;

    let track_id = track.id;
    let params = track.codec_params.clone();
    let rate = params
        .sample_rate
        .ok_or_else(|| AudioError::decode(path, "unknown sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| AudioError::unsupported(path, format!("no decoder: {e}")))?;

    let mut values: Vec<f32> = Vec::new();
    let mut native: Option<NativeDepth> = None;
    let mut layout: Option<ChannelLayout> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::decode(path, format!("error reading packet: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!("{}: skipping corrupt packet: {e}", path.display());
                continue;
            }
            Err(e) => return Err(AudioError::decode(path, e)),
        };

        let spec = *decoded.spec();
        if layout.is_none() {
            let count = spec.channels.count() as u16;
            layout = Some(ChannelLayout::from_mask(spec.channels.bits(), count));
            native = Some(native_depth(&decoded, params.bits_per_sample));
        }
        interleave_ref(&decoded, &mut values)?;
    }

    let layout = match layout {
        Some(layout) => layout,
        // no packets: fall back to the container's declared layout
        None => {
            let channels = params
                .channels
                .ok_or_else(|| AudioError::decode(path, "no audio decoded"))?;
            ChannelLayout::from_mask(channels.bits(), channels.count() as u16)
        }
    };
    let native = native.unwrap_or(match params.bits_per_sample {
        Some(bits) => NativeDepth::Integer(bits as u16),
        None => NativeDepth::Float,
    });

    Ok(Sample::from_f32(path, rate, layout, native, values)?)
}

/// Native encoding, from the decoded buffer type and declared bit depth
fn native_depth(decoded: &AudioBufferRef<'_>, declared_bits: Option<u32>) -> NativeDepth {
    let container_bits = match decoded {
        AudioBufferRef::F32(_) | AudioBufferRef::F64(_) => return NativeDepth::Float,
        AudioBufferRef::U8(_) | AudioBufferRef::S8(_) => 8,
        AudioBufferRef::U16(_) | AudioBufferRef::S16(_) => 16,
        AudioBufferRef::U24(_) | AudioBufferRef::S24(_) => 24,
        AudioBufferRef::U32(_) | AudioBufferRef::S32(_) => 32,
    };
    NativeDepth::Integer(declared_bits.map_or(container_bits, |b| b as u16))
}

/// Append a decoded packet as interleaved f32, keeping every channel
///
/// Integer data is scaled by 2^(bits-1), so 16- and 24-bit sources survive a
/// round trip through float unchanged. Values are not clamped.
fn interleave_ref(decoded: &AudioBufferRef<'_>, out: &mut Vec<f32>) -> Result<()> {
    match decoded {
        AudioBufferRef::F32(buf) => interleave(buf, out, |s| s),
        AudioBufferRef::F64(buf) => interleave(buf, out, |s| s as f32),
        AudioBufferRef::S32(buf) => interleave(buf, out, |s| (f64::from(s) / 2_147_483_648.0) as f32),
        AudioBufferRef::S24(buf) => interleave(buf, out, |s| s.inner() as f32 / 8_388_608.0),
        AudioBufferRef::S16(buf) => interleave(buf, out, |s| f32::from(s) / 32_768.0),
        AudioBufferRef::S8(buf) => interleave(buf, out, |s| f32::from(s) / 128.0),
        AudioBufferRef::U32(buf) => interleave(buf, out, IntoSample::<f32>::into_sample),
        AudioBufferRef::U24(buf) => interleave(buf, out, IntoSample::<f32>::into_sample),
        AudioBufferRef::U16(buf) => interleave(buf, out, IntoSample::<f32>::into_sample),
        AudioBufferRef::U8(buf) => interleave(buf, out, IntoSample::<f32>::into_sample),
    }
}

fn interleave<T, F>(buf: &AudioBuffer<T>, out: &mut Vec<f32>, normalize: F) -> Result<()>
where
    T: SymphoniaSample,
    F: Fn(T) -> f32,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    out.try_reserve(frames * channels)?;
    for i in 0..frames {
        for ch in 0..channels {
            out.push(normalize(buf.chan(ch)[i]));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = FileLoader::new()
            .load_file(Path::new("/nonexistent/take1.flac"))
            .unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound(_)));
    }

    #[test]
    fn raw_file_is_mono_16_bit_48k() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.sw");
        let mut bytes = Vec::new();
        for v in [0i16, 16_384, -32_768, 32_767] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();

        let sample = FileLoader::new().load_file(&path).unwrap();
        assert_eq!(sample.rate(), RAW_RATE);
        assert_eq!(sample.layout(), &ChannelLayout::mono());
        assert_eq!(sample.native(), NativeDepth::Integer(16));
        assert!(!sample.dither());
        assert_eq!(sample.frames(), 4);
        assert_eq!(sample.value(1, 0), 0.5);
        assert_eq!(sample.value(2, 0), -1.0);
    }
}
