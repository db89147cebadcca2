/// Sample buffers and their encodings
use crate::error::{EarmarkError, Result};
use crate::types::ChannelLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// In-memory encoding of a sample buffer
///
/// Integer formats are little-endian and read/written in integer code
/// units; `Float32` is nominally in [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    /// Signed 16-bit, 2 bytes
    Int16,
    /// Signed 24-bit packed, 3 bytes
    Int24,
    /// IEEE 754 single precision, 4 bytes
    Float32,
}

impl SampleFormat {
    /// Bytes per single-channel sample
    pub const fn bytes(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int24 => 3,
            Self::Float32 => 4,
        }
    }

    /// Bits of resolution
    pub const fn bits(self) -> u16 {
        match self {
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Float32 => 32,
        }
    }

    /// Magnitude of negative full scale in code units
    pub const fn full_scale(self) -> f32 {
        match self {
            Self::Int16 => 32_768.0,
            Self::Int24 => 8_388_608.0,
            Self::Float32 => 1.0,
        }
    }

    /// Integer output format for a bit depth (16 or 24)
    pub fn for_output_bits(bits: u16) -> Option<Self> {
        match bits {
            16 => Some(Self::Int16),
            24 => Some(Self::Int24),
            _ => None,
        }
    }

    /// Read one sample from the start of `bytes`
    #[inline]
    pub fn read(self, bytes: &[u8]) -> f32 {
        match self {
            Self::Int16 => f32::from(i16::from_le_bytes([bytes[0], bytes[1]])),
            // shift into the top of an i32 then back to sign-extend
            Self::Int24 => (i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8) as f32,
            Self::Float32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Write one sample to the start of `bytes`
    ///
    /// Integer formats round half-to-even and saturate at the representable
    /// range; NaN becomes zero.
    #[inline]
    pub fn write(self, bytes: &mut [u8], value: f32) {
        match self {
            Self::Int16 => {
                let v = value.round_ties_even().clamp(-32_768.0, 32_767.0) as i16;
                bytes[..2].copy_from_slice(&v.to_le_bytes());
            }
            Self::Int24 => {
                let v = value.round_ties_even().clamp(-8_388_608.0, 8_388_607.0) as i32;
                bytes[..3].copy_from_slice(&v.to_le_bytes()[..3]);
            }
            Self::Float32 => bytes[..4].copy_from_slice(&value.to_le_bytes()),
        }
    }
}

/// Encoding of the file a sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeDepth {
    /// Integer PCM with the given bit depth
    Integer(u16),
    /// Floating point, or a lossy codec decoded to float
    Float,
}

impl NativeDepth {
    /// Bit depth used for output-device negotiation
    pub fn bits(self) -> u16 {
        match self {
            Self::Integer(bits) => bits,
            Self::Float => 32,
        }
    }

    /// Largest positive value an integer source can hold, as a fraction of
    /// full scale; 1.0 for float sources
    pub fn positive_full_scale(self) -> f32 {
        match self {
            Self::Integer(bits) if bits > 1 && bits <= 32 => {
                let scale = f64::from(1u32 << (bits - 1).min(31));
                ((scale - 1.0) / scale) as f32
            }
            _ => 1.0,
        }
    }

    /// Whether reducing this source to 16 bits should be dithered by default
    pub fn dither_by_default(self) -> bool {
        match self {
            Self::Integer(bits) => bits > 16,
            Self::Float => true,
        }
    }
}

/// A decoded audio sample being compared
///
/// The buffer is interleaved; its length is always a whole number of frames
/// for the current layout and format.
#[derive(Debug, Clone)]
pub struct Sample {
    path: PathBuf,
    rate: u32,
    layout: ChannelLayout,
    native: NativeDepth,
    format: SampleFormat,
    data: Vec<u8>,
    dither: bool,
    clipped: bool,
}

impl Sample {
    /// Build a sample from raw bytes in `format`
    pub fn from_bytes(
        path: impl Into<PathBuf>,
        rate: u32,
        layout: ChannelLayout,
        native: NativeDepth,
        format: SampleFormat,
        data: Vec<u8>,
    ) -> Result<Self> {
        if rate == 0 {
            return Err(EarmarkError::InvalidSample("sample rate must be positive".into()));
        }
        if layout.is_empty() {
            return Err(EarmarkError::InvalidSample("no channels".into()));
        }
        let bpf = layout.len() * format.bytes();
        if data.len() % bpf != 0 {
            return Err(EarmarkError::InvalidSample(format!(
                "{} bytes is not a whole number of {bpf}-byte frames",
                data.len()
            )));
        }
        Ok(Self {
            path: path.into(),
            rate,
            layout,
            native,
            format,
            data,
            dither: native.dither_by_default(),
            clipped: false,
        })
    }

    /// Build a `Float32` sample from interleaved values
    pub fn from_f32(
        path: impl Into<PathBuf>,
        rate: u32,
        layout: ChannelLayout,
        native: NativeDepth,
        samples: Vec<f32>,
    ) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(samples.len() * 4)?;
        for value in samples {
            data.extend_from_slice(&value.to_le_bytes());
        }
        Self::from_bytes(path, rate, layout, native, SampleFormat::Float32, data)
    }

    /// Source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for display
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Sample rate in Hz
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Channel layout
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// Channel count
    pub fn channels(&self) -> u16 {
        self.layout.len() as u16
    }

    /// Native encoding of the source file
    pub fn native(&self) -> NativeDepth {
        self.native
    }

    /// Current working format
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Bytes per interleaved frame
    pub fn bytes_per_frame(&self) -> usize {
        self.layout.len() * self.format.bytes()
    }

    /// Number of frames
    pub fn frames(&self) -> usize {
        self.data.len() / self.bytes_per_frame()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.rate)
    }

    /// Raw interleaved bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the bytes; the length cannot change
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Whether down-conversion to 16 bits applies dither
    pub fn dither(&self) -> bool {
        self.dither
    }

    /// Override the dither decision
    pub fn set_dither(&mut self, dither: bool) {
        self.dither = dither;
    }

    /// Whether clipping was detected in this sample
    pub fn clipped(&self) -> bool {
        self.clipped
    }

    /// Record the clip detection result
    pub fn set_clipped(&mut self, clipped: bool) {
        self.clipped = clipped;
    }

    /// Take the buffer out, leaving the sample empty until it is replaced
    pub fn take_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Replace the buffer and its format, keeping the layout
    pub fn replace_data(&mut self, format: SampleFormat, data: Vec<u8>) -> Result<()> {
        let layout = self.layout.clone();
        self.replace_contents(layout, format, data)
    }

    /// Replace buffer, format and layout together
    pub fn replace_contents(
        &mut self,
        layout: ChannelLayout,
        format: SampleFormat,
        data: Vec<u8>,
    ) -> Result<()> {
        if layout.is_empty() {
            return Err(EarmarkError::InvalidSample("no channels".into()));
        }
        let bpf = layout.len() * format.bytes();
        if data.len() % bpf != 0 {
            return Err(EarmarkError::InvalidSample(format!(
                "{}: {} bytes is not a whole number of {bpf}-byte frames",
                self.name(),
                data.len()
            )));
        }
        self.layout = layout;
        self.format = format;
        self.data = data;
        Ok(())
    }

    /// Relabel channels without moving data; the channel count must match
    pub fn set_layout(&mut self, layout: ChannelLayout) -> Result<()> {
        if layout.len() != self.layout.len() {
            return Err(EarmarkError::InvalidSample(format!(
                "layout {layout} does not have {} channels",
                self.layout.len()
            )));
        }
        self.layout = layout;
        Ok(())
    }

    /// Drop frames past `frames`
    pub fn truncate_frames(&mut self, frames: usize) {
        let len = frames * self.bytes_per_frame();
        self.data.truncate(len);
    }

    /// Read channel `channel` of frame `frame`
    pub fn value(&self, frame: usize, channel: usize) -> f32 {
        let bps = self.format.bytes();
        let offset = frame * self.bytes_per_frame() + channel * bps;
        self.format.read(&self.data[offset..offset + bps])
    }

    /// Multiply every value by `gain`
    pub fn apply_gain(&mut self, gain: f32) {
        let format = self.format;
        for chunk in self.data.chunks_exact_mut(format.bytes()) {
            let v = format.read(chunk);
            format.write(chunk, v * gain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn stereo(values: Vec<f32>) -> Sample {
        Sample::from_f32("a.wav", 48_000, ChannelLayout::stereo(), NativeDepth::Float, values).unwrap()
    }

    #[test]
    fn int24_sign_extends() {
        let mut buf = [0u8; 3];
        SampleFormat::Int24.write(&mut buf, -1.0);
        assert_eq!(buf, [0xff, 0xff, 0xff]);
        assert_eq!(SampleFormat::Int24.read(&buf), -1.0);

        SampleFormat::Int24.write(&mut buf, -8_388_608.0);
        assert_eq!(SampleFormat::Int24.read(&buf), -8_388_608.0);
    }

    #[test]
    fn integer_writes_saturate() {
        let mut buf = [0u8; 3];
        SampleFormat::Int16.write(&mut buf, 40_000.0);
        assert_eq!(SampleFormat::Int16.read(&buf), 32_767.0);
        SampleFormat::Int16.write(&mut buf, -40_000.0);
        assert_eq!(SampleFormat::Int16.read(&buf), -32_768.0);
        SampleFormat::Int24.write(&mut buf, 1.0e9);
        assert_eq!(SampleFormat::Int24.read(&buf), 8_388_607.0);
    }

    #[test]
    fn integer_writes_round_half_even() {
        let mut buf = [0u8; 2];
        SampleFormat::Int16.write(&mut buf, 2.5);
        assert_eq!(SampleFormat::Int16.read(&buf), 2.0);
        SampleFormat::Int16.write(&mut buf, 3.5);
        assert_eq!(SampleFormat::Int16.read(&buf), 4.0);
        SampleFormat::Int16.write(&mut buf, -2.5);
        assert_eq!(SampleFormat::Int16.read(&buf), -2.0);
        SampleFormat::Int16.write(&mut buf, -3.5);
        assert_eq!(SampleFormat::Int16.read(&buf), -4.0);
    }

    #[test]
    fn int24_writes_round_half_even() {
        let mut buf = [0u8; 3];
        for (half, code) in [(2.5, 2i32), (3.5, 4), (-2.5, -2), (-3.5, -4)] {
            SampleFormat::Int24.write(&mut buf, half);
            assert_eq!(SampleFormat::Int24.read(&buf), code as f32, "{half}");
            let sign = if code < 0 { 0xff } else { 0x00 };
            assert_eq!(buf, [code.to_le_bytes()[0], sign, sign], "{half}");
        }
    }

    #[test]
    fn native_positive_full_scale() {
        assert_relative_eq!(NativeDepth::Integer(16).positive_full_scale(), 32_767.0 / 32_768.0);
        assert_relative_eq!(NativeDepth::Integer(8).positive_full_scale(), 127.0 / 128.0);
        assert_eq!(NativeDepth::Float.positive_full_scale(), 1.0);
    }

    #[test]
    fn dither_defaults_follow_native_depth() {
        assert!(!NativeDepth::Integer(16).dither_by_default());
        assert!(!NativeDepth::Integer(8).dither_by_default());
        assert!(NativeDepth::Integer(24).dither_by_default());
        assert!(NativeDepth::Float.dither_by_default());
    }

    #[test]
    fn rejects_partial_frames() {
        let err = Sample::from_bytes(
            "a.wav",
            48_000,
            ChannelLayout::stereo(),
            NativeDepth::Integer(16),
            SampleFormat::Int16,
            vec![0; 6],
        );
        assert!(err.is_err());
    }

    #[test]
    fn frames_and_values() {
        let sample = stereo(vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(sample.frames(), 2);
        assert_eq!(sample.bytes_per_frame(), 8);
        assert_relative_eq!(sample.value(1, 0), 0.3);
        assert_relative_eq!(sample.value(1, 1), 0.4);
    }

    #[test]
    fn apply_gain_scales_every_value() {
        let mut sample = stereo(vec![0.5, -0.5, 1.0, -1.0]);
        sample.apply_gain(0.5);
        assert_relative_eq!(sample.value(0, 0), 0.25);
        assert_relative_eq!(sample.value(1, 1), -0.5);
    }

    #[test]
    fn truncate_keeps_whole_frames() {
        let mut sample = stereo(vec![0.0; 8]);
        sample.truncate_frames(3);
        assert_eq!(sample.frames(), 3);
        assert_eq!(sample.data().len(), 24);
    }

    proptest! {
        #[test]
        fn int16_codes_survive_read_write(code in any::<i16>()) {
            let mut buf = [0u8; 2];
            SampleFormat::Int16.write(&mut buf, f32::from(code));
            prop_assert_eq!(i16::from_le_bytes(buf), code);
            prop_assert_eq!(SampleFormat::Int16.read(&buf), f32::from(code));
        }

        #[test]
        fn int24_codes_survive_read_write(code in -8_388_608i32..8_388_608) {
            let mut buf = [0u8; 3];
            SampleFormat::Int24.write(&mut buf, code as f32);
            prop_assert_eq!(SampleFormat::Int24.read(&buf), code as f32);
        }
    }
}
