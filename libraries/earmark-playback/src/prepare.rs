//! Session preparation
//!
//! Takes freshly loaded float samples and brings them into one shape the
//! fragment filler can play: same rate, channel count, channel order,
//! integer format and length, and at least three fragments long. Opens the
//! output device on the way, since the device decides the integer format.

use crate::error::{PlaybackError, Result};
use earmark_audio::{
    convert_bit_depth, detect_clipping, downmix, extend_to_minimum, reconcile_layout, DownmixTarget,
    TransitionWindows,
};
use earmark_core::{DeviceOpener, DeviceSink, DeviceSpec, EarmarkError, NativeDepth, Sample, SampleFormat};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Preparation options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Dither every sample when reducing to 16 bits
    pub force_dither: bool,
    /// Never dither samples whose source is not 16-bit
    pub force_truncate: bool,
    /// Mix every sample down before comparing
    pub downmix: Option<DownmixTarget>,
    /// Seed for dither noise; `None` draws one from the OS
    pub seed: Option<u64>,
}

/// Samples ready to play, with the device that will play them
pub struct PreparedSession {
    /// Samples in one shared format, layout and length
    pub samples: Vec<Sample>,
    /// Envelopes and tones for the samples' rate and format
    pub windows: TransitionWindows,
    /// Open output device
    pub sink: Box<dyn DeviceSink>,
    /// Integer format the device was opened with
    pub format: SampleFormat,
}

/// Prepare loaded samples and open the output device
///
/// Steps, in order: dither overrides, rate check, optional downmix, channel
/// count check, clip detection with a common repair gain, device open (24-bit
/// first when any source is deeper than 16 bits, then 16-bit), bit-depth
/// conversion, channel reconciliation, length equalisation and short-sample
/// extension.
///
/// # Errors
/// - [`EarmarkError::RateMismatch`] / [`EarmarkError::ChannelMismatch`]
///   (wrapped) when the samples disagree
/// - the opener's error when no format could be opened
/// - conversion, reconciliation and allocation errors from the audio crate
pub fn prepare(
    mut samples: Vec<Sample>,
    opener: &dyn DeviceOpener,
    options: &PrepareOptions,
) -> Result<PreparedSession> {
    if samples.is_empty() {
        return Err(PlaybackError::NoSamples);
    }

    for sample in &mut samples {
        if options.force_dither {
            sample.set_dither(true);
        }
        if options.force_truncate && sample.native().bits() != 16 {
            sample.set_dither(false);
        }
    }

    check_rates(&samples)?;

    let mut gain = 1.0f32;
    if let Some(target) = options.downmix {
        for sample in &mut samples {
            gain = gain.min(downmix(sample, target)?);
        }
        tracing::debug!("Downmixed {} samples to {:?}", samples.len(), target);
    }

    check_channels(&samples)?;

    for sample in &mut samples {
        let report = detect_clipping(sample)?;
        if !report.clipped {
            continue;
        }
        sample.set_clipped(true);
        if report.fixable {
            tracing::warn!("{}: clipping in decoded data; attenuating all samples", sample.name());
            gain = gain.min(report.attenuation);
        } else {
            tracing::warn!("{}: source material is clipped", sample.name());
        }
    }
    if gain < 1.0 {
        tracing::info!("Applying {:.2} dB of common attenuation", 20.0 * gain.log10());
        for sample in &mut samples {
            sample.apply_gain(gain);
        }
    }

    let (sink, format) = open_device(&samples, opener)?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for sample in &mut samples {
        convert_bit_depth(sample, format, &mut rng)?;
    }

    if let Some((reference, rest)) = samples.split_first_mut() {
        for sample in rest {
            reconcile_layout(reference, sample)?;
        }
    }

    equalise_lengths(&mut samples);
    extend_to_minimum(&mut samples)?;

    let rate = samples[0].rate();
    Ok(PreparedSession {
        samples,
        windows: TransitionWindows::new(rate, format),
        sink,
        format,
    })
}

fn check_rates(samples: &[Sample]) -> Result<()> {
    let first = &samples[0];
    for other in &samples[1..] {
        if other.rate() != first.rate() {
            return Err(EarmarkError::RateMismatch {
                first: first.path().to_path_buf(),
                first_rate: first.rate(),
                other: other.path().to_path_buf(),
                other_rate: other.rate(),
            }
            .into());
        }
    }
    Ok(())
}

fn check_channels(samples: &[Sample]) -> Result<()> {
    let first = &samples[0];
    for other in &samples[1..] {
        if other.channels() != first.channels() {
            return Err(EarmarkError::ChannelMismatch {
                first: first.path().to_path_buf(),
                first_channels: first.channels(),
                other: other.path().to_path_buf(),
                other_channels: other.channels(),
            }
            .into());
        }
    }
    Ok(())
}

/// Output format the sources call for: 24-bit if any is deeper than 16
fn preferred_format(samples: &[Sample]) -> SampleFormat {
    let deep = samples.iter().any(|s| match s.native() {
        NativeDepth::Integer(bits) => bits > 16,
        NativeDepth::Float => true,
    });
    if deep {
        SampleFormat::Int24
    } else {
        SampleFormat::Int16
    }
}

fn open_device(samples: &[Sample], opener: &dyn DeviceOpener) -> Result<(Box<dyn DeviceSink>, SampleFormat)> {
    let mut spec = DeviceSpec {
        rate: samples[0].rate(),
        format: preferred_format(samples),
        layout: samples[0].layout().clone(),
    };

    match opener.open(&spec) {
        Ok(sink) => {
            tracing::info!(
                "Opened output: {} Hz, {} channels, {}-bit",
                spec.rate,
                spec.channels(),
                spec.format.bits()
            );
            Ok((sink, spec.format))
        }
        Err(e) if spec.format == SampleFormat::Int24 => {
            tracing::warn!("24-bit playback unavailable ({e}); down-converting to 16-bit");
            spec.format = SampleFormat::Int16;
            let sink = opener.open(&spec)?;
            tracing::info!("Opened output: {} Hz, {} channels, 16-bit", spec.rate, spec.channels());
            Ok((sink, spec.format))
        }
        Err(e) => Err(e.into()),
    }
}

/// Truncate every sample to the shortest one
fn equalise_lengths(samples: &mut [Sample]) {
    let Some(shortest) = samples.iter().map(Sample::frames).min() else {
        return;
    };
    if samples.iter().all(|s| s.frames() == shortest) {
        return;
    }
    for sample in samples.iter() {
        tracing::warn!(
            "Input sample lengths do not match: {} is {:.2}s",
            sample.name(),
            sample.duration_secs()
        );
    }
    tracing::warn!("Using the shortest sample for playback length");
    for sample in samples {
        sample.truncate_frames(shortest);
    }
}
