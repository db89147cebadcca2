/// CPAL-based output sink
///
/// A dedicated thread owns the cpal `Stream`, which is not `Send` on every
/// host. Fragments are decoded to normalised `f32` on the caller's thread and
/// handed to the stream callback through a one-slot channel, so once the
/// device is primed `play` blocks for about one fragment per call.
use crate::error::{DesktopError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use earmark_core::{DeviceOpener, DeviceSink, DeviceSpec, SampleFormat};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A `play` call that cannot hand over its fragment within this long treats
/// the device as gone
const DEVICE_TIMEOUT: Duration = Duration::from_secs(2);

/// Which output device to open
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// The host's default output device
    #[default]
    Default,
    /// The Nth device in enumeration order
    Index(usize),
    /// The first device whose name contains the string
    Name(String),
}

impl DeviceSelector {
    /// Integers select by index, anything else by name
    pub fn parse(selector: Option<&str>) -> Self {
        match selector.map(str::trim) {
            None | Some("") => Self::Default,
            Some(s) => s
                .parse()
                .map(Self::Index)
                .unwrap_or_else(|_| Self::Name(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Index(n) => write!(f, "#{n}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Opens cpal output streams for the playback engine
#[derive(Debug, Clone, Default)]
pub struct CpalOpener {
    selector: DeviceSelector,
}

impl CpalOpener {
    /// Opener for the device picked by `selector`
    pub fn new(selector: DeviceSelector) -> Self {
        Self { selector }
    }

    fn find_device(&self) -> Result<Device> {
        let host = cpal::default_host();
        match &self.selector {
            DeviceSelector::Default => host.default_output_device().ok_or(DesktopError::NoDevice),
            DeviceSelector::Index(n) => host
                .output_devices()?
                .nth(*n)
                .ok_or_else(|| DesktopError::DeviceNotFound(self.selector.to_string())),
            DeviceSelector::Name(part) => host
                .output_devices()?
                .find(|d| device_name(d).is_some_and(|name| name.contains(part.as_str())))
                .ok_or_else(|| DesktopError::DeviceNotFound(part.clone())),
        }
    }
}

impl DeviceOpener for CpalOpener {
    fn open(&self, spec: &DeviceSpec) -> earmark_core::Result<Box<dyn DeviceSink>> {
        let device = self.find_device()?;
        let sink = CpalSink::open(device, spec)?;
        Ok(Box::new(sink))
    }
}

#[allow(deprecated)]
fn device_name(device: &Device) -> Option<String> {
    device.name().ok()
}

/// Pick the stream sample type for `spec`
///
/// 24-bit fragments need a stream type that keeps all 24 bits, so a device
/// that only offers `i16` fails here and the caller falls back to 16-bit.
fn stream_format(device: &Device, spec: &DeviceSpec) -> Result<cpal::SampleFormat> {
    use cpal::SampleFormat as Cpal;

    let candidates: &[Cpal] = match spec.format {
        SampleFormat::Int16 => &[Cpal::F32, Cpal::I32, Cpal::I16],
        SampleFormat::Int24 | SampleFormat::Float32 => &[Cpal::F32, Cpal::I32],
    };
    let ranges: Vec<_> = device.supported_output_configs()?.collect();

    candidates
        .iter()
        .copied()
        .find(|&format| {
            ranges.iter().any(|r| {
                r.sample_format() == format
                    && r.channels() == spec.channels()
                    && r.min_sample_rate() <= spec.rate
                    && spec.rate <= r.max_sample_rate()
            })
        })
        .ok_or_else(|| {
            DesktopError::UnsupportedConfig(format!(
                "{} Hz, {} channels, {}-bit",
                spec.rate,
                spec.channels(),
                spec.format.bits()
            ))
        })
}

/// Decode little-endian fragment bytes into normalised floats
fn decode_fragment(bytes: &[u8], format: SampleFormat, out: &mut Vec<f32>) {
    let scale = format.full_scale();
    out.clear();
    out.extend(
        bytes
            .chunks_exact(format.bytes())
            .map(|b| format.read(b) / scale),
    );
}

/// Callback-side end of the fragment channel
struct Feed {
    fragments: Receiver<Vec<f32>>,
    recycle: Sender<Vec<f32>>,
    current: Vec<f32>,
    offset: usize,
}

impl Feed {
    /// Fill a device buffer, padding with silence on underrun
    fn fill<T: FromSample<f32>>(&mut self, data: &mut [T]) {
        let mut written = 0;
        while written < data.len() {
            if self.offset == self.current.len() {
                let Ok(next) = self.fragments.try_recv() else {
                    break;
                };
                let used = std::mem::replace(&mut self.current, next);
                self.offset = 0;
                // returned to the producer so the callback never frees memory
                let _ = self.recycle.try_send(used);
                continue;
            }

            let n = (self.current.len() - self.offset).min(data.len() - written);
            let src = &self.current[self.offset..self.offset + n];
            for (out, &value) in data[written..written + n].iter_mut().zip(src) {
                *out = T::from_sample_(value);
            }
            written += n;
            self.offset += n;
        }

        for out in &mut data[written..] {
            *out = T::from_sample_(0.0);
        }
    }
}

/// Open cpal output stream
pub struct CpalSink {
    format: SampleFormat,
    channels: usize,
    fragments: Sender<Vec<f32>>,
    recycled: Receiver<Vec<f32>>,
    failed: Arc<AtomicBool>,
    shutdown: Option<Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    fn open(device: Device, spec: &DeviceSpec) -> Result<Self> {
        let sample_format = stream_format(&device, spec)?;
        let config = StreamConfig {
            channels: spec.channels(),
            sample_rate: spec.rate,
            buffer_size: cpal::BufferSize::Default,
        };
        let name = device_name(&device).unwrap_or_else(|| "unknown".to_string());

        let (fragments, fragment_rx) = bounded::<Vec<f32>>(1);
        let (recycle_tx, recycled) = bounded::<Vec<f32>>(2);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (shutdown, shutdown_rx) = bounded::<()>(0);
        let failed = Arc::new(AtomicBool::new(false));

        let feed = Feed {
            fragments: fragment_rx,
            recycle: recycle_tx,
            current: Vec::new(),
            offset: 0,
        };
        let thread_failed = Arc::clone(&failed);
        let stream_thread = thread::Builder::new()
            .name("earmark-cpal".into())
            .spawn(move || {
                stream_thread_run(
                    &device,
                    &config,
                    sample_format,
                    feed,
                    thread_failed,
                    &ready_tx,
                    &shutdown_rx,
                );
            })
            .map_err(|e| DesktopError::Thread(e.to_string()))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(DesktopError::Thread("stream thread exited during setup".into())));
        if let Err(e) = ready {
            let _ = stream_thread.join();
            return Err(e);
        }

        info!(
            device = %name,
            rate = spec.rate,
            channels = spec.channels(),
            bits = spec.format.bits(),
            stream_format = ?sample_format,
            "Output device opened"
        );

        Ok(Self {
            format: spec.format,
            channels: usize::from(spec.channels()).max(1),
            fragments,
            recycled,
            failed,
            shutdown: Some(shutdown),
            stream_thread: Some(stream_thread),
        })
    }
}

/// Stream thread main
///
/// Builds and starts the stream, reports the outcome, then parks until the
/// sink drops its shutdown sender.
fn stream_thread_run(
    device: &Device,
    config: &StreamConfig,
    sample_format: cpal::SampleFormat,
    feed: Feed,
    failed: Arc<AtomicBool>,
    ready: &Sender<Result<()>>,
    shutdown: &Receiver<()>,
) {
    let stream = match build_stream(device, config, sample_format, feed, failed) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(e.into()));
        return;
    }
    let _ = ready.send(Ok(()));

    let _ = shutdown.recv();
    drop(stream);
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: cpal::SampleFormat,
    feed: Feed,
    failed: Arc<AtomicBool>,
) -> Result<Stream> {
    match sample_format {
        cpal::SampleFormat::I16 => build_typed::<i16>(device, config, feed, failed),
        cpal::SampleFormat::I32 => build_typed::<i32>(device, config, feed, failed),
        _ => build_typed::<f32>(device, config, feed, failed),
    }
}

fn build_typed<T>(
    device: &Device,
    config: &StreamConfig,
    mut feed: Feed,
    failed: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| feed.fill(data),
        move |err| {
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                error!("Output device disappeared: {}", err);
                failed.store(true, Ordering::Release);
            } else {
                warn!("Audio stream error: {}", err);
            }
        },
        None,
    )?;
    Ok(stream)
}

impl DeviceSink for CpalSink {
    fn play(&mut self, fragment: &[u8]) -> usize {
        if self.failed.load(Ordering::Acquire) {
            return 0;
        }

        let mut chunk = self.recycled.try_recv().unwrap_or_default();
        decode_fragment(fragment, self.format, &mut chunk);
        let frames = chunk.len() / self.channels;

        match self.fragments.send_timeout(chunk, DEVICE_TIMEOUT) {
            Ok(()) => frames,
            Err(SendTimeoutError::Timeout(_)) => {
                error!("Output device stopped consuming audio");
                0
            }
            Err(SendTimeoutError::Disconnected(_)) => 0,
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        // closing the channel releases the stream thread
        self.shutdown.take();
        if let Some(handle) = self.stream_thread.take() {
            if handle.join().is_err() {
                warn!("Audio stream thread panicked");
            }
        }
        debug!("Output device closed");
    }
}
