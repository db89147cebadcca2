/// Collaborator traits for Earmark
///
/// The playback engine talks to files, sound hardware and the keyboard only
/// through these traits, so it can be driven by in-memory doubles in tests.
use crate::error::Result;
use crate::types::{ChannelLayout, Key, Sample, SampleFormat};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Sample loader trait
///
/// Implementers decode a file into a `Float32` [`Sample`] carrying the
/// native depth and channel layout of the source.
pub trait SampleLoader {
    /// Load and fully decode `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded
    fn load(&self, path: &Path) -> Result<Sample>;
}

/// Requested output configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Sample rate in Hz
    pub rate: u32,
    /// Integer encoding of the fragments that will be written
    pub format: SampleFormat,
    /// Channel layout of the fragments
    pub layout: ChannelLayout,
}

impl DeviceSpec {
    /// Channel count
    pub fn channels(&self) -> u16 {
        self.layout.len() as u16
    }
}

/// Opens output devices
pub trait DeviceOpener {
    /// Open a sink for `spec`
    ///
    /// # Errors
    /// Returns an error if no device accepts the configuration; callers may
    /// retry with a different format.
    fn open(&self, spec: &DeviceSpec) -> Result<Box<dyn DeviceSink>>;
}

/// An open output device
///
/// Dropping the sink closes the device.
pub trait DeviceSink: Send {
    /// Write one fragment, blocking until the device has room for it
    ///
    /// Returns the number of frames accepted; zero means the device is gone.
    fn play(&mut self, fragment: &[u8]) -> usize;
}

/// Wakes a blocked [`InputSource::next_key`] call from another thread
#[derive(Clone)]
pub struct InputWaker(Arc<dyn Fn() + Send + Sync>);

impl InputWaker {
    /// Wrap a wake function
    pub fn new(wake: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(wake))
    }

    /// A waker that does nothing
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Wake the blocked reader
    pub fn wake(&self) {
        (self.0)();
    }
}

impl fmt::Debug for InputWaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputWaker").finish_non_exhaustive()
    }
}

/// Source of key presses
pub trait InputSource: Send {
    /// Block until a key arrives
    ///
    /// Returns `Ok(None)` when woken through the [`InputWaker`] without a key.
    ///
    /// # Errors
    /// Returns an error if the underlying input is no longer readable
    fn next_key(&mut self) -> Result<Option<Key>>;

    /// Handle that interrupts a blocked `next_key`
    fn waker(&self) -> InputWaker;
}
