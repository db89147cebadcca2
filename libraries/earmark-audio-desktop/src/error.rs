/// Desktop collaborator errors
use earmark_core::EarmarkError;
use thiserror::Error;

/// Result type for desktop operations
pub type Result<T> = std::result::Result<T, DesktopError>;

/// Desktop errors
#[derive(Debug, Error)]
pub enum DesktopError {
    /// The host has no output devices at all
    #[error("No audio output devices found")]
    NoDevice,

    /// No device matched the selector
    #[error("Audio device '{0}' not found")]
    DeviceNotFound(String),

    /// Device list could not be read
    #[error("Failed to enumerate audio devices: {0}")]
    Enumeration(String),

    /// The device cannot play the requested rate, channel count or depth
    #[error("Unsupported output configuration: {0}")]
    UnsupportedConfig(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    /// Failed to start stream
    #[error("Failed to play stream: {0}")]
    Play(String),

    /// Stream thread could not be started or died during setup
    #[error("Audio thread error: {0}")]
    Thread(String),

    /// Standard input is not a usable terminal
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// I/O errors from the terminal or the wake pipe
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<cpal::BuildStreamError> for DesktopError {
    fn from(err: cpal::BuildStreamError) -> Self {
        DesktopError::StreamBuild(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for DesktopError {
    fn from(err: cpal::PlayStreamError) -> Self {
        DesktopError::Play(err.to_string())
    }
}

impl From<cpal::DevicesError> for DesktopError {
    fn from(err: cpal::DevicesError) -> Self {
        DesktopError::Enumeration(err.to_string())
    }
}

impl From<cpal::SupportedStreamConfigsError> for DesktopError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        DesktopError::UnsupportedConfig(err.to_string())
    }
}

impl From<DesktopError> for EarmarkError {
    fn from(err: DesktopError) -> Self {
        match err {
            DesktopError::Terminal(msg) => EarmarkError::Terminal(msg),
            DesktopError::Io(e) => EarmarkError::Terminal(e.to_string()),
            DesktopError::Thread(msg) => EarmarkError::ThreadSpawn(msg),
            other => EarmarkError::DeviceOpen(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_exit_as_device_failures() {
        let err: EarmarkError = DesktopError::DeviceNotFound("usb".into()).into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("usb"));

        let err: EarmarkError = DesktopError::UnsupportedConfig("24-bit".into()).into();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn terminal_errors_exit_as_usage_failures() {
        let err: EarmarkError = DesktopError::Terminal("not a tty".into()).into();
        assert_eq!(err.exit_code(), 1);

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: EarmarkError = DesktopError::from(io).into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn stream_thread_failure_is_a_spawn_error() {
        let err: EarmarkError = DesktopError::Thread("output".into()).into();
        assert_eq!(err.exit_code(), 7);
    }
}
