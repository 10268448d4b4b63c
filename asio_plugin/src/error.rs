//! Error kinds raised by the Control surface and reported up to the host.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device is busy")]
    DeviceBusy,

    #[error("no source attached under this handle")]
    UnknownTask,

    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(asio_core::SampleFormat),

    #[error("unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("unsupported buffer size: {0} frames")]
    UnsupportedBufferSize(u32),

    #[error("invalid speaker layout value: {0}")]
    InvalidSpeakerLayout(u8),

    #[error(transparent)]
    Registry(#[from] asio_registry::RegistryError),

    #[error(transparent)]
    Session(#[from] asio_session::SessionError),

    #[error("malformed settings: {0}")]
    Settings(String),
}
