//! Error type for device discovery and capability queries.

/// Result type alias for `asio_registry` operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no device at index {0}")]
    DeviceNotFound(usize),

    #[error("no device named {0:?}")]
    DeviceNameNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    EnumerationFailed(String),

    #[error("no input devices available")]
    NoDevices,
}
