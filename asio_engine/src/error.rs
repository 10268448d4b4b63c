//! Error type for listener/scheduler operations.

/// Result type alias for `asio_engine` operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("listener is not attached to a device")]
    NotAttached,

    #[error("device session error: {0}")]
    Session(#[from] asio_session::SessionError),

    #[error("device registry error: {0}")]
    Registry(#[from] asio_registry::RegistryError),
}
