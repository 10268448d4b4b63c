//! Error type for the device session state machine.

/// Result type alias for `asio_session` operations.
pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("device rejected stream parameters: {0}")]
    StartFailed(String),

    #[error("session is not in a state that allows this transition (currently {0:?})")]
    InvalidTransition(SessionState),

    #[error("failed to allocate session resources: {0}")]
    AllocationFailure(String),

    #[error("device capability error: {0}")]
    Capability(#[from] asio_registry::RegistryError),

    #[error("cpal build-stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("cpal play-stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("cpal pause-stream error: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),
}

use crate::session::SessionState;
