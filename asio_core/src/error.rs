//! Shared error type for the foundational primitives in this crate.

/// Result type alias for `asio_core` operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the core primitives (ring buffer, format helpers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A reader's cursor fell more than the ring's slot count behind the writer.
    #[error("reader overran the ring buffer")]
    Overrun,

    /// A reader asked for a sequence number that has not been committed yet.
    #[error("requested sequence has not been written yet")]
    NotYetWritten,

    /// A channel index was out of range for the slot's channel count.
    #[error("channel index {0} out of range")]
    ChannelOutOfRange(usize),
}
