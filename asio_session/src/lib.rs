//! # ASIO Session
//!
//! The device session state machine and the real-time capture callback it
//! installs on a `cpal` input stream.

pub mod callback;
pub mod error;
pub mod params;
pub mod session;

pub use error::{Result, SessionError};
pub use params::SessionParams;
pub use session::{Session, SessionState};
