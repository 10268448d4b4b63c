//! # ASIO Core
//!
//! Foundational, dependency-light primitives shared by every crate in the
//! device-fanout capture pipeline: the lock-free single-writer/multi-reader
//! ring buffer, the planar sample format tags, and a stack-allocated
//! fixed-capacity vector used for per-listener bookkeeping on the hot path.

pub mod error;
pub mod format;
pub mod ring;
pub mod stack_vec;

pub use error::{CoreError, Result};
pub use format::SampleFormat;
pub use ring::{RingBuffer, RingError, Slot};
pub use stack_vec::StackVec;
