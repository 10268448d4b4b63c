//! # ASIO Engine
//!
//! Listener workers, the scheduler that registers them, and the sink trait
//! through which they hand routed frames to the host.

pub mod error;
pub mod frame;
pub mod listener;
pub mod routing;
pub mod scheduler;
pub mod sink;

pub use error::{EngineError, Result};
pub use frame::OutputFrame;
pub use listener::Listener;
pub use routing::{RoutingHandle, RoutingTable, MAX_OUTPUT_CHANNELS, MUTE};
pub use scheduler::{Scheduler, TaskId};
pub use sink::{CountingSink, Sink};
