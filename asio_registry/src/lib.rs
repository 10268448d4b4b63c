//! # ASIO Registry
//!
//! Device discovery: enumerates input devices once at startup via `cpal`,
//! preferring an ASIO host when one is present, and exposes a stable
//! index-based catalog with capability queries.

pub mod capabilities;
pub mod device;
pub mod error;

pub use capabilities::{BufferSizeGranularity, BufferSizeRange, DeviceCapabilities, SpeakerLayout};
pub use device::{DeviceDescriptor, Registry};
pub use error::{RegistryError, Result};
