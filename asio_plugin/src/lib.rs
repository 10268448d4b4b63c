//! # ASIO Plugin
//!
//! The Control surface, settings schema, property tree, persisted-state
//! document, and host-facing plugin trait sitting on top of
//! `asio_registry`, `asio_session`, and `asio_engine`.

pub mod control;
pub mod error;
pub mod persisted;
pub mod plugin;
pub mod properties;
pub mod settings;

pub use control::Control;
pub use error::{PluginError, Result};
pub use persisted::{DeviceSettings, PersistedState};
pub use plugin::{AsioInputSource, SourceHandle, SourcePlugin};
pub use properties::{DeviceOption, PropertyTree, RouteOption};
pub use settings::Settings;
