//! The host-facing plugin surface: a pure Rust trait standing in for the
//! lifecycle hooks a host's C ABI module would otherwise call directly.
//! Registering that ABI shim with a compositor is the host's job and is
//! out of scope here; this crate only specifies the Rust-level boundary.

use asio_engine::{Sink, TaskId};

use crate::control::Control;
use crate::error::Result;
use crate::properties::PropertyTree;
use crate::settings::Settings;

/// Lifecycle hooks a host calls to drive one source instance.
pub trait SourcePlugin {
    type Handle;

    fn create(&self, settings: &Settings) -> Result<Self::Handle>;
    fn destroy(&self, handle: Self::Handle) -> Result<()>;
    fn update(&self, handle: &Self::Handle, settings: &Settings) -> Result<()>;
    fn get_defaults(&self) -> Settings;
    fn get_properties(&self, handle: &Self::Handle) -> PropertyTree;
    fn get_name(&self) -> &'static str;
}

/// Opaque handle to one running source instance.
pub struct SourceHandle {
    task_id: TaskId,
    device_id: String,
}

/// The ASIO fanout source: one [`SourcePlugin`] implementation shared by
/// every source instance a host creates, backed by a single [`Control`]
/// surface.
pub struct AsioInputSource<S: Sink + Clone + 'static> {
    control: Control,
    sink_factory: Box<dyn Fn() -> S + Send + Sync>,
}

impl<S: Sink + Clone + 'static> AsioInputSource<S> {
    pub fn new(sink_factory: impl Fn() -> S + Send + Sync + 'static) -> Result<Self> {
        Ok(AsioInputSource { control: Control::new()?, sink_factory: Box::new(sink_factory) })
    }
}

impl<S: Sink + Clone + 'static> SourcePlugin for AsioInputSource<S> {
    type Handle = SourceHandle;

    fn create(&self, settings: &Settings) -> Result<Self::Handle> {
        let device_id = settings.device_id().unwrap_or_default().to_string();
        let sink = (self.sink_factory)();
        let task_id = self.control.attach_source(settings, sink)?;
        log::info!("asio source created for device {device_id}");
        Ok(SourceHandle { task_id, device_id })
    }

    fn destroy(&self, handle: Self::Handle) -> Result<()> {
        self.control.detach_source(handle.task_id)?;
        log::info!("asio source destroyed for device {}", handle.device_id);
        Ok(())
    }

    fn update(&self, handle: &Self::Handle, settings: &Settings) -> Result<()> {
        self.control.update_source(handle.task_id, settings, (self.sink_factory)())
    }

    fn get_defaults(&self) -> Settings {
        Settings::defaults()
    }

    fn get_properties(&self, handle: &Self::Handle) -> PropertyTree {
        self.control.with_registry(|registry| PropertyTree::build(registry, Some(&handle.device_id)))
    }

    fn get_name(&self) -> &'static str {
        "ASIO Audio Input"
    }
}
