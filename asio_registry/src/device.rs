//! Device enumeration and the stable index-based catalog it produces.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Host;

use asio_core::SampleFormat;

use crate::capabilities::{BufferSizeRange, DeviceCapabilities};
use crate::error::{RegistryError, Result};

/// Picks the preferred host for this platform: an ASIO host if the `cpal`
/// build exposes one, else the platform default. Mirrors this workspace's
/// existing JACK-preferred-else-default device selection pattern, just
/// targeting ASIO instead of JACK.
fn preferred_host() -> Host {
    #[cfg(target_os = "windows")]
    {
        if let Some(asio_host_id) = cpal::available_hosts()
            .into_iter()
            .find(|id| *id == cpal::HostId::Asio)
        {
            match cpal::host_from_id(asio_host_id) {
                Ok(host) => {
                    log::info!("using ASIO audio host");
                    return host;
                }
                Err(err) => log::warn!("ASIO host present but failed to open: {err}"),
            }
        }
        log::info!("ASIO host not available, falling back to the default host");
    }

    cpal::default_host()
}

/// Stable identity plus immutable capability view for one discovered device.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
    pub capabilities: DeviceCapabilities,
}

/// Enumerates input devices once at startup, producing a stable
/// index-ordered catalog. Re-enumeration (device arrival/removal) produces a
/// fresh snapshot via [`Registry::refresh`]; it never mutates in place.
pub struct Registry {
    host: Host,
    devices: Vec<DeviceDescriptor>,
}

impl Registry {
    /// Enumerates all input devices on the preferred host.
    pub fn enumerate() -> Result<Registry> {
        let host = preferred_host();
        let devices = collect_devices(&host)?;
        Ok(Registry { host, devices })
    }

    /// Number of devices in the current snapshot.
    pub fn count(&self) -> usize {
        self.devices.len()
    }

    /// Descriptor for device `index`, or `DeviceNotFound`.
    pub fn info(&self, index: usize) -> Result<&DeviceDescriptor> {
        self.devices.get(index).ok_or(RegistryError::DeviceNotFound(index))
    }

    /// Capabilities for device `index`, or `DeviceNotFound`.
    pub fn capabilities(&self, index: usize) -> Result<&DeviceCapabilities> {
        Ok(&self.info(index)?.capabilities)
    }

    /// Looks up a device by name, returning its stable index.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.name == name)
    }

    /// All current descriptors, in index order.
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Resolves the live `cpal::Device` backing descriptor `index`. Used by
    /// the device session when opening a stream.
    pub fn open_cpal_device(&self, index: usize) -> Result<cpal::Device> {
        let name = &self.info(index)?.name;
        self.host
            .input_devices()
            .map_err(|e| RegistryError::EnumerationFailed(e.to_string()))?
            .find(|d| d.name().ok().as_deref() == Some(name.as_str()))
            .ok_or_else(|| RegistryError::DeviceNameNotFound(name.clone()))
    }

    /// Re-enumerates the host's device list into a fresh snapshot. Existing
    /// indices are not guaranteed stable across a refresh; callers migrate
    /// sessions by name match (the Control surface's responsibility).
    pub fn refresh(&mut self) -> Result<()> {
        self.devices = collect_devices(&self.host)?;
        Ok(())
    }
}

fn collect_devices(host: &Host) -> Result<Vec<DeviceDescriptor>> {
    let devices: Vec<DeviceDescriptor> = host
        .input_devices()
        .map_err(|e| RegistryError::EnumerationFailed(e.to_string()))?
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device.name().ok()?;
            let capabilities = device_capabilities(&device)?;
            Some(DeviceDescriptor { index, name, capabilities })
        })
        .collect();

    if devices.is_empty() {
        return Err(RegistryError::NoDevices);
    }

    log::info!("discovered {} input device(s)", devices.len());
    Ok(devices)
}

fn device_capabilities(device: &cpal::Device) -> Option<DeviceCapabilities> {
    let configs: Vec<_> = device.supported_input_configs().ok()?.collect();
    if configs.is_empty() {
        return None;
    }

    let mut sample_rates = Vec::new();
    let mut min_buffer = u32::MAX;
    let mut max_buffer = 0u32;
    let mut sample_formats = Vec::new();
    let mut input_channel_count = 0usize;

    for config in &configs {
        input_channel_count = input_channel_count.max(config.channels() as usize);

        for rate in [44_100, 48_000, 88_200, 96_000, 176_400, 192_000] {
            if rate >= config.min_sample_rate().0 && rate <= config.max_sample_rate().0 && !sample_rates.contains(&rate)
            {
                sample_rates.push(rate);
            }
        }

        match config.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => {
                min_buffer = min_buffer.min(*min);
                max_buffer = max_buffer.max(*max);
            }
            cpal::SupportedBufferSize::Unknown => {
                min_buffer = min_buffer.min(64);
                max_buffer = max_buffer.max(4096);
            }
        }

        let format = match config.sample_format() {
            cpal::SampleFormat::U8 => Some(SampleFormat::U8Planar),
            cpal::SampleFormat::I16 => Some(SampleFormat::S16Planar),
            cpal::SampleFormat::I32 => Some(SampleFormat::S32Planar),
            cpal::SampleFormat::F32 => Some(SampleFormat::F32Planar),
            _ => None,
        };
        if let Some(format) = format {
            if !sample_formats.contains(&format) {
                sample_formats.push(format);
            }
        }
    }

    sample_rates.sort_unstable();
    if min_buffer > max_buffer {
        min_buffer = max_buffer;
    }

    let input_channel_names = (0..input_channel_count).map(|i| format!("Input {}", i + 1)).collect();

    Some(DeviceCapabilities {
        sample_rates,
        buffer_sizes: BufferSizeRange::from_granularity(min_buffer, max_buffer, -1),
        sample_formats,
        input_channel_count,
        output_channel_count: 0,
        input_channel_names,
    })
}
