//! The property tree presented to the host's settings UI: what choices are
//! available, populated from the live device registry rather than the
//! settings a source currently holds.

use asio_registry::Registry;
use serde::Serialize;

/// One selectable device, by stable registry index.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceOption {
    pub index: usize,
    pub name: String,
}

/// One selectable routing target for an output channel: either a device
/// input channel, by name, or the mute sentinel.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteOption {
    pub device_channel: i32,
    pub label: String,
}

/// The full property tree for a single source instance.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PropertyTree {
    pub devices: Vec<DeviceOption>,
    pub speaker_layouts: Vec<(u8, &'static str)>,
    pub routes: Vec<Vec<RouteOption>>,
    pub has_control_panel_button: bool,
    pub has_about_button: bool,
}

const SPEAKER_LAYOUTS: &[(u8, &str)] =
    &[(1, "Mono"), (2, "Stereo"), (3, "2.1"), (4, "4.0"), (5, "4.1"), (6, "5.1"), (8, "7.1")];

impl PropertyTree {
    /// Builds the property tree for the device currently selected in
    /// `settings`, listing every registered device and, for the selected
    /// one, a mute option plus one route option per input channel.
    pub fn build(registry: &Registry, selected_device: Option<&str>) -> Self {
        let devices = registry
            .devices()
            .iter()
            .map(|d| DeviceOption { index: d.index, name: d.name.clone() })
            .collect();

        let routes = match selected_device.and_then(|name| registry.find_by_name(name)) {
            Some(index) => {
                let names = &registry.devices()[index].capabilities.input_channel_names;
                let mut options = vec![RouteOption { device_channel: -1, label: "Mute".into() }];
                options.extend(
                    names.iter().enumerate().map(|(i, name)| RouteOption { device_channel: i as i32, label: name.clone() }),
                );
                vec![options; 8]
            }
            None => Vec::new(),
        };

        PropertyTree {
            devices,
            speaker_layouts: SPEAKER_LAYOUTS.to_vec(),
            routes,
            has_control_panel_button: true,
            has_about_button: true,
        }
    }
}
