//! The persisted-state document shape: one entry per known device, carrying
//! the session parameters to restore on next launch. This crate only
//! (de)serializes the document in memory; writing it to a configuration
//! file on disk is the host's responsibility.

use serde::{Deserialize, Serialize};

/// One device's last-known session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSettings {
    pub device_id: String,
    pub buffer_size: u32,
    pub sample_rate: u32,
    pub audio_format: String,
    #[serde(rename = "_device_active")]
    pub device_active: bool,
}

/// The full persisted document: one [`DeviceSettings`] per device the host
/// has ever seen. Per-source routing travels with the host's own source
/// settings blob, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub asio_device_settings: Vec<DeviceSettings>,
}

impl PersistedState {
    pub fn new() -> Self {
        PersistedState::default()
    }

    pub fn find(&self, device_id: &str) -> Option<&DeviceSettings> {
        self.asio_device_settings.iter().find(|d| d.device_id == device_id)
    }

    /// Inserts or updates the entry for `device_id`.
    pub fn upsert(&mut self, settings: DeviceSettings) {
        match self.asio_device_settings.iter_mut().find(|d| d.device_id == settings.device_id) {
            Some(existing) => *existing = settings,
            None => self.asio_device_settings.push(settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(device_id: &str) -> DeviceSettings {
        DeviceSettings {
            device_id: device_id.into(),
            buffer_size: 512,
            sample_rate: 48_000,
            audio_format: "f32".into(),
            device_active: true,
        }
    }

    #[test]
    fn upsert_inserts_new_device() {
        let mut state = PersistedState::new();
        state.upsert(sample("Focusrite"));
        assert_eq!(state.asio_device_settings.len(), 1);
    }

    #[test]
    fn upsert_replaces_existing_device_by_id() {
        let mut state = PersistedState::new();
        state.upsert(sample("Focusrite"));
        let mut updated = sample("Focusrite");
        updated.sample_rate = 96_000;
        state.upsert(updated);

        assert_eq!(state.asio_device_settings.len(), 1);
        assert_eq!(state.find("Focusrite").unwrap().sample_rate, 96_000);
    }

    #[test]
    fn find_is_none_for_unknown_device() {
        let state = PersistedState::new();
        assert!(state.find("nope").is_none());
    }

    #[test]
    fn round_trips_through_json_with_the_documented_shape() {
        let mut state = PersistedState::new();
        state.upsert(sample("Focusrite"));
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["asio_device_settings"][0]["_device_active"].as_bool().unwrap());
    }
}
