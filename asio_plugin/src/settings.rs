//! The settings schema a host passes to [`crate::plugin::SourcePlugin`].
//!
//! Mirrors the key/value property bag a host typically hands a source
//! plugin (OBS's `obs_data_t` is the model): a flat JSON map with both
//! fixed keys (`device_id`, `sample_rate`, ...) and a dynamic family of
//! `route N` keys, one per output channel.

use std::collections::BTreeMap;

use asio_engine::{RoutingTable, MAX_OUTPUT_CHANNELS, MUTE};
use asio_registry::SpeakerLayout;
use asio_session::SessionParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PluginError, Result};

fn route_key(output_channel: usize) -> String {
    format!("route {output_channel}")
}

/// Flat property bag, serializable to/from the host's JSON settings blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Settings(BTreeMap::new())
    }

    pub fn device_id(&self) -> Option<&str> {
        self.0.get("device_id").and_then(Value::as_str)
    }

    pub fn set_device_id(&mut self, device_id: impl Into<String>) {
        self.0.insert("device_id".into(), Value::String(device_id.into()));
    }

    pub fn speaker_layout(&self) -> Result<SpeakerLayout> {
        let raw = self.0.get("speaker_layout").and_then(Value::as_u64).unwrap_or(2) as u8;
        SpeakerLayout::try_from(raw).map_err(|_| PluginError::InvalidSpeakerLayout(raw))
    }

    pub fn set_speaker_layout(&mut self, layout: SpeakerLayout) {
        self.0.insert("speaker_layout".into(), Value::from(layout_tag(layout)));
    }

    pub fn route(&self, output_channel: usize) -> i32 {
        self.0
            .get(&route_key(output_channel))
            .and_then(Value::as_i64)
            .map(|v| v as i32)
            .unwrap_or(MUTE)
    }

    pub fn set_route(&mut self, output_channel: usize, device_channel: i32) {
        self.0.insert(route_key(output_channel), Value::from(device_channel));
    }

    pub fn sample_rate(&self) -> u32 {
        self.0.get("sample_rate").and_then(Value::as_u64).unwrap_or(48_000) as u32
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.0.insert("sample_rate".into(), Value::from(sample_rate));
    }

    pub fn buffer_size(&self) -> u32 {
        self.0.get("buffer_size").and_then(Value::as_u64).unwrap_or(512) as u32
    }

    pub fn set_buffer_size(&mut self, buffer_size: u32) {
        self.0.insert("buffer_size".into(), Value::from(buffer_size));
    }

    pub fn sample_format(&self) -> Result<asio_core::SampleFormat> {
        match self.0.get("audio_format").and_then(Value::as_str) {
            Some("u8") => Ok(asio_core::SampleFormat::U8Planar),
            Some("s16") | None => Ok(asio_core::SampleFormat::S16Planar),
            Some("s32") => Ok(asio_core::SampleFormat::S32Planar),
            Some("f32") => Ok(asio_core::SampleFormat::F32Planar),
            Some(other) => Err(PluginError::Settings(format!("unknown audio_format {other}"))),
        }
    }

    pub fn set_sample_format(&mut self, format: asio_core::SampleFormat) {
        let tag = match format {
            asio_core::SampleFormat::U8Planar => "u8",
            asio_core::SampleFormat::S16Planar => "s16",
            asio_core::SampleFormat::S32Planar => "s32",
            asio_core::SampleFormat::F32Planar => "f32",
        };
        self.0.insert("audio_format".into(), Value::from(tag));
    }

    /// Builds the session parameters this settings blob describes.
    ///
    /// `input_channel_count` is the selected device's input channel count
    /// (from its `DeviceCapabilities`), not this settings blob's speaker
    /// layout: the session opens every device input so any listener's
    /// routing table can reach any device channel, independent of how many
    /// output channels that listener happens to emit.
    pub fn to_session_params(&self, input_channel_count: usize) -> Result<SessionParams> {
        Ok(SessionParams {
            sample_rate: self.sample_rate(),
            buffer_size: self.buffer_size(),
            sample_format: self.sample_format()?,
            active_input_channels: input_channel_count,
        })
    }

    /// Builds the routing table this settings blob describes, one entry
    /// per output channel up to the selected speaker layout.
    pub fn to_routing_table(&self) -> Result<RoutingTable> {
        let channel_count = self.speaker_layout()?.channel_count() as usize;
        let mut table = RoutingTable::muted(channel_count.min(MAX_OUTPUT_CHANNELS));
        for output_channel in 0..channel_count.min(MAX_OUTPUT_CHANNELS) {
            table.set_route(output_channel, self.route(output_channel));
        }
        Ok(table)
    }

    /// Default settings for a newly created source, mirroring
    /// `SourcePlugin::get_defaults`.
    pub fn defaults() -> Self {
        let mut settings = Settings::new();
        settings.set_speaker_layout(SpeakerLayout::Stereo);
        settings.set_sample_rate(48_000);
        settings.set_buffer_size(512);
        settings.set_sample_format(asio_core::SampleFormat::S32Planar);
        settings.set_route(0, 0);
        settings.set_route(1, 1);
        settings
    }
}

fn layout_tag(layout: SpeakerLayout) -> u64 {
    match layout {
        SpeakerLayout::Mono => 1,
        SpeakerLayout::Stereo => 2,
        SpeakerLayout::TwoPointOne => 3,
        SpeakerLayout::FourPointZero => 4,
        SpeakerLayout::FourPointOne => 5,
        SpeakerLayout::FivePointOne => 6,
        SpeakerLayout::SevenPointOne => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let settings = Settings::defaults();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn unset_route_is_mute() {
        let settings = Settings::new();
        assert_eq!(settings.route(3), MUTE);
    }

    #[test]
    fn speaker_layout_rejects_seven() {
        let mut settings = Settings::new();
        settings.0.insert("speaker_layout".into(), Value::from(7));
        assert!(matches!(settings.speaker_layout(), Err(PluginError::InvalidSpeakerLayout(7))));
    }

    #[test]
    fn to_routing_table_reflects_route_keys() {
        let mut settings = Settings::defaults();
        settings.set_route(0, 5);
        let table = settings.to_routing_table().unwrap();
        assert_eq!(table.route_for(0), Some(5));
    }

    #[test]
    fn to_session_params_uses_device_input_count_not_layout() {
        let mut settings = Settings::defaults();
        settings.set_speaker_layout(SpeakerLayout::Stereo);
        let params = settings.to_session_params(8).unwrap();
        assert_eq!(params.active_input_channels, 8);
    }
}
