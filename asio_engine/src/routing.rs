//! Per-listener output routing: which device input channel (or silence)
//! feeds each output channel.

use std::sync::{Arc, Mutex};

use asio_core::StackVec;

/// Sentinel routing-table entry meaning "emit silence on this channel".
pub const MUTE: i32 = -1;

/// Maximum output channels any speaker layout in this pipeline declares
/// (7.1 surround).
pub const MAX_OUTPUT_CHANNELS: usize = 8;

/// Fixed-size output-channel → device-input-channel map. Index `o` holds
/// either a non-negative device input channel number or [`MUTE`].
#[derive(Debug, Clone)]
pub struct RoutingTable {
    entries: StackVec<i32, MAX_OUTPUT_CHANNELS>,
}

impl RoutingTable {
    /// A table routing every output channel to [`MUTE`].
    pub fn muted(output_channel_count: usize) -> Self {
        let mut entries = StackVec::new();
        for _ in 0..output_channel_count.min(MAX_OUTPUT_CHANNELS) {
            entries.push(MUTE).expect("output_channel_count bounded by MAX_OUTPUT_CHANNELS");
        }
        RoutingTable { entries }
    }

    pub fn output_channel_count(&self) -> usize {
        self.entries.len()
    }

    /// The device input channel routed to output `o`, or `None` for mute /
    /// out-of-range `o`.
    pub fn route_for(&self, output_channel: usize) -> Option<usize> {
        let entry = *self.entries.get(output_channel)?;
        if entry < 0 { None } else { Some(entry as usize) }
    }

    /// Sets output channel `o`'s route. `channel` is a non-negative device
    /// input channel index, or [`MUTE`].
    pub fn set_route(&mut self, output_channel: usize, channel: i32) {
        if let Some(slot) = self.entries.get_mut(output_channel) {
            *slot = channel;
        }
    }
}

/// Shared, swappable handle to a listener's current routing table.
///
/// The listener worker clones the inner `Arc` under a brief lock once per
/// slice (the local snapshot the concurrency model calls for); the control
/// path replaces the whole table atomically under the same lock.
#[derive(Clone)]
pub struct RoutingHandle {
    inner: Arc<Mutex<Arc<RoutingTable>>>,
}

impl RoutingHandle {
    pub fn new(table: RoutingTable) -> Self {
        RoutingHandle { inner: Arc::new(Mutex::new(Arc::new(table))) }
    }

    /// A cheap snapshot of the current table, safe to hold for the duration
    /// of one worker slice.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        Arc::clone(&self.inner.lock().expect("routing mutex poisoned"))
    }

    /// Atomically replaces the table.
    pub fn replace(&self, table: RoutingTable) {
        *self.inner.lock().expect("routing mutex poisoned") = Arc::new(table);
    }
}
