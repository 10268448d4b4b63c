//! One capture source: a routing table, a device reference, and a worker
//! thread that drains the device's ring buffer from its own cursor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use asio_core::{RingBuffer, StackVec};
use asio_registry::SpeakerLayout;

use crate::frame::OutputFrame;
use crate::routing::{RoutingHandle, RoutingTable, MAX_OUTPUT_CHANNELS};
use crate::sink::Sink;

/// Minimum wait-with-timeout period, so a flood of coalesced write signals
/// never starves a listener waiting on its own turn.
const MIN_WAIT: Duration = Duration::from_millis(1);

fn wait_period(buffer_size: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return MIN_WAIT;
    }
    let period = Duration::from_secs_f64(buffer_size as f64 / sample_rate as f64 / 2.0);
    period.max(MIN_WAIT)
}

/// A listener's worker loop, run on its own thread. Drains the ring from
/// `read_seq`, applies routing, and emits frames until `active` clears.
struct Worker<S: Sink> {
    ring: RingBuffer,
    routing: RoutingHandle,
    output_layout: Arc<std::sync::Mutex<SpeakerLayout>>,
    sink: S,
    read_seq: u64,
    silence: Vec<u8>,
    overrun_count: u64,
}

impl<S: Sink> Worker<S> {
    fn run(mut self, active: Arc<AtomicBool>, wait_period: Duration) {
        while active.load(Ordering::Acquire) {
            self.ring.wait_for_write(wait_period);
            self.drain();
        }
    }

    fn drain(&mut self) {
        let write_seq = self.ring.current_write_seq();
        let slot_count = self.ring.slot_count() as u64;

        while self.read_seq < write_seq {
            if write_seq - self.read_seq > slot_count {
                self.overrun_count += write_seq - self.read_seq - slot_count + 1;
                self.read_seq = write_seq - slot_count + 1;
            }

            let Ok(slot) = self.ring.read_at(self.read_seq) else {
                self.read_seq += 1;
                continue;
            };

            let routing = self.routing.snapshot();
            let layout = *self.output_layout.lock().expect("output layout mutex poisoned");
            let output_count = routing.output_channel_count().min(layout.channel_count());

            let bytes_per_sample = slot.sample_format.bytes_per_sample();
            let needed = slot.frames * bytes_per_sample;
            if self.silence.len() < needed {
                self.silence.resize(needed, 0);
            }

            let mut channels: StackVec<&[u8], MAX_OUTPUT_CHANNELS> = StackVec::new();
            let mut any_unmuted = false;
            for output_channel in 0..output_count {
                let bytes = match routing.route_for(output_channel) {
                    Some(device_channel) if device_channel < slot.channel_count => {
                        any_unmuted = true;
                        slot.channel(device_channel)
                    }
                    _ => &self.silence[..needed],
                };
                let _ = channels.push(bytes);
            }

            if any_unmuted && output_count > 0 {
                let frame = OutputFrame::new(
                    slot.sample_format,
                    slot.frames,
                    slot.sample_rate,
                    slot.timestamp_ns,
                    layout,
                    channels,
                );
                self.sink.emit(&frame);
            }

            self.read_seq += 1;
        }
    }
}

/// Handle to a running listener. Dropping it without calling `detach` leaks
/// the worker thread; callers should always `detach` or `destroy`.
pub struct Listener {
    active: Arc<AtomicBool>,
    routing: RoutingHandle,
    output_layout: Arc<std::sync::Mutex<SpeakerLayout>>,
    worker_handle: Option<JoinHandle<()>>,
}

impl Listener {
    /// Spawns the worker for a listener attaching to `ring`, with `sink`
    /// receiving its routed frames. `read_seq` starts at the ring's current
    /// `write_seq`, so this listener only observes future frames.
    pub fn attach<S: Sink + 'static>(
        ring: RingBuffer,
        sink: S,
        initial_layout: SpeakerLayout,
        buffer_size: usize,
        sample_rate: u32,
    ) -> Self {
        let read_seq = ring.current_write_seq();
        let routing = RoutingHandle::new(RoutingTable::muted(initial_layout.channel_count()));
        let output_layout = Arc::new(std::sync::Mutex::new(initial_layout));
        let active = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            ring,
            routing: routing.clone(),
            output_layout: Arc::clone(&output_layout),
            sink,
            read_seq,
            silence: Vec::new(),
            overrun_count: 0,
        };

        let active_for_worker = Arc::clone(&active);
        let period = wait_period(buffer_size, sample_rate);
        let worker_handle = std::thread::Builder::new()
            .name("asio-listener".into())
            .spawn(move || worker.run(active_for_worker, period))
            .expect("failed to spawn listener worker thread");

        Listener { active, routing, output_layout, worker_handle: Some(worker_handle) }
    }

    /// Atomically replaces the routing table.
    pub fn set_routing(&self, table: RoutingTable) {
        self.routing.replace(table);
    }

    /// Replaces the output speaker layout, restricting routing reads to its
    /// channel count.
    pub fn set_output_layout(&self, layout: SpeakerLayout) {
        *self.output_layout.lock().expect("output layout mutex poisoned") = layout;
    }

    /// Signals the worker to exit and joins it. Returns only after the
    /// worker has exited; no further sink emission can occur after this
    /// returns.
    pub fn detach(mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
