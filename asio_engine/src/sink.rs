//! The abstract interface through which a listener worker hands a completed
//! frame to the external host.

use crate::frame::OutputFrame;

/// Receives routed frames from exactly one listener's worker.
///
/// `emit` is only ever called from that listener's worker thread, never
/// from the device callback, so a blocking implementation only stalls its
/// own listener. Implementations must not retain `frame`'s channel
/// pointers past the call.
pub trait Sink: Send {
    fn emit(&mut self, frame: &OutputFrame<'_>);
}

/// A sink that records frame metadata without touching channel bytes.
/// Useful for tests and for the demo binary's dry-run mode.
#[derive(Default)]
pub struct CountingSink {
    pub frames_received: u64,
    pub last_timestamp_ns: Option<u64>,
}

impl Sink for CountingSink {
    fn emit(&mut self, frame: &OutputFrame<'_>) {
        self.frames_received += 1;
        self.last_timestamp_ns = Some(frame.timestamp_ns);
    }
}
