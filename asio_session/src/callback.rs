//! The real-time capture callback installed on the `cpal` input stream.
//!
//! Must not allocate, lock, or block: every byte it touches was reserved by
//! [`crate::session::Session::prepare`] ahead of time, and the only shared
//! state it writes is the ring buffer's `write_seq`, published with a single
//! release store.

use asio_core::{RingBuffer, format::deinterleave};

/// Reinterprets a native sample slice as raw bytes. No value conversion
/// happens here or anywhere else in the callback; this is the same
/// byte-width-only reinterpretation `asio_core::format` documents for
/// `deinterleave`.
///
/// # Safety
/// `T` must be one of the primitive sample types `cpal` hands the callback
/// (`u8`, `i16`, `i32`, `f32`), all of which have no padding and are valid
/// for any bit pattern.
unsafe fn as_bytes<T: Copy>(data: &[T]) -> &[u8] {
    let byte_len = std::mem::size_of_val(data);
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, byte_len) }
}

/// Per-invocation counters the callback updates locally; the control path
/// reads them only while the session is stopped.
#[derive(Debug, Default)]
pub struct CallbackStats {
    pub frames_written: u64,
    pub overflow_count: u64,
}

/// State closed over by the capture callback for one open stream.
pub struct CaptureState {
    pub ring: RingBuffer,
    pub channel_count: usize,
    pub bytes_per_sample: usize,
    pub buffer_size: usize,
    pub sample_rate: u32,
    pub stats: CallbackStats,
}

impl CaptureState {
    /// Deinterleaves `data` into the next ring slot and publishes it.
    ///
    /// `data` must hold exactly `buffer_size * channel_count` samples; a
    /// driver delivering a different frame count is treated as a callback
    /// overflow and the frame is dropped (counted, never propagated).
    ///
    /// The timestamp is derived from the callback's running frame count
    /// rather than the driver-reported stream timestamp, keeping it exactly
    /// reproducible across listeners.
    pub fn on_data<T: Copy>(&mut self, data: &[T]) {
        let expected_len = self.buffer_size * self.channel_count;
        if data.len() != expected_len {
            self.stats.overflow_count += 1;
            return;
        }

        // SAFETY: T is one of cpal's primitive sample types (see `as_bytes`).
        let bytes = unsafe { as_bytes(data) };

        let slot = self.ring.begin_write();
        slot.frames = self.buffer_size;
        slot.channel_count = self.channel_count;
        slot.sample_rate = self.sample_rate;
        slot.timestamp_ns = self.stats.frames_written * 1_000_000_000 / self.sample_rate as u64;

        deinterleave(
            bytes,
            self.bytes_per_sample,
            self.channel_count,
            self.buffer_size,
            slot.channels_mut(),
        );

        self.ring.commit_write();
        self.stats.frames_written += self.buffer_size as u64;
    }
}
