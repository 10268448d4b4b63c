//! Lock-free single-writer / multi-reader ring buffer for captured audio.
//!
//! The device callback is the sole writer; any number of listener workers
//! read concurrently, each tracking its own cursor. Publication uses
//! release/acquire ordering on `write_seq`, the same discipline this
//! workspace's SPSC ring buffer uses for its head/tail pair, generalized to
//! many independent readers instead of one.

use std::{
    cell::UnsafeCell,
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::format::SampleFormat;

pub use crate::error::CoreError as RingError;

/// Cache-line padded wrapper to prevent false sharing between the writer's
/// `write_seq` and whatever a reader stores alongside its handle.
#[repr(align(64))]
struct CachePadded<T>(T);

impl<T> std::ops::Deref for CachePadded<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

/// One entry in the ring: one callback's worth of planar PCM plus metadata.
///
/// Allocated once when the session is prepared and reused in place;
/// per-channel storage only grows, never shrinks, across a `prepare` call.
pub struct Slot {
    pub frames: usize,
    pub channel_count: usize,
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    pub timestamp_ns: u64,
    channels: Vec<Vec<u8>>,
}

impl Slot {
    fn new(channel_count: usize, frames: usize, format: SampleFormat) -> Self {
        let mut slot = Slot {
            frames: 0,
            channel_count: 0,
            sample_format: format,
            sample_rate: 0,
            timestamp_ns: 0,
            channels: Vec::new(),
        };
        slot.ensure_capacity(channel_count, frames, format);
        slot
    }

    /// Grows per-channel storage to fit `channel_count` channels of `frames`
    /// samples at `format`. Never reallocates smaller; a shrink request is a
    /// no-op on capacity (only `frames`/`channel_count` metadata changes).
    fn ensure_capacity(&mut self, channel_count: usize, frames: usize, format: SampleFormat) {
        let needed_bytes = frames * format.bytes_per_sample();
        if self.channels.len() < channel_count {
            self.channels.resize_with(channel_count, Vec::new);
        }
        for ch in self.channels.iter_mut() {
            if ch.len() < needed_bytes {
                ch.resize(needed_bytes, 0);
            }
        }
    }

    /// Byte view of one channel's samples for the current `frames` count.
    pub fn channel(&self, index: usize) -> &[u8] {
        let bytes = self.frames * self.sample_format.bytes_per_sample();
        &self.channels[index][..bytes]
    }

    /// Mutable byte view of one channel, sized to `frames` at the slot's
    /// current format. Only the device callback calls this, while filling
    /// the slot it owns via [`RingBuffer::begin_write`].
    pub fn channel_mut(&mut self, index: usize) -> &mut [u8] {
        let bytes = self.frames * self.sample_format.bytes_per_sample();
        &mut self.channels[index][..bytes]
    }

    /// All per-channel buffers at once, sized to the slot's backing capacity
    /// (not truncated to `frames`). Used by [`crate::format::deinterleave`]
    /// to fan a callback's interleaved buffer out in a single call.
    pub fn channels_mut(&mut self) -> &mut [Vec<u8>] {
        &mut self.channels
    }
}

struct RingInner {
    slots: Box<[UnsafeCell<Slot>]>,
    slot_count: usize,
    write_seq: CachePadded<AtomicU64>,
    /// Edge-triggered wake for listener workers. The writer's notify is a
    /// best-effort `try_lock`, never blocking the callback; readers also
    /// poll on a bounded timeout, so a missed notification just costs one
    /// extra wait cycle.
    signal: (Mutex<u64>, Condvar),
}

// SAFETY: slot contents are only mutated by the single writer thread via
// `begin_write`/`commit_write`, and only observed by readers for sequence
// numbers the writer has already published with a `Release` store. The
// writer never mutates a slot a reader can still legally observe: a slot at
// index `i` is next reused only after `write_seq` has advanced by
// `slot_count`, at which point `read_at` for the old sequence already
// reports `Overrun`.
unsafe impl Sync for RingInner {}
unsafe impl Send for RingInner {}

/// The slot count rule from the spec: at least 4, enough to hold ~2048
/// frames' worth of callbacks at the session's buffer size.
pub fn slot_count_for(buffer_size: usize) -> usize {
    let buffer_size = buffer_size.max(1);
    (2048usize.div_ceil(buffer_size)).max(4)
}

/// Single-writer, multi-reader ring buffer of [`Slot`]s.
///
/// Cheaply `Clone`-able (it's a handle around a shared `Arc`); clone it once
/// per listener and track an independent `read_seq` locally, initialized
/// from [`RingBuffer::current_write_seq`].
#[derive(Clone)]
pub struct RingBuffer {
    inner: Arc<RingInner>,
}

impl RingBuffer {
    /// Allocates a ring sized for `buffer_size`-frame slots of `channel_count`
    /// planar channels in `format`.
    pub fn new(channel_count: usize, buffer_size: usize, format: SampleFormat) -> Self {
        let slot_count = slot_count_for(buffer_size);
        let slots: Box<[UnsafeCell<Slot>]> = (0..slot_count)
            .map(|_| UnsafeCell::new(Slot::new(channel_count, buffer_size, format)))
            .collect();

        RingBuffer {
            inner: Arc::new(RingInner {
                slots,
                slot_count,
                write_seq: CachePadded(AtomicU64::new(0)),
                signal: (Mutex::new(0), Condvar::new()),
            }),
        }
    }

    /// Number of slots in the ring (`N` in the spec).
    pub fn slot_count(&self) -> usize {
        self.inner.slot_count
    }

    /// Acquire-loaded `write_seq`, used by a freshly attaching listener to
    /// initialize its read cursor so it only observes future frames.
    pub fn current_write_seq(&self) -> u64 {
        self.inner.write_seq.load(Ordering::Acquire)
    }

    /// Idempotent re-preparation: grows slot storage if `buffer_size` or
    /// `format` need more bytes, otherwise leaves allocations untouched.
    ///
    /// Must only be called from the control path while the device session
    /// is stopped; concurrent calls with `begin_write`/`read_at` are not
    /// synchronized.
    pub fn prepare(&self, channel_count: usize, buffer_size: usize, format: SampleFormat) {
        for slot_cell in self.inner.slots.iter() {
            // SAFETY: caller contract above; no writer or reader is active.
            let slot = unsafe { &mut *slot_cell.get() };
            slot.ensure_capacity(channel_count, buffer_size, format);
            slot.channel_count = channel_count;
            slot.sample_format = format;
        }
    }

    /// Exclusive access to the slot the next `commit_write` will publish.
    ///
    /// # Safety contract
    /// Valid only when called from the single real-time device-callback
    /// thread, and only between a call to this function and the matching
    /// `commit_write`.
    pub fn begin_write(&self) -> &mut Slot {
        let seq = self.inner.write_seq.load(Ordering::Relaxed);
        let index = (seq % self.inner.slot_count as u64) as usize;
        // SAFETY: single-writer discipline per the contract above.
        unsafe { &mut *self.inner.slots[index].get() }
    }

    /// Publishes the slot most recently returned by `begin_write`, advances
    /// `write_seq` by one with `Release` ordering, then best-effort notifies
    /// waiting readers. The notify never blocks: if the signal mutex is
    /// contended, it is skipped, since readers also poll on a timeout.
    pub fn commit_write(&self) {
        let seq = self.inner.write_seq.load(Ordering::Relaxed);
        self.inner.write_seq.store(seq.wrapping_add(1), Ordering::Release);

        if let Ok(mut generation) = self.inner.signal.0.try_lock() {
            *generation = generation.wrapping_add(1);
            self.inner.signal.1.notify_all();
        }
    }

    /// Blocks the calling listener worker until either a write is signaled
    /// or `timeout` elapses, whichever comes first.
    pub fn wait_for_write(&self, timeout: Duration) {
        let guard = self.inner.signal.0.lock().expect("ring signal mutex poisoned");
        let _ = self.inner.signal.1.wait_timeout(guard, timeout);
    }

    /// Read-only view of slot `seq`. Fails with `NotYetWritten` if the
    /// writer hasn't published it yet, or `Overrun` if it has already been
    /// overwritten (the caller fell more than `slot_count` behind).
    pub fn read_at(&self, seq: u64) -> Result<&Slot, RingError> {
        let write_seq = self.inner.write_seq.load(Ordering::Acquire);
        if seq >= write_seq {
            return Err(RingError::NotYetWritten);
        }
        if write_seq - seq > self.inner.slot_count as u64 {
            return Err(RingError::Overrun);
        }
        let index = (seq % self.inner.slot_count as u64) as usize;
        // SAFETY: we just verified `seq` is within the live window, so no
        // writer can touch this slot again until `write_seq` advances past
        // `seq + slot_count`, which can't happen before this borrow ends.
        Ok(unsafe { &*self.inner.slots[index].get() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(ring: &RingBuffer, timestamp_ns: u64, channel_count: usize, frames: usize, fill: u8) {
        let slot = ring.begin_write();
        slot.frames = frames;
        slot.channel_count = channel_count;
        slot.sample_rate = 48_000;
        slot.timestamp_ns = timestamp_ns;
        for ch in 0..channel_count {
            slot.channel_mut(ch).fill(fill);
        }
        ring.commit_write();
    }

    #[test]
    fn slot_count_follows_buffer_size_rule() {
        assert_eq!(slot_count_for(256), 8); // ceil(2048/256) = 8
        assert_eq!(slot_count_for(1024), 4); // ceil(2048/1024) = 2, floor to min 4
        assert_eq!(slot_count_for(4096), 4); // ceil < 1, floor to min 4
    }

    #[test]
    fn write_then_read_round_trips_bytes() {
        let ring = RingBuffer::new(2, 4, SampleFormat::U8Planar);
        write_frame(&ring, 1_000, 2, 4, 7);

        let slot = ring.read_at(0).unwrap();
        assert_eq!(slot.timestamp_ns, 1_000);
        assert_eq!(slot.channel(0), &[7, 7, 7, 7]);
        assert_eq!(slot.channel(1), &[7, 7, 7, 7]);
    }

    #[test]
    fn read_at_future_seq_is_not_yet_written() {
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        assert_eq!(ring.read_at(0), Err(RingError::NotYetWritten));
    }

    #[test]
    fn read_at_stale_seq_is_overrun() {
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        let n = ring.slot_count() as u64;
        for i in 0..(n + 2) {
            write_frame(&ring, i, 1, 4, 0);
        }
        // seq 0 is now more than `n` slots behind write_seq == n + 2.
        assert_eq!(ring.read_at(0), Err(RingError::Overrun));
        // The most recent slot is still readable.
        assert!(ring.read_at(n + 1).is_ok());
    }

    #[test]
    fn write_seq_advances_by_exactly_one_per_commit() {
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        for i in 0..10u64 {
            assert_eq!(ring.current_write_seq(), i);
            write_frame(&ring, i, 1, 4, 0);
        }
        assert_eq!(ring.current_write_seq(), 10);
    }

    #[test]
    fn prepare_grows_but_never_shrinks_storage() {
        let ring = RingBuffer::new(1, 4, SampleFormat::F32Planar);
        write_frame(&ring, 0, 1, 4, 1);
        ring.prepare(1, 8, SampleFormat::F32Planar);
        // Growing buffer size must not corrupt the already-written slot's
        // prefix (the first four frames' bytes stay intact).
        let slot = ring.read_at(0).unwrap();
        assert!(slot.channels[0].len() >= 8 * 4);
    }

    #[test]
    fn reader_attaching_mid_stream_only_sees_future_seq() {
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        write_frame(&ring, 0, 1, 4, 0);
        write_frame(&ring, 1, 1, 4, 0);

        let attach_cursor = ring.current_write_seq();
        assert_eq!(attach_cursor, 2);
        write_frame(&ring, 2, 1, 4, 0);

        // A listener attaching at `attach_cursor` never reads seq < 2.
        assert!(ring.read_at(attach_cursor).is_ok());
    }

    #[test]
    fn wait_for_write_returns_promptly_after_commit() {
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        let writer = ring.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            write_frame(&writer, 0, 1, 4, 0);
        });

        let start = std::time::Instant::now();
        ring.wait_for_write(std::time::Duration::from_secs(2));
        handle.join().unwrap();

        assert!(start.elapsed() < std::time::Duration::from_secs(2));
        assert_eq!(ring.current_write_seq(), 1);
    }

    #[test]
    fn wait_for_write_times_out_without_a_write() {
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        let start = std::time::Instant::now();
        ring.wait_for_write(std::time::Duration::from_millis(20));
        assert!(start.elapsed() >= std::time::Duration::from_millis(20));
    }
}
