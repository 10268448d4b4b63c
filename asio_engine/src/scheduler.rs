//! Registry of running listener workers: add/remove/cancel, independent of
//! the worker threads' own progress.
//!
//! Each [`crate::listener::Listener`] already drives its own worker thread,
//! waiting on its device's ring signal with a bounded timeout (see
//! `asio_core::ring::RingBuffer::wait_for_write`); the scheduler's job is
//! the control-plane bookkeeping around that set of workers, never the
//! workers' hot path, so registering or removing a listener never blocks a
//! thread that is mid-slice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::listener::Listener;
use crate::routing::RoutingTable;
use asio_registry::SpeakerLayout;

/// Opaque handle returned by [`Scheduler::add`], used to remove that
/// listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Owns the set of currently attached listeners.
#[derive(Default)]
pub struct Scheduler {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, Listener>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler { next_id: AtomicU64::new(0), tasks: Mutex::new(HashMap::new()) }
    }

    /// Registers an already-attached listener, returning a handle that can
    /// later `remove` it. Acquires the registry lock only, never touching
    /// the listener's worker thread.
    pub fn add(&self, listener: Listener) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.tasks.lock().expect("scheduler registry poisoned").insert(id, listener);
        id
    }

    /// Detaches and removes the listener registered under `id`, joining its
    /// worker thread. A no-op if `id` is unknown (already removed).
    pub fn remove(&self, id: TaskId) {
        let listener = self.tasks.lock().expect("scheduler registry poisoned").remove(&id);
        if let Some(listener) = listener {
            listener.detach();
        }
    }

    /// Number of currently registered listeners.
    pub fn count(&self) -> usize {
        self.tasks.lock().expect("scheduler registry poisoned").len()
    }

    /// Associates `listener` with an `id` that was previously returned by
    /// `add` (e.g. after a session restart recreated the listener's ring).
    /// Unlike `add`, this never allocates a new id, so callers that handed
    /// the old id to a host can keep using it.
    pub fn reinsert(&self, id: TaskId, listener: Listener) {
        self.tasks.lock().expect("scheduler registry poisoned").insert(id, listener);
    }

    /// Replaces the routing table of the listener registered under `id`.
    /// Returns `false` if `id` is unknown.
    pub fn set_routing(&self, id: TaskId, table: RoutingTable) -> bool {
        match self.tasks.lock().expect("scheduler registry poisoned").get(&id) {
            Some(listener) => {
                listener.set_routing(table);
                true
            }
            None => false,
        }
    }

    /// Replaces the output speaker layout of the listener registered under
    /// `id`. Returns `false` if `id` is unknown.
    pub fn set_output_layout(&self, id: TaskId, layout: SpeakerLayout) -> bool {
        match self.tasks.lock().expect("scheduler registry poisoned").get(&id) {
            Some(listener) => {
                listener.set_output_layout(layout);
                true
            }
            None => false,
        }
    }

    /// Detaches every registered listener, joining their worker threads.
    pub fn cancel_all(&self) {
        let listeners: Vec<Listener> = self.tasks.lock().expect("scheduler registry poisoned").drain().map(|(_, l)| l).collect();
        for listener in listeners {
            listener.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CountingSink;
    use asio_core::{RingBuffer, SampleFormat};
    use asio_registry::SpeakerLayout;

    #[test]
    fn add_then_remove_shrinks_count() {
        let scheduler = Scheduler::new();
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        let listener = Listener::attach(ring, CountingSink::default(), SpeakerLayout::Mono, 4, 48_000);

        let id = scheduler.add(listener);
        assert_eq!(scheduler.count(), 1);

        scheduler.remove(id);
        assert_eq!(scheduler.count(), 0);
    }

    #[test]
    fn set_routing_on_unknown_id_returns_false() {
        let scheduler = Scheduler::new();
        assert!(!scheduler.set_routing(TaskId(0), crate::routing::RoutingTable::muted(2)));
    }

    #[test]
    fn set_routing_on_known_id_returns_true() {
        let scheduler = Scheduler::new();
        let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
        let listener = Listener::attach(ring, CountingSink::default(), SpeakerLayout::Mono, 4, 48_000);
        let id = scheduler.add(listener);
        assert!(scheduler.set_routing(id, crate::routing::RoutingTable::muted(1)));
        scheduler.remove(id);
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let scheduler = Scheduler::new();
        scheduler.remove(TaskId(999));
        assert_eq!(scheduler.count(), 0);
    }

    #[test]
    fn cancel_all_empties_the_registry() {
        let scheduler = Scheduler::new();
        for _ in 0..3 {
            let ring = RingBuffer::new(1, 4, SampleFormat::U8Planar);
            let listener = Listener::attach(ring, CountingSink::default(), SpeakerLayout::Mono, 4, 48_000);
            scheduler.add(listener);
        }
        assert_eq!(scheduler.count(), 3);
        scheduler.cancel_all();
        assert_eq!(scheduler.count(), 0);
    }
}
