//! Bounded multi-producer/multi-consumer chunk queue.
//!
//! A thin contract layer over a bounded crossbeam channel. Capacity
//! equals the chunk count, and the single producer (the partitioner)
//! enqueues everything before workers start, so `enqueue` never blocks.
//! `close` drops the sender; a `dequeue` on an empty, closed queue
//! returns `None` immediately, which is each worker's exit signal.
//!
//! The enqueue/dequeue counters exist for observability and invariant
//! checks (`depth == enqueued - dequeued`); they are not used for
//! synchronization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use crossbeam_utils::CachePadded;

use crate::partition::Chunk;

/// A chunk plus the borrowed header it must be prefixed with on send.
#[derive(Debug)]
pub struct WorkItem<'m> {
    /// Header row bytes (LF excluded), borrowed from the mapping.
    pub header: &'m [u8],
    /// The owned chunk payload.
    pub chunk: Chunk,
}

/// Bounded FIFO of [`WorkItem`]s shared between the partitioner and the
/// worker pool.
pub struct ChunkQueue<'m> {
    tx: Mutex<Option<Sender<WorkItem<'m>>>>,
    rx: Receiver<WorkItem<'m>>,
    enqueued: CachePadded<AtomicU64>,
    dequeued: CachePadded<AtomicU64>,
}

impl<'m> ChunkQueue<'m> {
    /// Creates a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
            enqueued: CachePadded::new(AtomicU64::new(0)),
            dequeued: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Enqueues an item without blocking.
    ///
    /// Panics if the queue is full or closed: capacity is sized to the
    /// chunk count up front, so either is a composition bug, not a
    /// runtime condition to recover from.
    pub fn enqueue(&self, item: WorkItem<'m>) {
        let guard = self.tx.lock().expect("queue sender mutex poisoned");
        let tx = guard.as_ref().expect("enqueue after close");
        match tx.try_send(item) {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => panic!("chunk queue over capacity"),
            Err(TrySendError::Disconnected(_)) => unreachable!("receiver held by the queue"),
        }
    }

    /// Removes and returns the next item.
    ///
    /// Blocks while the queue is empty but open; returns `None` once the
    /// queue is both empty and closed.
    pub fn dequeue(&self) -> Option<WorkItem<'m>> {
        match self.rx.recv() {
            Ok(item) => {
                self.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(item)
            }
            Err(_) => None,
        }
    }

    /// Signals that no more items will be enqueued. Idempotent.
    pub fn close(&self) {
        let mut guard = self.tx.lock().expect("queue sender mutex poisoned");
        guard.take();
    }

    /// Items enqueued so far.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Items dequeued so far.
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Current depth (`enqueued - dequeued`).
    pub fn depth(&self) -> u64 {
        self.enqueued().saturating_sub(self.dequeued())
    }
}
