//! The bounded message queue.
//!
//! Writers and readers meet in a [`SlotRing`] guarded by a [`CursorLock`].
//! Two counting signals keep the ring accounting: `free` counts slots a writer
//! may fill and `filled` counts slots a reader may drain. Every operation
//! takes a slot unit first and the cursor lock second. The unit is held as a
//! [`Permit`](crate::Permit), so if the lock wait is interrupted the unit
//! goes back automatically and the queue keeps its full capacity.
//!
//! A slot only becomes writable after a reader has copied its previous
//! message out and released the matching free unit, so data is never
//! overwritten while it is still undelivered.

use crate::cursor::CursorLock;
use crate::interrupt::WaitPolicy;
use crate::ring_buffer::SlotRing;
use crate::semaphore::Semaphore;
use crate::trace::{debug, info, trace};
use crate::{QueueConfig, QueueError};
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed-capacity FIFO of byte messages shared by any number of writers and
/// readers.
///
/// The queue is created once with its geometry and shared by reference (for
/// example behind an `Arc`). Messages are delivered whole and in the global
/// order they were enqueued, whichever thread wrote or reads them.
pub struct BoundedMessageQueue {
    config: QueueConfig,
    free: Semaphore,
    filled: Semaphore,
    cursor: CursorLock<SlotRing>,
    destroyed: AtomicBool,
}

/// Point-in-time view of the queue accounting.
///
/// Taken under the cursor lock. The two counts only add up to the capacity
/// when no enqueue or dequeue is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub free: usize,
    pub filled: usize,
    pub head: usize,
    pub tail: usize,

    /// Undelivered messages, oldest first.
    pub pending: Vec<Vec<u8>>,
}

impl BoundedMessageQueue {
    /// Creates a queue of `capacity` slots holding up to `elem_size` bytes
    /// each.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of slots, must be non-zero
    /// * `elem_size` - Maximum payload bytes per message, must be non-zero
    ///
    /// # Returns
    ///
    /// The ready queue, [`QueueError::InvalidConfiguration`] for a zero or
    /// overflowing geometry, or [`QueueError::AllocationError`] if the slot
    /// storage could not be obtained.
    pub fn create(capacity: usize, elem_size: usize) -> Result<Self, QueueError> {
        Self::with_config(&QueueConfig::new(capacity, elem_size))
    }

    pub fn with_config(config: &QueueConfig) -> Result<Self, QueueError> {
        let ring = SlotRing::new(config)?;
        info!(
            capacity = config.capacity,
            elem_size = config.elem_size,
            "message queue created"
        );
        Ok(Self {
            config: *config,
            free: Semaphore::new(config.capacity),
            filled: Semaphore::new(0),
            cursor: CursorLock::new(ring),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Appends one message, blocking while every slot is full.
    ///
    /// Payload bytes beyond the element size are silently dropped. If the
    /// wait is interrupted nothing is written and no slot is lost.
    ///
    /// # Returns
    ///
    /// The number of bytes stored, at most the element size.
    pub fn enqueue(&self, data: &[u8], wait: WaitPolicy<'_>) -> Result<usize, QueueError> {
        self.ensure_ready()?;

        let free = self.free.acquire(wait)?;
        let mut ring = self.cursor.lock(wait).inspect_err(|_| {
            debug!("enqueue: cursor wait failed, free slot returned");
        })?;
        // The free permit guarantees room, so only released storage refuses.
        let Some(written) = ring.push(data) else {
            return Err(QueueError::UseAfterDestroy);
        };
        trace!(tail = ring.tail(), bytes = written, "enqueued");
        drop(ring);

        free.consume();
        self.filled.release();
        Ok(written)
    }

    /// Removes the oldest message, blocking while every slot is empty.
    ///
    /// At most `max_count` bytes are returned. When the stored message is
    /// longer, the rest of it is discarded rather than kept for a later call.
    /// If the wait is interrupted nothing is consumed.
    pub fn dequeue(&self, max_count: usize, wait: WaitPolicy<'_>) -> Result<Vec<u8>, QueueError> {
        self.ensure_ready()?;

        let filled = self.filled.acquire(wait)?;
        let mut ring = self.cursor.lock(wait).inspect_err(|_| {
            debug!("dequeue: cursor wait failed, filled slot returned");
        })?;
        // The filled permit guarantees a message, so only released storage
        // comes back empty.
        let Some(message) = ring.pop(max_count) else {
            return Err(QueueError::UseAfterDestroy);
        };
        trace!(head = ring.head(), bytes = message.len(), "dequeued");
        drop(ring);

        filled.consume();
        self.free.release();
        Ok(message)
    }

    /// Maximum payload bytes a single message can carry.
    pub fn query_max_element_size(&self) -> Result<usize, QueueError> {
        self.ensure_ready()?;
        Ok(self.config.elem_size)
    }

    /// Number of slots in the ring.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Reads the cursors, both counts and the undelivered messages.
    ///
    /// Blocks on the cursor lock like any other operation.
    pub fn snapshot(&self) -> Result<QueueSnapshot, QueueError> {
        self.ensure_ready()?;
        let ring = self.cursor.lock(WaitPolicy::Forever)?;
        Ok(QueueSnapshot {
            free: self.free.available(),
            filled: self.filled.available(),
            head: ring.head(),
            tail: ring.tail(),
            pending: ring.pending(),
        })
    }

    /// Releases the slot storage and retires the queue.
    ///
    /// All writers and readers must have finished before this is called;
    /// quiescing them is the owner's job. Any waiter still blocked is woken
    /// and every later call fails with [`QueueError::UseAfterDestroy`].
    pub fn destroy(&self) -> Result<(), QueueError> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Err(QueueError::UseAfterDestroy);
        }

        {
            let mut ring = self.cursor.lock(WaitPolicy::Forever)?;
            info!(undelivered = ring.len(), "message queue destroyed");
            ring.release_storage();
        }
        self.cursor.close();
        self.free.close();
        self.filled.close();
        Ok(())
    }

    #[inline(always)]
    fn ensure_ready(&self) -> Result<(), QueueError> {
        if self.is_destroyed() {
            Err(QueueError::UseAfterDestroy)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::Interrupt;
    use std::thread;
    use std::time::Duration;

    const SETTLE: Duration = Duration::from_millis(30);

    fn filled_queue() -> BoundedMessageQueue {
        let queue = BoundedMessageQueue::create(3, 4).unwrap();
        queue.enqueue(b"one", WaitPolicy::Forever).unwrap();
        queue.enqueue(b"two", WaitPolicy::Forever).unwrap();
        queue.dequeue(4, WaitPolicy::Forever).unwrap();
        queue.enqueue(b"six", WaitPolicy::Forever).unwrap();
        queue
    }

    #[test]
    fn create_starts_empty() {
        let queue = BoundedMessageQueue::create(4, 8).unwrap();
        let snap = queue.snapshot().unwrap();
        assert_eq!(snap.free, 4);
        assert_eq!(snap.filled, 0);
        assert_eq!((snap.head, snap.tail), (0, 0));
        assert!(snap.pending.is_empty());
        assert_eq!(queue.capacity(), 4);
        assert_eq!(queue.query_max_element_size(), Ok(8));
    }

    #[test]
    fn create_rejects_zero_geometry() {
        assert!(matches!(
            BoundedMessageQueue::create(0, 8),
            Err(QueueError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn counts_add_up_to_capacity_between_calls() {
        let queue = filled_queue();
        let snap = queue.snapshot().unwrap();
        assert_eq!(snap.free + snap.filled, queue.capacity());
        assert_eq!(snap.filled, snap.pending.len());
    }

    #[test]
    fn interrupted_enqueue_on_full_queue_changes_nothing() {
        let queue = BoundedMessageQueue::create(2, 4).unwrap();
        queue.enqueue(b"ab", WaitPolicy::Forever).unwrap();
        queue.enqueue(b"cd", WaitPolicy::Forever).unwrap();
        let before = queue.snapshot().unwrap();
        let interrupt = Interrupt::new();

        thread::scope(|s| {
            let writer = s.spawn(|| queue.enqueue(b"zz", WaitPolicy::Interruptible(&interrupt)));
            thread::sleep(SETTLE);
            assert!(!writer.is_finished());
            interrupt.raise();
            assert_eq!(writer.join().unwrap(), Err(QueueError::Interrupted));
        });

        assert_eq!(queue.snapshot().unwrap(), before);
    }

    #[test]
    fn interrupted_dequeue_on_empty_queue_changes_nothing() {
        let queue = BoundedMessageQueue::create(2, 4).unwrap();
        let before = queue.snapshot().unwrap();
        let interrupt = Interrupt::new();

        thread::scope(|s| {
            let reader = s.spawn(|| queue.dequeue(4, WaitPolicy::Interruptible(&interrupt)));
            thread::sleep(SETTLE);
            interrupt.raise();
            assert_eq!(reader.join().unwrap(), Err(QueueError::Interrupted));
        });

        assert_eq!(queue.snapshot().unwrap(), before);
    }

    #[test]
    fn interrupted_cursor_wait_returns_the_free_slot() {
        let queue = filled_queue();
        let before = queue.snapshot().unwrap();
        let interrupt = Interrupt::new();

        let held = queue.cursor.lock(WaitPolicy::Forever).unwrap();
        thread::scope(|s| {
            let writer = s.spawn(|| queue.enqueue(b"late", WaitPolicy::Interruptible(&interrupt)));
            thread::sleep(SETTLE);
            // The writer owns a free unit and is parked on the cursor lock.
            assert_eq!(queue.free.available(), before.free - 1);
            interrupt.raise();
            assert_eq!(writer.join().unwrap(), Err(QueueError::Interrupted));
        });
        drop(held);

        assert_eq!(queue.snapshot().unwrap(), before);
    }

    #[test]
    fn interrupted_cursor_wait_returns_the_filled_slot() {
        let queue = filled_queue();
        let before = queue.snapshot().unwrap();
        let interrupt = Interrupt::new();

        let held = queue.cursor.lock(WaitPolicy::Forever).unwrap();
        thread::scope(|s| {
            let reader = s.spawn(|| queue.dequeue(4, WaitPolicy::Interruptible(&interrupt)));
            thread::sleep(SETTLE);
            assert_eq!(queue.filled.available(), before.filled - 1);
            interrupt.raise();
            assert_eq!(reader.join().unwrap(), Err(QueueError::Interrupted));
        });
        drop(held);

        assert_eq!(queue.snapshot().unwrap(), before);
        assert_eq!(queue.dequeue(4, WaitPolicy::Forever).unwrap(), b"two");
    }

    #[test]
    fn raised_interrupt_does_not_block_a_ready_call() {
        let queue = BoundedMessageQueue::create(1, 4).unwrap();
        let interrupt = Interrupt::new();
        interrupt.raise();
        assert_eq!(queue.enqueue(b"go", (&interrupt).into()), Ok(2));
        assert_eq!(queue.dequeue(4, (&interrupt).into()).unwrap(), b"go");
    }

    #[test]
    fn destroy_retires_the_queue() {
        let queue = filled_queue();
        assert_eq!(queue.destroy(), Ok(()));
        assert!(queue.is_destroyed());
        assert_eq!(
            queue.enqueue(b"x", WaitPolicy::Forever),
            Err(QueueError::UseAfterDestroy)
        );
        assert_eq!(
            queue.dequeue(1, WaitPolicy::Forever),
            Err(QueueError::UseAfterDestroy)
        );
        assert_eq!(
            queue.query_max_element_size(),
            Err(QueueError::UseAfterDestroy)
        );
        assert_eq!(queue.destroy(), Err(QueueError::UseAfterDestroy));
    }

    #[test]
    fn destroy_wakes_a_stray_waiter() {
        let queue = BoundedMessageQueue::create(1, 4).unwrap();
        thread::scope(|s| {
            let reader = s.spawn(|| queue.dequeue(4, WaitPolicy::Forever));
            thread::sleep(SETTLE);
            queue.destroy().unwrap();
            assert_eq!(reader.join().unwrap(), Err(QueueError::UseAfterDestroy));
        });
    }
}
