//! Bounded, message-oriented FIFO queue shared between writer and reader
//! threads.
//!
//! The queue holds a fixed number of fixed-size slots arranged in a ring.
//! Writers block while every slot is full, readers block while every slot is
//! empty, and both waits can be interrupted without leaving any trace in the
//! shared state. Delivery is strictly first-in first-out with one message per
//! slot.

/// Interruptible cursor lock guarding the ring cursors and slot contents.
///
/// Built on a single-unit counting signal so that acquisition can be
/// abandoned when the caller is interrupted. The returned guard releases the
/// lock on every exit path.
pub mod cursor;

/// Cancellation token consulted by blocking waits.
///
/// Stands in for a pending signal on the calling task: once raised, every
/// interruptible wait that would otherwise block returns
/// [`QueueError::Interrupted`].
pub mod interrupt;

/// The bounded message queue and its enqueue/dequeue protocol.
pub mod queue;

/// Slot storage and ring cursor arithmetic.
///
/// Owns the backing bytes for all slots plus the head and tail indices. Not
/// synchronized on its own; the queue only touches it through the cursor
/// lock.
pub mod ring_buffer;

/// Counting signal with scoped permits.
///
/// Tracks free or filled slots. Acquired units are handed out as permits
/// that give the unit back when dropped unless explicitly consumed.
pub mod semaphore;

mod trace;

pub use cursor::{CursorGuard, CursorLock};
pub use interrupt::{INTERRUPT_POLL, Interrupt, WaitPolicy};
pub use queue::{BoundedMessageQueue, QueueSnapshot};
pub use ring_buffer::SlotRing;
pub use semaphore::{Permit, Semaphore};

use mq_common::params::{DEFAULT_FIFO_ELEMSZ, DEFAULT_FIFO_SIZE};
use thiserror::Error;

/// Errors returned by queue operations.
///
/// Only [`QueueError::Interrupted`] can surface from a blocking wait. Every
/// error leaves the cursors and both counting signals exactly as they were
/// before the failing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A wait was cancelled before the resource it waited for was obtained.
    ///
    /// Nothing changed. The caller may retry or give up.
    #[error("wait interrupted before the queue resource was obtained")]
    Interrupted,

    /// The backing storage for the slots could not be allocated.
    #[error("failed to allocate {bytes} bytes of slot storage")]
    AllocationError { bytes: usize },

    /// The queue was already destroyed when the operation was issued.
    ///
    /// This is a lifecycle bug in the caller rather than a runtime condition.
    #[error("operation on a destroyed message queue")]
    UseAfterDestroy,

    /// Capacity or element size is zero, or the storage size overflows.
    #[error("invalid queue geometry: capacity {capacity}, element size {elem_size}")]
    InvalidConfiguration { capacity: usize, elem_size: usize },
}

/// Geometry of a queue, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Number of slots in the ring.
    pub capacity: usize,

    /// Maximum payload bytes per message. Longer writes are truncated.
    pub elem_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_FIFO_SIZE,
            elem_size: DEFAULT_FIFO_ELEMSZ,
        }
    }
}

impl QueueConfig {
    pub fn new(capacity: usize, elem_size: usize) -> Self {
        Self {
            capacity,
            elem_size,
        }
    }

    /// Checks that both dimensions are non-zero and that the payload area
    /// fits in the address space.
    ///
    /// # Returns
    ///
    /// The total number of payload bytes the ring needs.
    pub fn validate(&self) -> Result<usize, QueueError> {
        let invalid = QueueError::InvalidConfiguration {
            capacity: self.capacity,
            elem_size: self.elem_size,
        };
        if self.capacity == 0 || self.elem_size == 0 {
            return Err(invalid);
        }
        self.capacity.checked_mul(self.elem_size).ok_or(invalid)
    }
}
