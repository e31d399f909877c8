use crate::{QueueConfig, QueueError};
use std::collections::TryReserveError;

/// Ring of fixed-size message slots.
///
/// Slot `i` owns the payload bytes `i * elem_size .. (i + 1) * elem_size`
/// plus a length recording how many of them are meaningful. `head` is the
/// next slot to read and `tail` the next slot to write; both advance modulo
/// `capacity` and the bytes never move.
#[derive(Debug)]
pub struct SlotRing {
    payload: Vec<u8>,
    lengths: Vec<usize>,
    capacity: usize,
    elem_size: usize,
    head: usize,
    tail: usize,
    queued: usize,
}

impl SlotRing {
    /// Allocates storage for `config.capacity` slots of `config.elem_size`
    /// bytes each.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub fn new(config: &QueueConfig) -> Result<Self, QueueError> {
        let bytes = config.validate()?;
        let alloc_failed = |_: TryReserveError| QueueError::AllocationError { bytes };

        let mut payload = Vec::new();
        payload.try_reserve_exact(bytes).map_err(alloc_failed)?;
        payload.resize(bytes, 0);

        let mut lengths = Vec::new();
        lengths
            .try_reserve_exact(config.capacity)
            .map_err(alloc_failed)?;
        lengths.resize(config.capacity, 0);

        Ok(Self {
            payload,
            lengths,
            capacity: config.capacity,
            elem_size: config.elem_size,
            head: 0,
            tail: 0,
            queued: 0,
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    #[inline(always)]
    pub fn head(&self) -> usize {
        self.head
    }

    #[inline(always)]
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Number of slots holding an undelivered message.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.queued
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    /// True once [`SlotRing::release_storage`] has run.
    pub fn is_released(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Writes one message into the slot at `tail` and advances `tail`.
    ///
    /// Bytes beyond `elem_size` are dropped.
    ///
    /// # Returns
    ///
    /// The number of bytes stored, or `None` if every slot already holds an
    /// undelivered message or the storage has been released. Nothing is
    /// overwritten in either case.
    pub fn push(&mut self, data: &[u8]) -> Option<usize> {
        if self.is_released() || self.queued == self.capacity {
            return None;
        }
        let n = data.len().min(self.elem_size);
        let start = self.tail * self.elem_size;
        self.payload[start..start + n].copy_from_slice(&data[..n]);
        self.lengths[self.tail] = n;
        self.tail = (self.tail + 1) % self.capacity;
        self.queued += 1;
        Some(n)
    }

    /// Takes the message at `head` and advances `head`.
    ///
    /// At most `max_count` bytes are returned; whatever is left of the
    /// message is discarded with the slot. Returns `None` when no message is
    /// queued or the storage has been released.
    pub fn pop(&mut self, max_count: usize) -> Option<Vec<u8>> {
        if self.is_released() || self.queued == 0 {
            return None;
        }
        let n = self.lengths[self.head].min(max_count);
        let start = self.head * self.elem_size;
        let message = self.payload[start..start + n].to_vec();
        self.lengths[self.head] = 0;
        self.head = (self.head + 1) % self.capacity;
        self.queued -= 1;
        Some(message)
    }

    /// Copies every undelivered message in delivery order.
    pub fn pending(&self) -> Vec<Vec<u8>> {
        (0..self.queued)
            .map(|offset| {
                let slot = (self.head + offset) % self.capacity;
                let start = slot * self.elem_size;
                self.payload[start..start + self.lengths[slot]].to_vec()
            })
            .collect()
    }

    /// Frees the slot storage. The ring is unusable afterwards.
    pub fn release_storage(&mut self) {
        self.payload = Vec::new();
        self.lengths = Vec::new();
        self.head = 0;
        self.tail = 0;
        self.queued = 0;
    }
}
