//! Interruptible mutual exclusion for the ring cursors.
//!
//! A plain mutex cannot abandon a lock attempt, so the cursor lock is a
//! single-unit [`Semaphore`] paired with the data it protects. Holding the
//! unit grants exclusive access to the data through a [`CursorGuard`].

use crate::QueueError;
use crate::interrupt::WaitPolicy;
use crate::semaphore::{Permit, Semaphore};
use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

/// Mutual-exclusion lock whose acquisition honours a [`WaitPolicy`].
pub struct CursorLock<T> {
    /// Single unit; whoever holds it owns `data`.
    gate: Semaphore,

    /// Protected data wrapped in UnsafeCell for interior mutability.
    data: UnsafeCell<T>,
}

/// CursorLock is safe to share between threads when T is Send.
///
/// The single-unit gate admits at most one guard at a time, so the protected
/// data is never aliased mutably.
unsafe impl<T: Send> Sync for CursorLock<T> {}

impl<T> CursorLock<T> {
    pub fn new(data: T) -> Self {
        Self {
            gate: Semaphore::new(1),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, returning a guard that releases it on drop.
    ///
    /// # Returns
    ///
    /// The guard, [`QueueError::Interrupted`] if the wait was cancelled
    /// before the lock was obtained, or [`QueueError::UseAfterDestroy`] if the
    /// lock has been closed.
    pub fn lock(&self, wait: WaitPolicy<'_>) -> Result<CursorGuard<'_, T>, QueueError> {
        let permit = self.gate.acquire(wait)?;
        Ok(CursorGuard {
            lock: self,
            _permit: permit,
            _not_auto: PhantomData,
        })
    }

    /// Fails every later [`CursorLock::lock`] and wakes anyone waiting on it.
    ///
    /// Guards that are already held stay valid until dropped.
    pub fn close(&self) {
        self.gate.close();
    }

    pub fn is_locked(&self) -> bool {
        self.gate.available() == 0
    }
}

/// Exclusive access to the data behind a [`CursorLock`].
///
/// The lock is released when the guard is dropped, on success and error
/// paths alike. Like `std::sync::MutexGuard`, a guard can only be shared
/// between threads when `T` itself is `Sync`:
///
/// ```compile_fail
/// use mq_core::CursorGuard;
/// use std::cell::Cell;
///
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<CursorGuard<'static, Cell<u64>>>();
/// ```
pub struct CursorGuard<'a, T> {
    lock: &'a CursorLock<T>,
    _permit: Permit<'a>,
    /// Opts out of the automatic Send/Sync impls.
    _not_auto: PhantomData<*mut ()>,
}

/// A shared guard only hands out `&T`, so it needs `T: Sync`.
unsafe impl<T: Sync> Sync for CursorGuard<'_, T> {}

impl<T> Deref for CursorGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the only unit of the gate.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for CursorGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the only unit of the gate.
        unsafe { &mut *self.lock.data.get() }
    }
}
