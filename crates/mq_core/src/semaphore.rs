//! Counting signal used for free-slot and filled-slot accounting.
//!
//! A [`Semaphore`] holds a number of interchangeable units. Acquiring a unit
//! blocks while none is available and yields a [`Permit`]. The permit gives
//! its unit back when dropped, so an operation that fails halfway through
//! restores the count without any explicit release at the failure site.
//! Once the operation has actually used the unit it calls
//! [`Permit::consume`] and the unit is gone for good.

use crate::QueueError;
use crate::interrupt::{INTERRUPT_POLL, WaitPolicy};
use crate::trace::debug;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Blocking counting semaphore with interruptible acquisition.
///
/// Waiters are woken one at a time as units are released. The order in which
/// blocked waiters are released is whatever the platform condition variable
/// picks; it is fair only in the sense that every waiter eventually runs,
/// not in arrival order.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
}

#[derive(Debug)]
struct State {
    count: usize,
    closed: bool,
}

impl Semaphore {
    pub fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(State {
                count,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Takes one unit, blocking while none is available.
    ///
    /// With [`WaitPolicy::Interruptible`] or [`WaitPolicy::Signal`] the wait
    /// is abandoned as soon as the interrupt is observed and no unit is
    /// taken. The interrupt is checked only when no unit is available, so a
    /// woken waiter always takes a released unit before looking at it.
    ///
    /// # Returns
    ///
    /// A permit owning the unit, [`QueueError::Interrupted`] if the wait was
    /// cancelled, or [`QueueError::UseAfterDestroy`] once the semaphore has
    /// been closed.
    pub fn acquire(&self, wait: WaitPolicy<'_>) -> Result<Permit<'_>, QueueError> {
        let mut state = self.lock_state();
        loop {
            if state.closed {
                return Err(QueueError::UseAfterDestroy);
            }
            if state.count > 0 {
                state.count -= 1;
                return Ok(Permit {
                    semaphore: self,
                    armed: true,
                });
            }
            // Only reached with no unit available, so an interrupt never
            // strands a unit released to this waiter.
            if wait.interrupted() {
                debug!("semaphore wait interrupted");
                return Err(QueueError::Interrupted);
            }
            state = match wait {
                WaitPolicy::Forever => self
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                WaitPolicy::Interruptible(_) | WaitPolicy::Signal(_) => {
                    self.available
                        .wait_timeout(state, INTERRUPT_POLL)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Takes one unit only if one is available right now.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock_state();
        if state.closed || state.count == 0 {
            return None;
        }
        state.count -= 1;
        Some(Permit {
            semaphore: self,
            armed: true,
        })
    }

    /// Adds one unit and wakes one blocked waiter, if any.
    pub fn release(&self) {
        let mut state = self.lock_state();
        state.count += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Wakes every waiter and makes all further acquisitions fail with
    /// [`QueueError::UseAfterDestroy`].
    pub fn close(&self) {
        self.lock_state().closed = true;
        self.available.notify_all();
    }

    /// Number of units currently available.
    pub fn available(&self) -> usize {
        self.lock_state().count
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        // The state is a plain counter; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One unit taken from a [`Semaphore`].
///
/// Dropping the permit returns the unit. Calling [`Permit::consume`] keeps it
/// taken, which is how a completed enqueue or dequeue retires the slot unit
/// it waited for.
#[must_use = "dropping a permit immediately gives its unit back"]
#[derive(Debug)]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
    armed: bool,
}

impl Permit<'_> {
    /// Retires the unit instead of returning it on drop.
    pub fn consume(mut self) {
        self.armed = false;
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.semaphore.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::Interrupt;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn dropped_permit_restores_the_unit() {
        let sem = Semaphore::new(2);
        let permit = sem.acquire(WaitPolicy::Forever).unwrap();
        assert_eq!(sem.available(), 1);
        drop(permit);
        assert_eq!(sem.available(), 2);
    }

    #[test]
    fn consumed_permit_keeps_the_unit() {
        let sem = Semaphore::new(1);
        sem.acquire(WaitPolicy::Forever).unwrap().consume();
        assert_eq!(sem.available(), 0);
        assert!(sem.try_acquire().is_none());
    }

    #[test]
    fn raised_interrupt_does_not_fail_an_available_unit() {
        let sem = Semaphore::new(1);
        let interrupt = Interrupt::new();
        interrupt.raise();
        let permit = sem.acquire(WaitPolicy::Interruptible(&interrupt));
        assert!(permit.is_ok());
    }

    #[test]
    fn interrupt_cancels_a_blocked_wait() {
        let sem = Semaphore::new(0);
        let interrupt = Interrupt::new();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                sem.acquire(WaitPolicy::Interruptible(&interrupt))
                    .map(Permit::consume)
            });
            thread::sleep(Duration::from_millis(20));
            assert!(!waiter.is_finished());
            interrupt.raise();
            assert_eq!(waiter.join().unwrap(), Err(QueueError::Interrupted));
        });

        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn released_unit_wins_over_a_later_interrupt() {
        let sem = Semaphore::new(0);
        let interrupt = Interrupt::new();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                sem.acquire(WaitPolicy::Interruptible(&interrupt))
                    .map(Permit::consume)
            });
            thread::sleep(Duration::from_millis(20));
            sem.release();
            interrupt.raise();
            // whenever the waiter wakes, the unit is there before the interrupt is looked at
            assert_eq!(waiter.join().unwrap(), Ok(()));
        });

        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn signal_wait_consumes_the_interrupt_it_observes() {
        let sem = Semaphore::new(0);
        let interrupt = Interrupt::new();
        interrupt.raise();

        assert_eq!(
            sem.acquire(WaitPolicy::Signal(&interrupt)).map(Permit::consume),
            Err(QueueError::Interrupted)
        );
        assert!(!interrupt.is_raised());

        // a raise that arrives after the cancelled wait is kept for the next one
        interrupt.raise();
        assert_eq!(
            sem.acquire(WaitPolicy::Signal(&interrupt)).map(Permit::consume),
            Err(QueueError::Interrupted)
        );
        assert!(!interrupt.is_raised());
    }

    #[test]
    fn release_wakes_a_blocked_waiter() {
        let sem = Semaphore::new(0);

        thread::scope(|s| {
            let waiter = s.spawn(|| sem.acquire(WaitPolicy::Forever).map(Permit::consume));
            thread::sleep(Duration::from_millis(20));
            sem.release();
            assert_eq!(waiter.join().unwrap(), Ok(()));
        });

        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn close_wakes_waiters_with_use_after_destroy() {
        let sem = Semaphore::new(0);

        thread::scope(|s| {
            let waiter = s.spawn(|| sem.acquire(WaitPolicy::Forever).map(Permit::consume));
            thread::sleep(Duration::from_millis(20));
            sem.close();
            assert_eq!(waiter.join().unwrap(), Err(QueueError::UseAfterDestroy));
        });

        assert!(sem.is_closed());
        assert!(sem.try_acquire().is_none());
    }
}
