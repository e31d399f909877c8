use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Upper bound on how long a blocked interruptible waiter takes to notice a
/// raised [`Interrupt`].
pub const INTERRUPT_POLL: Duration = Duration::from_millis(5);

/// Sticky cancellation flag for blocking queue operations.
///
/// The flag models a signal pending on the calling task. It is only looked at
/// when a wait would actually block: a call whose slot and lock are available
/// right away succeeds even if the flag is raised. The flag stays raised until
/// [`Interrupt::clear`] or [`Interrupt::take`] is called, or a
/// [`WaitPolicy::Signal`] wait observes it.
#[derive(Debug, Default)]
pub struct Interrupt {
    raised: AtomicBool,
}

impl Interrupt {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Marks the owning task as interrupted.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Withdraws a previous [`Interrupt::raise`].
    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }

    /// Lowers the flag and reports whether it was raised.
    ///
    /// Clearing and observing happen in one atomic step, so a raise that
    /// lands right after is kept rather than lost.
    #[inline(always)]
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    #[inline(always)]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// How a queue operation behaves when it has to wait.
#[derive(Debug, Clone, Copy)]
pub enum WaitPolicy<'a> {
    /// Block until the resource becomes available.
    Forever,

    /// Block until the resource becomes available or the interrupt is raised.
    Interruptible(&'a Interrupt),

    /// Like [`WaitPolicy::Interruptible`], but the wait that observes the
    /// raise also lowers it, the way a delivered signal is consumed by the
    /// call it cancels.
    Signal(&'a Interrupt),
}

impl WaitPolicy<'_> {
    /// Returns true if the wait must be abandoned now.
    #[inline(always)]
    pub(crate) fn interrupted(&self) -> bool {
        match self {
            WaitPolicy::Forever => false,
            WaitPolicy::Interruptible(interrupt) => interrupt.is_raised(),
            WaitPolicy::Signal(interrupt) => interrupt.take(),
        }
    }
}

impl<'a> From<&'a Interrupt> for WaitPolicy<'a> {
    fn from(interrupt: &'a Interrupt) -> Self {
        WaitPolicy::Interruptible(interrupt)
    }
}
