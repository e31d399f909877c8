use crate::error::DeviceError;
use crate::params::DeviceParams;
use mq_common::ioctl;
use mq_core::{BoundedMessageQueue, Interrupt, WaitPolicy};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// A loaded message queue device.
///
/// Owns the queue from [`MessageDevice::load`] until
/// [`MessageDevice::unload`]. Sessions keep a handle to the queue, so a
/// session that outlives the device gets [`DeviceError::NoDevice`] instead of
/// touching freed storage.
pub struct MessageDevice {
    queue: Arc<BoundedMessageQueue>,
    next_session: AtomicU64,
}

impl MessageDevice {
    /// Creates the queue described by `params`.
    pub fn load(params: &DeviceParams) -> Result<Self, DeviceError> {
        let queue = BoundedMessageQueue::with_config(&params.queue_config()).inspect_err(|err| {
            warn!(%err, "failed to allocate message queue");
        })?;
        info!(
            fifo_size = params.fifo_size,
            fifo_elemsz = params.fifo_elemsz,
            "device loaded"
        );
        Ok(Self {
            queue: Arc::new(queue),
            next_session: AtomicU64::new(0),
        })
    }

    /// Opens a new session. Opening carries no queue state.
    pub fn open(&self) -> Session {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, "open");
        Session {
            id,
            queue: Arc::clone(&self.queue),
            interrupt: Arc::new(Interrupt::new()),
        }
    }

    /// The queue behind this device.
    pub fn queue(&self) -> &Arc<BoundedMessageQueue> {
        &self.queue
    }

    /// Destroys the queue.
    ///
    /// Every reader and writer should be done by now; a stray one still
    /// blocked is woken with [`DeviceError::NoDevice`].
    pub fn unload(self) -> Result<(), DeviceError> {
        self.queue.destroy()?;
        info!("device unloaded");
        Ok(())
    }
}

/// One open handle on the device.
///
/// Dropping the session is the close. Each session carries its own
/// [`Interrupt`], the stand-in for a signal delivered to the task blocked
/// in `read` or `write`.
pub struct Session {
    id: u64,
    queue: Arc<BoundedMessageQueue>,
    interrupt: Arc<Interrupt>,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Handle for interrupting this session's blocked calls from elsewhere.
    pub fn interrupter(&self) -> Arc<Interrupt> {
        Arc::clone(&self.interrupt)
    }

    /// Queues the first `count` bytes of `buf` as one message.
    ///
    /// The buffer is checked before the queue is touched. A pending interrupt
    /// is consumed by the wait that observes it, so a raise arriving after
    /// that point is kept for the next call.
    ///
    /// # Returns
    ///
    /// The number of bytes queued, which is `count` cut down to the element
    /// size.
    pub fn write(&self, buf: &[u8], count: usize) -> Result<usize, DeviceError> {
        let staged = buf.get(..count).ok_or(DeviceError::Fault {
            count,
            len: buf.len(),
        })?;
        debug!(session = self.id, count, "write");
        self.queue
            .enqueue(staged, WaitPolicy::Signal(&self.interrupt))
            .map_err(DeviceError::from)
    }

    /// Takes the next message and copies up to `count` bytes of it into
    /// `buf`.
    ///
    /// Bytes of the message beyond `count` are discarded.
    pub fn read(&self, buf: &mut [u8], count: usize) -> Result<usize, DeviceError> {
        if count > buf.len() {
            return Err(DeviceError::Fault {
                count,
                len: buf.len(),
            });
        }
        debug!(session = self.id, count, "read");
        let message = self
            .queue
            .dequeue(count, WaitPolicy::Signal(&self.interrupt))?;
        buf[..message.len()].copy_from_slice(&message);
        Ok(message.len())
    }

    /// Executes a control command.
    ///
    /// The command word is validated field by field before the queue is
    /// consulted: wrong magic, a number above the highest known command, or a
    /// transfer size other than the command's own is rejected.
    ///
    /// # Returns
    ///
    /// The command's result value; for [`ioctl::GET_ELEMSZ`] the maximum
    /// payload bytes per message.
    pub fn ioctl(&self, cmd: u32) -> Result<i64, DeviceError> {
        let unsupported = DeviceError::UnsupportedControl { cmd };
        if ioctl::kind(cmd) != ioctl::MAGIC || ioctl::nr(cmd) > ioctl::MAXNR {
            warn!(session = self.id, cmd, "rejected control command");
            return Err(unsupported);
        }

        match cmd {
            ioctl::GET_ELEMSZ => {
                let elem_size = self.queue.query_max_element_size()?;
                i64::try_from(elem_size).map_err(|_| DeviceError::InvalidArgument)
            }
            _ => {
                warn!(session = self.id, cmd, "rejected control command");
                Err(unsupported)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(session = self.id, "close");
    }
}
