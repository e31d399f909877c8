use mq_core::QueueError;
use thiserror::Error;

/// Interrupted system call; the caller should restart it.
pub const ERESTARTSYS: i32 = 512;
/// Bad address.
pub const EFAULT: i32 = 14;
/// Inappropriate ioctl for device.
pub const ENOTTY: i32 = 25;
/// Out of memory.
pub const ENOMEM: i32 = 12;
/// No such device.
pub const ENODEV: i32 = 19;
/// Invalid argument.
pub const EINVAL: i32 = 22;

/// Errors returned by device operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// A blocking wait was interrupted; no data moved.
    #[error("interrupted, restart the call")]
    Restart,

    /// The caller's buffer cannot hold the requested byte count.
    #[error("bad buffer: {count} bytes requested, {len} available")]
    Fault { count: usize, len: usize },

    /// Unknown command, or a command whose fields do not match.
    #[error("unsupported control command {cmd:#010x}")]
    UnsupportedControl { cmd: u32 },

    /// The queue storage could not be allocated at load time.
    #[error("out of memory for queue storage")]
    OutOfMemory,

    /// The device has been unloaded.
    #[error("device unloaded")]
    NoDevice,

    /// The load-time geometry is unusable.
    #[error("invalid device parameters")]
    InvalidArgument,
}

impl DeviceError {
    /// Positive errno value a driver would return negated.
    pub fn errno(&self) -> i32 {
        match self {
            DeviceError::Restart => ERESTARTSYS,
            DeviceError::Fault { .. } => EFAULT,
            DeviceError::UnsupportedControl { .. } => ENOTTY,
            DeviceError::OutOfMemory => ENOMEM,
            DeviceError::NoDevice => ENODEV,
            DeviceError::InvalidArgument => EINVAL,
        }
    }
}

impl From<QueueError> for DeviceError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Interrupted => DeviceError::Restart,
            QueueError::AllocationError { .. } => DeviceError::OutOfMemory,
            QueueError::UseAfterDestroy => DeviceError::NoDevice,
            QueueError::InvalidConfiguration { .. } => DeviceError::InvalidArgument,
        }
    }
}
