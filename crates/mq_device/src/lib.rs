//! Character-device style front end for the bounded message queue.
//!
//! Models the layer a driver puts around the queue: load-time parameters,
//! device load and unload, per-open sessions with `read`, `write` and
//! `ioctl`, and the errno values those calls report. The queue itself never
//! sees user buffers or command words; this crate checks both before the
//! queue is touched.

/// Device lifecycle and per-open sessions.
///
/// A [`MessageDevice`](device::MessageDevice) owns the queue between load
/// and unload. Each open returns a [`Session`](device::Session) that forwards
/// reads and writes to the queue and answers control commands.
pub mod device;

/// Errors reported to device callers and their errno values.
pub mod error;

/// Parser for load-time parameter strings.
///
/// Accepts whitespace separated `name=value` pairs such as
/// `"fifo_size=10 fifo_elemsz=100"` and produces the queue geometry.
pub mod params;

pub use device::{MessageDevice, Session};
pub use error::DeviceError;
pub use params::DeviceParams;
