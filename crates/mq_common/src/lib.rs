//! Common definitions shared by the message queue core, the device layer and
//! the host tools.
//!
//! This crate carries the load-time parameter defaults and the binary layout
//! of control commands. It has no dependencies and builds without `std`, so
//! the same constants can be used on both sides of the device boundary.

#![no_std]

/// Load-time parameters for the message queue device.
///
/// The queue geometry is fixed when the device is loaded: a number of slots
/// and a per-message payload limit. Both are supplied once as `name=value`
/// pairs and never change for the lifetime of the queue.
pub mod params {
    /// Number of slots in the ring when no `fifo_size` parameter is given.
    pub const DEFAULT_FIFO_SIZE: usize = 10;

    /// Maximum payload bytes per message when no `fifo_elemsz` parameter is
    /// given.
    pub const DEFAULT_FIFO_ELEMSZ: usize = 100;

    /// Parameter name selecting the number of slots.
    pub const FIFO_SIZE: &str = "fifo_size";

    /// Parameter name selecting the maximum payload size per message.
    pub const FIFO_ELEMSZ: &str = "fifo_elemsz";
}

/// Control command encoding.
///
/// Commands follow the classic 32-bit layout used by character devices:
///
/// ```text
///  31 30 | 29 ........ 16 | 15 ..... 8 | 7 ...... 0
///   dir  |      size      |    type    |   number
/// ```
///
/// `type` is a per-driver magic byte, `number` selects the command and
/// `size` declares how many bytes the command transfers. Decoders reject a
/// command whose fields do not match before any queue state is touched.
pub mod ioctl {
    /// Number of bits holding the command number.
    pub const NR_BITS: u32 = 8;

    /// Number of bits holding the magic type byte.
    pub const TYPE_BITS: u32 = 8;

    /// Number of bits holding the declared transfer size.
    pub const SIZE_BITS: u32 = 14;

    /// Number of bits holding the transfer direction.
    pub const DIR_BITS: u32 = 2;

    pub const NR_SHIFT: u32 = 0;
    pub const TYPE_SHIFT: u32 = NR_SHIFT + NR_BITS;
    pub const SIZE_SHIFT: u32 = TYPE_SHIFT + TYPE_BITS;
    pub const DIR_SHIFT: u32 = SIZE_SHIFT + SIZE_BITS;

    /// No data transferred.
    pub const DIR_NONE: u32 = 0;

    /// Caller writes data to the device.
    pub const DIR_WRITE: u32 = 1;

    /// Caller reads data from the device.
    pub const DIR_READ: u32 = 2;

    /// Magic type byte identifying this driver's commands.
    pub const MAGIC: u8 = b'k';

    /// Highest command number understood by the driver.
    pub const MAXNR: u8 = 1;

    /// Transfer size of the element-size query (a C `int`).
    pub const GET_ELEMSZ_SIZE: u32 = 4;

    /// Returns the maximum payload size per message.
    pub const GET_ELEMSZ: u32 = encode(DIR_READ, MAGIC, 1, GET_ELEMSZ_SIZE);

    /// Packs the four command fields into a single command word.
    ///
    /// Fields wider than their slot are masked, matching what a C macro
    /// expansion would produce.
    pub const fn encode(dir: u32, ty: u8, nr: u8, size: u32) -> u32 {
        ((dir & mask(DIR_BITS)) << DIR_SHIFT)
            | ((size & mask(SIZE_BITS)) << SIZE_SHIFT)
            | ((ty as u32) << TYPE_SHIFT)
            | ((nr as u32) << NR_SHIFT)
    }

    /// Extracts the transfer direction.
    pub const fn dir(cmd: u32) -> u32 {
        (cmd >> DIR_SHIFT) & mask(DIR_BITS)
    }

    /// Extracts the magic type byte.
    pub const fn kind(cmd: u32) -> u8 {
        ((cmd >> TYPE_SHIFT) & mask(TYPE_BITS)) as u8
    }

    /// Extracts the command number.
    pub const fn nr(cmd: u32) -> u8 {
        ((cmd >> NR_SHIFT) & mask(NR_BITS)) as u8
    }

    /// Extracts the declared transfer size.
    pub const fn size(cmd: u32) -> u32 {
        (cmd >> SIZE_SHIFT) & mask(SIZE_BITS)
    }

    const fn mask(bits: u32) -> u32 {
        (1 << bits) - 1
    }

}
