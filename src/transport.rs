//! The capabilities the session needs from the two driver families.
//!
//! Each family is described by a minimal trait following the shape of its vendor driver API. A
//! [`Backend`] hands out opened devices of either family by index, so the locator and the session
//! can run against libusb ([`Context`]) or against a scripted stand-in.
//!
//! [`Backend`]: trait.Backend.html
//! [`Context`]: ../struct.Context.html

use crate::device::DeviceKind;
use crate::error::Result;
use std::time::Duration;

/// FT60X pipe carrying data from the host to the device.
pub const FT60X_WRITE_PIPE: u8 = 0x02;

/// FT60X pipe carrying data from the device to the host.
pub const FT60X_READ_PIPE: u8 = 0x82;

/// Bit-mode pin mask used to enter synchronous FIFO mode (all pins driven by the FIFO logic).
pub const FTX232H_FIFO_MASK: u8 = 0xFF;

/// Bit-mode selecting the synchronous 245 FIFO.
pub const FTX232H_SYNC_FIFO_MODE: u8 = 0x40;

/// An opened FT232H or FT2232H.
pub trait Ftx232hPort {
    /// The device description the driver reports, as raw ASCII bytes.
    fn description(&mut self) -> Result<Vec<u8>>;

    fn set_bit_mode(&mut self, mask: u8, mode: u8) -> Result<()>;

    /// Sets both transfer timeouts. The driver has no way of setting only one of them.
    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<()>;

    /// Sizes the driver's USB transfer buffers.
    fn set_usb_parameters(&mut self, in_transfer_size: usize, out_transfer_size: usize)
        -> Result<()>;

    /// Blocks until all of `data` is accepted or the write timeout elapses. Returns the number of
    /// bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Blocks until `buffer` is full or the read timeout elapses. Returns the number of bytes
    /// placed at the start of `buffer`.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    fn close(self) -> Result<()>;
}

/// An opened FT600 or FT601.
pub trait Ft60xPort {
    /// Version of the installed vendor driver, if the binding goes through one.
    fn driver_version(&mut self) -> Result<Option<u32>>;

    /// The device description the driver reports, as raw ASCII bytes.
    fn description(&mut self) -> Result<Vec<u8>>;

    /// The raw channel configuration index from the chip configuration.
    fn channel_config(&mut self) -> Result<u8>;

    /// The `bcdUSB` field of the device descriptor, e.g. `0x0310` for a SuperSpeed link.
    fn usb_version(&mut self) -> Result<u16>;

    fn set_pipe_timeout(&mut self, pipe: u8, timeout: Duration) -> Result<()>;

    /// Writes `data` to a pipe. Returns the number of bytes accepted before the pipe's timeout.
    fn write_pipe(&mut self, pipe: u8, data: &[u8]) -> Result<usize>;

    /// Reads up to `buffer.len()` bytes from a pipe. Returns 0 when nothing arrived before the
    /// pipe's timeout, which does not necessarily mean the stream has ended.
    fn read_pipe(&mut self, pipe: u8, buffer: &mut [u8]) -> Result<usize>;

    fn close(self) -> Result<()>;
}

/// Opens devices of both families by enumeration index.
pub trait Backend {
    type Ftx232h: Ftx232hPort;
    type Ft60x: Ft60xPort;

    /// Opens the FTX232H at `index`. `Ok(None)` means there is no device at that index, and
    /// [`Error::DriverUnavailable`] that the whole family cannot be used.
    ///
    /// [`Error::DriverUnavailable`]: ../enum.Error.html#variant.DriverUnavailable
    fn open_ftx232h(&mut self, index: u8) -> Result<Option<Self::Ftx232h>>;

    /// Opens the FT60X at `index`, with the same conventions as [`open_ftx232h`].
    ///
    /// [`open_ftx232h`]: #tymethod.open_ftx232h
    fn open_ft60x(&mut self, index: u8) -> Result<Option<Self::Ft60x>>;
}

/// An opened device of either family.
pub enum Link<A, B> {
    Ftx232h(A),
    Ft60x(B),
}

impl<A, B> Link<A, B> {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Link::Ftx232h(_) => DeviceKind::Ftx232h,
            Link::Ft60x(_) => DeviceKind::Ft60x,
        }
    }
}
