//! This crate talks to an FPGA (or any other logic) behind an FTDI USB chip running in synchronous
//! 245-FIFO mode and exposes the link as a pair of plain byte streams. Two chip families are
//! supported:
//!
//! * FT232H and FT2232H (chunks of 64 KiB, joint read/write timeout)
//! * FT600 and FT601 (chunks of 1 MiB, per-pipe timeouts)
//!
//! The caller lists the devices it is prepared to work with and the first one found is opened. The
//! rest of the program does not need to know which chip it got.
//!
//! # Example: Loopback
//! ```rust, no_run
//! use sync245::{Context, DeviceDescriptor, SessionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Try an FT232H first, then an FT600/FT601, both with their factory product names
//! let mut context = Context::new()?;
//! let mut session = context.open(&DeviceDescriptor::defaults(), SessionConfig::default())?;
//!
//! // Sends and receives are bounded by timeouts and may come up short
//! let sent = session.send(b"0123456789abcdef")?;
//! let received = session.recv(sent)?;
//! println!("recv {} B: {:?}", received.len(), received);
//!
//! session.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Devices are reached through libusb by default. The locator and the session only depend on the
//! [`Backend`] trait, so other driver bindings can be plugged in.
//!
//! [`Backend`]: transport/trait.Backend.html

mod config;
mod context;
mod device;
mod error;
mod ft60x;
mod ftx232h;
mod locator;
mod session;
pub mod transport;

pub use config::{
    SessionConfig, DEFAULT_TIMEOUT, DEFAULT_ZERO_READ_LIMIT, FT60X_CHUNK_SIZE, FTX232H_CHUNK_SIZE,
};
pub use context::Context;
pub use device::{DeviceDescriptor, DeviceKind, FT60X_DEFAULT_NAME, FTX232H_DEFAULT_NAME};
pub use error::{Error, Result};
pub use ft60x::UsbFt60x;
pub use ftx232h::UsbFtx232h;
pub use locator::{locate, Located, FT60X_MIN_DRIVER_VERSION, MAX_DEVICES};
pub use rusb;
pub use session::Session;

/// Timeout for control transfers and FT60X read requests.
const TIMEOUT: std::time::Duration = std::time::Duration::from_millis(500);
