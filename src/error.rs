use crate::device::{DeviceDescriptor, DeviceKind};
use std::result::Result as StdResult;
use thiserror::Error;

/// Errors which can occur during device setup and communication.
///
/// Short transfers are never reported through this type: [`Session::send`] and
/// [`Session::recv`] return whatever the transport moved before its timeout elapsed.
///
/// [`Session::send`]: struct.Session.html#method.send
/// [`Session::recv`]: struct.Session.html#method.recv
#[derive(Debug, Error)]
pub enum Error {
    /// The driver layer of a device family could not be loaded.
    #[error("Failed to load the {kind} driver layer: {reason}")]
    DriverUnavailable { kind: DeviceKind, reason: String },

    /// No device of the requested family carried the requested product name.
    #[error("Could not open {} USB device: {}", .0.kind, .0.product_name)]
    NotFound(DeviceDescriptor),

    /// The installed driver is older than the minimum version known to transfer data reliably.
    #[error("Old {kind} driver version 0x{found:08x} (need 0x{required:08x}). Please update driver!")]
    OutdatedDriver {
        kind: DeviceKind,
        found: u32,
        required: u32,
    },

    /// The chip is not configured for a single synchronous 245-FIFO channel.
    #[error("This {kind} is not in sync-245-fifo mode because number of channel is not 1! (numChannel={channels})")]
    ChannelConfig { kind: DeviceKind, channels: u8 },

    /// The requested product name cannot match a USB descriptor because it is not ASCII.
    #[error("Product name {0:?} is not ASCII")]
    InvalidProductName(String),

    /// None of the candidates yielded a usable device.
    #[error("Could not open USB device")]
    NoDevice,

    /// The device answered a configuration request with less data than expected.
    #[error("Malformed response from device")]
    MalformedResponse,

    /// The session configuration contains a value the transfer loops cannot work with.
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(&'static str),

    /// An error occurred during the raw USB communication.
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

impl Error {
    /// Returns whether the error ends the whole device search.
    ///
    /// A missing driver layer or a missing device only rules out a single candidate, everything
    /// else requires operator action.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::DriverUnavailable { .. } | Error::NotFound(_))
    }
}

/// Shorthand for a Result with the crate's own Error type.
pub type Result<T> = StdResult<T, Error>;
