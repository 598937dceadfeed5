//! FT600 and FT601 access through libusb.
//!
//! The chips expose a command interface next to the data interface. Data written to an OUT pipe
//! goes straight to the bulk endpoint, but the chip only returns data on an IN pipe after a read
//! request naming the pipe and the length has been sent over the command endpoint.

use crate::config::DEFAULT_TIMEOUT;
use crate::error::{Error, Result};
use crate::transport::{Ft60xPort, FT60X_READ_PIPE, FT60X_WRITE_PIPE};
use crate::TIMEOUT;
use rusb::{Device, DeviceHandle, Direction, Recipient, RequestType};
use std::convert::TryFrom;
use std::time::Duration;

/// Vendor and product IDs of the supported chips.
pub(crate) const FT60X_IDS: &[(u16, u16)] = &[(0x0403, 0x601e), (0x0403, 0x601f)];

const COMMAND_INTERFACE: u8 = 0;
const DATA_INTERFACE: u8 = 1;

const COMMAND_ENDPOINT: u8 = 0x01;

const GET_CHIP_CONFIGURATION_REQUEST: u8 = 0xcf;

/// Size of the chip configuration block.
const CHIP_CONFIGURATION_LENGTH: usize = 152;

/// Offset of the channel configuration index within the chip configuration block.
const CHANNEL_CONFIG_OFFSET: usize = 139;

const READ_REQUEST_COMMAND: u8 = 0x01;

/// An FT600 or FT601 opened through libusb.
pub struct UsbFt60x {
    handle: DeviceHandle<rusb::Context>,
    read_timeout: Duration,
    write_timeout: Duration,

    /// Sequence number of the next read request.
    request_index: u32,
}

impl UsbFt60x {
    /// Opens the device and claims its command and data interfaces.
    pub(crate) fn open(device: Device<rusb::Context>) -> Result<Self> {
        let mut handle = device.open()?;
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(err) => return Err(err.into()),
        }
        handle.claim_interface(COMMAND_INTERFACE)?;
        handle.claim_interface(DATA_INTERFACE)?;

        Ok(Self {
            handle,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            request_index: 0,
        })
    }

    fn pipe_timeout(&self, pipe: u8) -> Result<Duration> {
        match pipe {
            FT60X_WRITE_PIPE => Ok(self.write_timeout),
            FT60X_READ_PIPE => Ok(self.read_timeout),
            _ => Err(Error::Usb(rusb::Error::InvalidParam)),
        }
    }
}

impl Ft60xPort for UsbFt60x {
    /// libusb talks to the chip directly, there is no vendor driver whose version would matter.
    fn driver_version(&mut self) -> Result<Option<u32>> {
        Ok(None)
    }

    fn description(&mut self) -> Result<Vec<u8>> {
        let descriptor = self.handle.device().device_descriptor()?;
        Ok(self
            .handle
            .read_product_string_ascii(&descriptor)?
            .into_bytes())
    }

    fn channel_config(&mut self) -> Result<u8> {
        let mut configuration = [0u8; CHIP_CONFIGURATION_LENGTH];
        let length = self.handle.read_control(
            rusb::request_type(Direction::In, RequestType::Vendor, Recipient::Device),
            GET_CHIP_CONFIGURATION_REQUEST,
            1,
            0,
            &mut configuration,
            TIMEOUT,
        )?;
        if length <= CHANNEL_CONFIG_OFFSET {
            return Err(Error::MalformedResponse);
        }
        Ok(configuration[CHANNEL_CONFIG_OFFSET])
    }

    fn usb_version(&mut self) -> Result<u16> {
        let version = self.handle.device().device_descriptor()?.usb_version();
        Ok((u16::from(version.major()) << 8)
            | (u16::from(version.minor()) << 4)
            | u16::from(version.sub_minor()))
    }

    fn set_pipe_timeout(&mut self, pipe: u8, timeout: Duration) -> Result<()> {
        match pipe {
            FT60X_WRITE_PIPE => self.write_timeout = timeout,
            FT60X_READ_PIPE => self.read_timeout = timeout,
            _ => return Err(Error::Usb(rusb::Error::InvalidParam)),
        }
        Ok(())
    }

    fn write_pipe(&mut self, pipe: u8, data: &[u8]) -> Result<usize> {
        let timeout = self.pipe_timeout(pipe)?;
        timed_out_as_empty(self.handle.write_bulk(pipe, data, timeout))
    }

    fn read_pipe(&mut self, pipe: u8, buffer: &mut [u8]) -> Result<usize> {
        let timeout = self.pipe_timeout(pipe)?;
        let length = u32::try_from(buffer.len()).map_err(|_| rusb::Error::InvalidParam)?;

        let request = read_request(self.request_index, pipe, length);
        self.request_index = self.request_index.wrapping_add(1);
        let requested = self.handle.write_bulk(COMMAND_ENDPOINT, &request, TIMEOUT);
        if timed_out_as_empty(requested)? == 0 {
            return Ok(0);
        }

        timed_out_as_empty(self.handle.read_bulk(pipe, buffer, timeout))
    }

    fn close(mut self) -> Result<()> {
        self.handle.release_interface(DATA_INTERFACE)?;
        self.handle.release_interface(COMMAND_INTERFACE)?;
        Ok(())
    }
}

/// Encodes the command asking the chip to return `length` bytes on `pipe`.
fn read_request(index: u32, pipe: u8, length: u32) -> [u8; 20] {
    let mut request = [0u8; 20];
    request[0..4].copy_from_slice(&index.to_le_bytes());
    request[4] = pipe;
    request[5] = READ_REQUEST_COMMAND;
    request[8..12].copy_from_slice(&length.to_le_bytes());
    request
}

/// A bulk transfer which timed out moved no data, which is a short count rather than an error.
fn timed_out_as_empty(result: rusb::Result<usize>) -> Result<usize> {
    match result {
        Ok(length) => Ok(length),
        Err(rusb::Error::Timeout) => Ok(0),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_empty_transfers() {
        assert_eq!(timed_out_as_empty(Ok(20)).unwrap(), 20);
        assert_eq!(timed_out_as_empty(Err(rusb::Error::Timeout)).unwrap(), 0);
        assert!(matches!(
            timed_out_as_empty(Err(rusb::Error::NoDevice)),
            Err(Error::Usb(rusb::Error::NoDevice))
        ));
    }

    #[test]
    fn read_request_layout() {
        let request = read_request(0x0102_0304, FT60X_READ_PIPE, 0x0010_0000);
        assert_eq!(
            request,
            [
                0x04, 0x03, 0x02, 0x01, 0x82, 0x01, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ]
        );
    }
}
