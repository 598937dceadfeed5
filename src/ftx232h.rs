//! FT232H and FT2232H access through libusb.

use crate::config::DEFAULT_TIMEOUT;
use crate::error::Result;
use crate::transport::Ftx232hPort;
use crate::TIMEOUT;
use rusb::{Device, DeviceHandle, Direction, Recipient, RequestType, Speed};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Vendor and product IDs of the supported chips.
pub(crate) const FTX232H_IDS: &[(u16, u16)] = &[(0x0403, 0x6014), (0x0403, 0x6010)];

const FT2232H_PRODUCT_ID: u16 = 0x6010;

/// Only the first interface of an FT2232H is used.
const INTERFACE: u8 = 0;

/// `wIndex` addressing interface A in SIO requests.
const SIO_INDEX: u16 = 1;

const WRITE_ENDPOINT: u8 = 0x02;
const READ_ENDPOINT: u8 = 0x81;

const SIO_RESET_REQUEST: u8 = 0x00;
const SIO_RESET_SIO: u16 = 0;
const SIO_SET_BITMODE_REQUEST: u8 = 0x0b;

/// Every packet from the chip starts with two modem status bytes.
const MODEM_STATUS_LENGTH: usize = 2;

/// Transfer size before [`set_usb_parameters`] is called.
///
/// [`set_usb_parameters`]: trait.Ftx232hPort.html#tymethod.set_usb_parameters
const DEFAULT_TRANSFER_SIZE: usize = 4096;

/// An FT232H or FT2232H opened through libusb.
pub struct UsbFtx232h {
    handle: DeviceHandle<rusb::Context>,

    /// Maximum packet size of the bulk endpoints, 512 on a high-speed link.
    packet_size: usize,

    read_timeout: Duration,
    write_timeout: Duration,

    /// Raw buffer for a single bulk IN transfer, status bytes included.
    in_buffer: Vec<u8>,
    out_transfer_size: usize,

    /// Payload which arrived beyond what the last read asked for.
    pending: VecDeque<u8>,
}

impl UsbFtx232h {
    /// Opens the device, claims its first interface and resets the SIO engine.
    pub(crate) fn open(device: Device<rusb::Context>) -> Result<Self> {
        let packet_size = match device.speed() {
            Speed::High | Speed::Super | Speed::SuperPlus => 512,
            _ => 64,
        };

        let mut handle = device.open()?;
        // The kernel's serial driver binds to these chips
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(err) => return Err(err.into()),
        }
        handle.claim_interface(INTERFACE)?;

        let port = Self {
            handle,
            packet_size,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            in_buffer: vec![0; DEFAULT_TRANSFER_SIZE],
            out_transfer_size: DEFAULT_TRANSFER_SIZE,
            pending: VecDeque::new(),
        };
        port.control_out(SIO_RESET_REQUEST, SIO_RESET_SIO)?;
        Ok(port)
    }

    fn control_out(&self, request: u8, value: u16) -> Result<()> {
        self.handle.write_control(
            rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Device),
            request,
            value,
            SIO_INDEX,
            &[],
            TIMEOUT,
        )?;
        Ok(())
    }

    /// Moves buffered payload to the start of `buffer`.
    fn take_pending(&mut self, buffer: &mut [u8]) -> usize {
        let count = self.pending.len().min(buffer.len());
        for (dst, src) in buffer.iter_mut().zip(self.pending.drain(..count)) {
            *dst = src;
        }
        count
    }
}

impl Ftx232hPort for UsbFtx232h {
    /// The product string, with the channel suffix an FT2232H carries for its first interface.
    fn description(&mut self) -> Result<Vec<u8>> {
        let descriptor = self.handle.device().device_descriptor()?;
        let mut description = self
            .handle
            .read_product_string_ascii(&descriptor)?
            .into_bytes();
        if descriptor.product_id() == FT2232H_PRODUCT_ID {
            description.extend_from_slice(b" A");
        }
        Ok(description)
    }

    fn set_bit_mode(&mut self, mask: u8, mode: u8) -> Result<()> {
        self.control_out(
            SIO_SET_BITMODE_REQUEST,
            u16::from(mask) | (u16::from(mode) << 8),
        )
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<()> {
        self.read_timeout = read;
        self.write_timeout = write;
        Ok(())
    }

    /// The IN size is rounded up to whole packets so status bytes always sit at packet starts.
    fn set_usb_parameters(
        &mut self,
        in_transfer_size: usize,
        out_transfer_size: usize,
    ) -> Result<()> {
        self.in_buffer
            .resize(whole_packets(in_transfer_size, self.packet_size), 0);
        self.out_transfer_size = out_transfer_size.max(1);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let deadline = Instant::now() + self.write_timeout;
        let mut written = 0;
        for piece in data.chunks(self.out_transfer_size) {
            // libusb treats a zero timeout as infinite
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.handle.write_bulk(WRITE_ENDPOINT, piece, remaining) {
                Ok(length) => {
                    written += length;
                    if length < piece.len() {
                        break;
                    }
                }
                Err(rusb::Error::Timeout) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(written)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let deadline = Instant::now() + self.read_timeout;
        let mut filled = self.take_pending(buffer);
        while filled < buffer.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let length = match self
                .handle
                .read_bulk(READ_ENDPOINT, &mut self.in_buffer, remaining)
            {
                Ok(length) => length,
                Err(rusb::Error::Timeout) => break,
                Err(err) => return Err(err.into()),
            };

            let payload = strip_modem_status(&mut self.in_buffer[..length], self.packet_size);
            let count = payload.min(buffer.len() - filled);
            buffer[filled..filled + count].copy_from_slice(&self.in_buffer[..count]);
            self.pending.extend(&self.in_buffer[count..payload]);
            filled += count;
        }
        Ok(filled)
    }

    fn close(mut self) -> Result<()> {
        self.handle.release_interface(INTERFACE)?;
        Ok(())
    }
}

/// Removes the modem status bytes from every packet of a raw bulk IN transfer, moving the payload
/// to the start of `data`. Returns the payload length.
fn strip_modem_status(data: &mut [u8], packet_size: usize) -> usize {
    let mut payload = 0;
    for start in (0..data.len()).step_by(packet_size) {
        let end = (start + packet_size).min(data.len());
        if end - start > MODEM_STATUS_LENGTH {
            data.copy_within(start + MODEM_STATUS_LENGTH..end, payload);
            payload += end - start - MODEM_STATUS_LENGTH;
        }
    }
    payload
}

/// Rounds a transfer size up to whole packets, saturating at the largest packet multiple.
fn whole_packets(transfer_size: usize, packet_size: usize) -> usize {
    let transfer_size = transfer_size.max(1);
    let packets = transfer_size / packet_size + usize::from(transfer_size % packet_size != 0);
    packets
        .checked_mul(packet_size)
        .unwrap_or(usize::MAX / packet_size * packet_size)
}
