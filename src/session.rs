use crate::config::SessionConfig;
use crate::context::Context;
use crate::device::{DeviceDescriptor, DeviceKind};
use crate::error::Result;
use crate::locator::{locate, Located};
use crate::transport::{Backend, Ft60xPort, Ftx232hPort, Link, FT60X_READ_PIPE, FT60X_WRITE_PIPE};
use log::{debug, warn};
use std::time::Duration;

/// Lowest `bcdUSB` of a SuperSpeed link.
const USB3_VERSION: u16 = 0x0300;

/// An opened device in synchronous 245-FIFO mode, seen as a pair of byte streams.
///
/// The session owns the device until [`close`] is called. Transfers are split into chunks sized
/// for the chip family and every chunk is bounded by the configured timeout, so [`send`] and
/// [`recv`] may move fewer bytes than asked for. That is not an error: the caller compares the
/// returned length with the requested one.
///
/// [`close`]: #method.close
/// [`send`]: #method.send
/// [`recv`]: #method.recv
pub struct Session<B: Backend = Context> {
    link: Link<B::Ftx232h, B::Ft60x>,
    descriptor: DeviceDescriptor,
    chunk_size: usize,
    recv_timeout: Duration,
    send_timeout: Duration,
    zero_read_limit: u32,
}

impl<B: Backend> Session<B> {
    /// Opens the first device out of `candidates` (see [`locate`]) and configures it.
    ///
    /// [`locate`]: fn.locate.html
    pub fn open(
        backend: &mut B,
        candidates: &[DeviceDescriptor],
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let located = locate(backend, candidates)?;
        Self::from_located(located, config)
    }

    /// Configures an already located device: both timeouts are applied, an FTX232H gets transfer
    /// buffers of four chunks and an FT60X on a link slower than USB 3 is reported.
    pub fn from_located(located: Located<B>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let kind = located.link.kind();
        let mut session = Self {
            link: located.link,
            descriptor: located.descriptor,
            chunk_size: config.chunk_size(kind),
            recv_timeout: config.recv_timeout,
            send_timeout: config.send_timeout,
            zero_read_limit: config.zero_read_limit,
        };

        session.set_recv_timeout(config.recv_timeout)?;
        session.set_send_timeout(config.send_timeout)?;

        match &mut session.link {
            Link::Ftx232h(port) => {
                let transfer_size = session.chunk_size * 4;
                port.set_usb_parameters(transfer_size, transfer_size)?;
            }
            Link::Ft60x(port) => {
                if port.usb_version()? < USB3_VERSION {
                    warn!("Device is NOT connected using USB3.0 cable or port!");
                }
            }
        }

        Ok(session)
    }

    pub fn kind(&self) -> DeviceKind {
        self.link.kind()
    }

    /// The candidate the device was found with.
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn product_name(&self) -> &str {
        &self.descriptor.product_name
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Sets the upper bound for a single chunk read.
    pub fn set_recv_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.recv_timeout = timeout;
        match &mut self.link {
            Link::Ftx232h(port) => port.set_timeouts(self.recv_timeout, self.send_timeout),
            Link::Ft60x(port) => port.set_pipe_timeout(FT60X_READ_PIPE, timeout),
        }
    }

    /// Sets the upper bound for a single chunk write.
    pub fn set_send_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.send_timeout = timeout;
        match &mut self.link {
            Link::Ftx232h(port) => port.set_timeouts(self.recv_timeout, self.send_timeout),
            Link::Ft60x(port) => port.set_pipe_timeout(FT60X_WRITE_PIPE, timeout),
        }
    }

    /// Sends `data` chunk by chunk and returns the number of bytes the device accepted.
    ///
    /// Sending stops after the first chunk the device did not take completely, since the ones
    /// after it would stall as well. A result smaller than `data.len()` therefore means the device
    /// could not keep up within the send timeout.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        let chunk_size = self.chunk_size;
        match &mut self.link {
            Link::Ftx232h(port) => send_chunks(data, chunk_size, |chunk| port.write(chunk)),
            Link::Ft60x(port) => send_chunks(data, chunk_size, |chunk| {
                port.write_pipe(FT60X_WRITE_PIPE, chunk)
            }),
        }
    }

    /// Receives up to `len` bytes.
    ///
    /// An FTX232H read already waits for the receive timeout, so the first chunk that comes back
    /// short ends the transfer. An FT60X pipe read may come back empty once without the stream
    /// having ended; the transfer only ends after `zero_read_limit` empty reads in a row.
    pub fn recv(&mut self, len: usize) -> Result<Vec<u8>> {
        let chunk_size = self.chunk_size;
        let zero_read_limit = self.zero_read_limit;
        match &mut self.link {
            Link::Ftx232h(port) => recv_until_short(len, chunk_size, |buffer| port.read(buffer)),
            Link::Ft60x(port) => recv_until_idle(len, chunk_size, zero_read_limit, |buffer| {
                port.read_pipe(FT60X_READ_PIPE, buffer)
            }),
        }
    }

    /// Releases the device.
    pub fn close(self) -> Result<()> {
        debug!("Closing {}", self.descriptor);
        match self.link {
            Link::Ftx232h(port) => port.close(),
            Link::Ft60x(port) => port.close(),
        }
    }
}

fn send_chunks<F>(data: &[u8], chunk_size: usize, mut write: F) -> Result<usize>
where
    F: FnMut(&[u8]) -> Result<usize>,
{
    let mut sent = 0;
    for chunk in data.chunks(chunk_size) {
        let accepted = write(chunk)?.min(chunk.len());
        sent += accepted;
        if accepted < chunk.len() {
            debug!(
                "Short write after {} of {} bytes, not sending the rest",
                sent,
                data.len()
            );
            break;
        }
    }
    Ok(sent)
}

fn recv_until_short<F>(len: usize, chunk_size: usize, mut read: F) -> Result<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    let mut data = vec![0u8; len];
    let mut received = 0;
    for chunk in data.chunks_mut(chunk_size) {
        let requested = chunk.len();
        let got = read(chunk)?.min(requested);
        received += got;
        if got < requested {
            debug!("Short read after {} of {} bytes", received, len);
            break;
        }
    }
    data.truncate(received);
    Ok(data)
}

fn recv_until_idle<F>(
    len: usize,
    chunk_size: usize,
    zero_read_limit: u32,
    mut read: F,
) -> Result<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    let mut data = vec![0u8; len];
    let mut received = 0;
    let mut empty_reads = 0;
    while received < len {
        let end = received + chunk_size.min(len - received);
        let got = read(&mut data[received..end])?.min(end - received);
        if got > 0 {
            empty_reads = 0;
            received += got;
        } else {
            empty_reads += 1;
            if empty_reads >= zero_read_limit {
                debug!(
                    "{} empty reads in a row after {} of {} bytes",
                    empty_reads, received, len
                );
                break;
            }
        }
    }
    data.truncate(received);
    Ok(data)
}
