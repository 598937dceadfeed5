//! A scripted stand-in for both driver families.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use sync245::transport::{Backend, Ft60xPort, Ftx232hPort};
use sync245::{DeviceKind, Error, Result};

/// Driver calls made on a device, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BitMode(u8, u8),
    Timeouts(Duration, Duration),
    PipeTimeout(u8, Duration),
    UsbParameters(usize, usize),
    Write(usize),
    Read(usize),
    Close,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

#[derive(Clone)]
pub struct MockDevice {
    pub description: Vec<u8>,
    pub driver_version: Option<u32>,
    pub channel_config: u8,
    pub usb_version: u16,

    /// Whether closing the device reports an error.
    pub close_fails: bool,

    /// Whether written bytes come back on the read side.
    pub loopback: bool,

    /// Bytes waiting to be read.
    pub rx: VecDeque<u8>,

    /// Upper bound for each successive read. Reads are unbounded once the list is used up.
    pub read_limits: VecDeque<usize>,

    /// Upper bound for each successive write. Writes are accepted fully once the list is used up.
    pub write_limits: VecDeque<usize>,

    pub calls: CallLog,
}

impl MockDevice {
    /// A single-channel, SuperSpeed device without a vendor driver.
    pub fn new(description: &str, calls: &CallLog) -> Self {
        Self {
            description: description.as_bytes().to_vec(),
            driver_version: None,
            channel_config: 2,
            usb_version: 0x0310,
            close_fails: false,
            loopback: false,
            rx: VecDeque::new(),
            read_limits: VecDeque::new(),
            write_limits: VecDeque::new(),
            calls: calls.clone(),
        }
    }

    pub fn loopback(mut self) -> Self {
        self.loopback = true;
        self
    }

    pub fn with_rx(mut self, data: &[u8]) -> Self {
        self.rx.extend(data);
        self
    }

    pub fn with_read_limits(mut self, limits: &[usize]) -> Self {
        self.read_limits.extend(limits);
        self
    }

    pub fn with_write_limits(mut self, limits: &[usize]) -> Self {
        self.write_limits.extend(limits);
        self
    }

    pub fn with_channel_config(mut self, config: u8) -> Self {
        self.channel_config = config;
        self
    }

    pub fn with_driver_version(mut self, version: u32) -> Self {
        self.driver_version = Some(version);
        self
    }

    pub fn with_usb_version(mut self, version: u16) -> Self {
        self.usb_version = version;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.close_fails = true;
        self
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn do_write(&mut self, data: &[u8]) -> usize {
        self.record(Call::Write(data.len()));
        let limit = self.write_limits.pop_front().unwrap_or(usize::MAX);
        let accepted = data.len().min(limit);
        if self.loopback {
            self.rx.extend(&data[..accepted]);
        }
        accepted
    }

    fn do_close(&self) -> Result<()> {
        self.record(Call::Close);
        if self.close_fails {
            return Err(Error::Usb(sync245::rusb::Error::Io));
        }
        Ok(())
    }

    fn do_read(&mut self, buffer: &mut [u8]) -> usize {
        self.record(Call::Read(buffer.len()));
        let limit = self.read_limits.pop_front().unwrap_or(usize::MAX);
        let count = buffer.len().min(self.rx.len()).min(limit);
        for (dst, src) in buffer.iter_mut().zip(self.rx.drain(..count)) {
            *dst = src;
        }
        count
    }
}

impl Ftx232hPort for MockDevice {
    fn description(&mut self) -> Result<Vec<u8>> {
        Ok(self.description.clone())
    }

    fn set_bit_mode(&mut self, mask: u8, mode: u8) -> Result<()> {
        self.record(Call::BitMode(mask, mode));
        Ok(())
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> Result<()> {
        self.record(Call::Timeouts(read, write));
        Ok(())
    }

    fn set_usb_parameters(
        &mut self,
        in_transfer_size: usize,
        out_transfer_size: usize,
    ) -> Result<()> {
        self.record(Call::UsbParameters(in_transfer_size, out_transfer_size));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.do_write(data))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        Ok(self.do_read(buffer))
    }

    fn close(self) -> Result<()> {
        self.do_close()
    }
}

impl Ft60xPort for MockDevice {
    fn driver_version(&mut self) -> Result<Option<u32>> {
        Ok(self.driver_version)
    }

    fn description(&mut self) -> Result<Vec<u8>> {
        Ok(self.description.clone())
    }

    fn channel_config(&mut self) -> Result<u8> {
        Ok(self.channel_config)
    }

    fn usb_version(&mut self) -> Result<u16> {
        Ok(self.usb_version)
    }

    fn set_pipe_timeout(&mut self, pipe: u8, timeout: Duration) -> Result<()> {
        self.record(Call::PipeTimeout(pipe, timeout));
        Ok(())
    }

    fn write_pipe(&mut self, pipe: u8, data: &[u8]) -> Result<usize> {
        assert_eq!(pipe, 0x02);
        Ok(self.do_write(data))
    }

    fn read_pipe(&mut self, pipe: u8, buffer: &mut [u8]) -> Result<usize> {
        assert_eq!(pipe, 0x82);
        Ok(self.do_read(buffer))
    }

    fn close(self) -> Result<()> {
        self.do_close()
    }
}

/// What sits at an enumeration index.
#[derive(Clone)]
pub enum Slot {
    Device(MockDevice),

    /// A device which cannot be opened, e.g. because another process holds it.
    Busy,
}

#[derive(Default)]
pub struct MockBackend {
    pub ftx232h: Vec<Slot>,
    pub ft60x: Vec<Slot>,
    pub ftx232h_unavailable: bool,
    pub ft60x_unavailable: bool,

    /// Every index an open was attempted on.
    pub probed: Vec<(DeviceKind, u8)>,
}

impl MockBackend {
    fn open(&mut self, kind: DeviceKind, index: u8) -> Result<Option<MockDevice>> {
        let (slots, unavailable) = match kind {
            DeviceKind::Ftx232h => (&self.ftx232h, self.ftx232h_unavailable),
            DeviceKind::Ft60x => (&self.ft60x, self.ft60x_unavailable),
        };
        if unavailable {
            return Err(Error::DriverUnavailable {
                kind,
                reason: "library not installed".to_owned(),
            });
        }
        let slot = slots.get(usize::from(index)).cloned();
        self.probed.push((kind, index));
        match slot {
            Some(Slot::Device(device)) => Ok(Some(device)),
            Some(Slot::Busy) => Err(Error::Usb(sync245::rusb::Error::Busy)),
            None => Ok(None),
        }
    }

    pub fn probed(&self, kind: DeviceKind) -> usize {
        self.probed.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl Backend for MockBackend {
    type Ftx232h = MockDevice;
    type Ft60x = MockDevice;

    fn open_ftx232h(&mut self, index: u8) -> Result<Option<MockDevice>> {
        self.open(DeviceKind::Ftx232h, index)
    }

    fn open_ft60x(&mut self, index: u8) -> Result<Option<MockDevice>> {
        self.open(DeviceKind::Ft60x, index)
    }
}
