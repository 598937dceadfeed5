use crate::config::SessionConfig;
use crate::device::DeviceDescriptor;
use crate::error::Result;
use crate::ft60x::{UsbFt60x, FT60X_IDS};
use crate::ftx232h::{UsbFtx232h, FTX232H_IDS};
use crate::session::Session;
use crate::transport::Backend;
use log::debug;
use rusb::{Device, UsbContext};

/// Access to the FTDI chips attached to this machine, through libusb.
pub struct Context {
    pub usb_context: rusb::Context,
}

impl Context {
    pub fn new() -> Result<Self> {
        let usb_context = rusb::Context::new()?;
        Ok(Context { usb_context })
    }

    /// Opens the first of `candidates` that is attached. See [`Session::open`].
    ///
    /// [`Session::open`]: struct.Session.html#method.open
    pub fn open(
        &mut self,
        candidates: &[DeviceDescriptor],
        config: SessionConfig,
    ) -> Result<Session<Self>> {
        Session::open(self, candidates, config)
    }

    /// Returns the `index`th attached device with one of the given vendor and product IDs, in
    /// bus enumeration order.
    fn find_device(
        &self,
        ids: &[(u16, u16)],
        index: u8,
    ) -> Result<Option<Device<rusb::Context>>> {
        let devices = self.usb_context.devices()?;
        let device = devices
            .iter()
            .filter(|device| match device.device_descriptor() {
                Ok(descriptor) => ids.contains(&(descriptor.vendor_id(), descriptor.product_id())),
                Err(_) => false,
            })
            .nth(usize::from(index));
        Ok(device)
    }
}

impl Backend for Context {
    type Ftx232h = UsbFtx232h;
    type Ft60x = UsbFt60x;

    fn open_ftx232h(&mut self, index: u8) -> Result<Option<UsbFtx232h>> {
        match self.find_device(FTX232H_IDS, index)? {
            Some(device) => {
                debug!(
                    "Opening FTX232H device {} at bus {} address {}",
                    index,
                    device.bus_number(),
                    device.address()
                );
                UsbFtx232h::open(device).map(Some)
            }
            None => Ok(None),
        }
    }

    fn open_ft60x(&mut self, index: u8) -> Result<Option<UsbFt60x>> {
        match self.find_device(FT60X_IDS, index)? {
            Some(device) => {
                debug!(
                    "Opening FT60X device {} at bus {} address {}",
                    index,
                    device.bus_number(),
                    device.address()
                );
                UsbFt60x::open(device).map(Some)
            }
            None => Ok(None),
        }
    }
}
