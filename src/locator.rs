//! Finds the first device out of a list of candidates.

use crate::device::{DeviceDescriptor, DeviceKind};
use crate::error::{Error, Result};
use crate::transport::{
    Backend, Ft60xPort, Ftx232hPort, Link, FTX232H_FIFO_MASK, FTX232H_SYNC_FIFO_MODE,
};
use log::{debug, error, info};

/// Number of enumeration indices probed per candidate.
pub const MAX_DEVICES: u8 = 16;

/// Oldest FT60X vendor driver known to transfer data reliably.
pub const FT60X_MIN_DRIVER_VERSION: u32 = 0x0102_0006;

/// Number of FIFO channels for each FT60X channel configuration index.
const FT60X_CHANNELS: [u8; 5] = [4, 2, 1, 0, 0];

/// Translates an FT60X channel configuration index into a channel count. Unknown indices count as
/// no channels at all.
pub(crate) fn channel_count(config: u8) -> u8 {
    FT60X_CHANNELS.get(usize::from(config)).copied().unwrap_or(0)
}

/// A device found by [`locate`].
///
/// [`locate`]: fn.locate.html
pub struct Located<B: Backend> {
    /// The candidate which matched.
    pub descriptor: DeviceDescriptor,

    pub link: Link<B::Ftx232h, B::Ft60x>,

    /// Human-readable outcome, e.g. `Successfully opened FT60X USB device: ...`.
    pub message: String,
}

/// Tries the candidates in order and returns the first device that matches.
///
/// A candidate whose driver layer is unavailable or which has no matching device is skipped. An
/// outdated driver or a wrongly configured FT60X ends the search immediately, because trying
/// further candidates would only hide a setup problem. If no candidate matches, the result is
/// [`Error::NoDevice`].
///
/// [`Error::NoDevice`]: enum.Error.html#variant.NoDevice
pub fn locate<B: Backend>(backend: &mut B, candidates: &[DeviceDescriptor]) -> Result<Located<B>> {
    for descriptor in candidates {
        match open_candidate(backend, descriptor) {
            Ok(link) => {
                let message = format!(
                    "Successfully opened {} USB device: {}",
                    descriptor.kind, descriptor.product_name
                );
                info!("{}", message);
                return Ok(Located {
                    descriptor: descriptor.clone(),
                    link,
                    message,
                });
            }
            Err(err) if err.is_fatal() => {
                error!("{}", err);
                return Err(err);
            }
            Err(err) => info!("{}", err),
        }
    }
    Err(Error::NoDevice)
}

fn open_candidate<B: Backend>(
    backend: &mut B,
    descriptor: &DeviceDescriptor,
) -> Result<Link<B::Ftx232h, B::Ft60x>> {
    if !descriptor.product_name.is_ascii() {
        return Err(Error::InvalidProductName(descriptor.product_name.clone()));
    }
    let name = descriptor.product_name.as_bytes();

    let link = match descriptor.kind {
        DeviceKind::Ftx232h => find_ftx232h(backend, name)?.map(Link::Ftx232h),
        DeviceKind::Ft60x => find_ft60x(backend, name)?.map(Link::Ft60x),
    };
    link.ok_or_else(|| Error::NotFound(descriptor.clone()))
}

fn find_ftx232h<B: Backend>(backend: &mut B, name: &[u8]) -> Result<Option<B::Ftx232h>> {
    for index in 0..MAX_DEVICES {
        let mut port = match backend.open_ftx232h(index) {
            Ok(Some(port)) => port,
            Ok(None) => continue,
            Err(err @ Error::DriverUnavailable { .. }) => return Err(err),
            Err(err) => {
                debug!("Skipping FTX232H device {}: {}", index, err);
                continue;
            }
        };

        if !description_matches(port.description(), name, index) {
            if let Err(err) = port.close() {
                debug!("Failed to close FTX232H device {}: {}", index, err);
            }
            continue;
        }

        port.set_bit_mode(FTX232H_FIFO_MASK, FTX232H_SYNC_FIFO_MODE)?;
        return Ok(Some(port));
    }
    Ok(None)
}

fn find_ft60x<B: Backend>(backend: &mut B, name: &[u8]) -> Result<Option<B::Ft60x>> {
    for index in 0..MAX_DEVICES {
        let mut port = match backend.open_ft60x(index) {
            Ok(Some(port)) => port,
            Ok(None) => continue,
            Err(err @ Error::DriverUnavailable { .. }) => return Err(err),
            Err(err) => {
                debug!("Skipping FT60X device {}: {}", index, err);
                continue;
            }
        };

        if let Some(found) = port.driver_version()? {
            if found < FT60X_MIN_DRIVER_VERSION {
                if let Err(err) = port.close() {
                    debug!("Failed to close FT60X device {}: {}", index, err);
                }
                return Err(Error::OutdatedDriver {
                    kind: DeviceKind::Ft60x,
                    found,
                    required: FT60X_MIN_DRIVER_VERSION,
                });
            }
        }

        if !description_matches(port.description(), name, index) {
            if let Err(err) = port.close() {
                debug!("Failed to close FT60X device {}: {}", index, err);
            }
            continue;
        }

        let channels = channel_count(port.channel_config()?);
        if channels != 1 {
            if let Err(err) = port.close() {
                debug!("Failed to close FT60X device {}: {}", index, err);
            }
            return Err(Error::ChannelConfig {
                kind: DeviceKind::Ft60x,
                channels,
            });
        }

        return Ok(Some(port));
    }
    Ok(None)
}

/// A description which cannot be read counts as a mismatch.
fn description_matches(description: Result<Vec<u8>>, name: &[u8], index: u8) -> bool {
    match description {
        Ok(description) => {
            debug!(
                "Device {} reports description {:?}",
                index,
                String::from_utf8_lossy(&description)
            );
            description == name
        }
        Err(err) => {
            debug!("Failed to read description of device {}: {}", index, err);
            false
        }
    }
}
