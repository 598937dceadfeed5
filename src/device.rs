//! Identification of the supported chip families and the devices to search for.

use std::fmt;
use std::str::FromStr;

/// Factory product name of FT232H and FT2232H chips.
pub const FTX232H_DEFAULT_NAME: &str = "USB <-> Serial Converter";

/// Factory product name of FT600 and FT601 chips.
pub const FT60X_DEFAULT_NAME: &str = "FTDI SuperSpeed-FIFO Bridge";

/// The chip family behind a session. It decides the chunk size, how timeouts are applied and how
/// the end of an incoming stream is detected.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DeviceKind {
    /// FT232H or FT2232H, a high-speed serial converter running in synchronous FIFO mode.
    Ftx232h,

    /// FT600 or FT601, a SuperSpeed FIFO bridge.
    Ft60x,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Ftx232h => "FTX232H",
            DeviceKind::Ft60x => "FT60X",
        })
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FTX232H" | "FT232H" | "FT2232H" => Ok(DeviceKind::Ftx232h),
            "FT60X" | "FT600" | "FT601" => Ok(DeviceKind::Ft60x),
            _ => Err(format!("unknown device kind {:?}", s)),
        }
    }
}

/// A device to search for: the chip family and the product name from its USB descriptor.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceDescriptor {
    pub kind: DeviceKind,
    pub product_name: String,
}

impl DeviceDescriptor {
    pub fn new(kind: DeviceKind, product_name: impl Into<String>) -> Self {
        Self {
            kind,
            product_name: product_name.into(),
        }
    }

    /// Candidates for chips which still carry their factory product names. An FTX232H is tried
    /// first, then an FT60X.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sync245::{DeviceDescriptor, DeviceKind};
    ///
    /// let candidates = DeviceDescriptor::defaults();
    /// assert_eq!(candidates[0].kind, DeviceKind::Ftx232h);
    /// assert_eq!(candidates[1].product_name, "FTDI SuperSpeed-FIFO Bridge");
    /// ```
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(DeviceKind::Ftx232h, FTX232H_DEFAULT_NAME),
            Self::new(DeviceKind::Ft60x, FT60X_DEFAULT_NAME),
        ]
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.product_name)
    }
}

/// Parses `KIND:product name`, e.g. `FT60X:FTDI SuperSpeed-FIFO Bridge`.
impl FromStr for DeviceDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| format!("expected KIND:NAME, got {:?}", s))?;
        Ok(Self::new(kind.trim().parse()?, name))
    }
}
