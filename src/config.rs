use crate::device::DeviceKind;
use crate::error::{Error, Result};
use std::time::Duration;

/// Default receive and send timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Chunk size for FTX232H transfers. The driver's transfer buffers are sized to four times this.
pub const FTX232H_CHUNK_SIZE: usize = 65536;

/// Chunk size for FT60X pipe transfers.
pub const FT60X_CHUNK_SIZE: usize = 65536 * 16;

/// Number of consecutive empty FT60X pipe reads which end a receive.
pub const DEFAULT_ZERO_READ_LIMIT: u32 = 2;

/// Settings a [`Session`] starts out with.
///
/// [`Session`]: struct.Session.html
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionConfig {
    /// Upper bound for a single blocking read.
    pub recv_timeout: Duration,

    /// Upper bound for a single blocking write.
    pub send_timeout: Duration,

    pub ftx232h_chunk_size: usize,

    pub ft60x_chunk_size: usize,

    /// An FT60X read pipe occasionally returns nothing without the stream having ended. A receive
    /// only gives up after this many empty reads in a row.
    pub zero_read_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recv_timeout: DEFAULT_TIMEOUT,
            send_timeout: DEFAULT_TIMEOUT,
            ftx232h_chunk_size: FTX232H_CHUNK_SIZE,
            ft60x_chunk_size: FT60X_CHUNK_SIZE,
            zero_read_limit: DEFAULT_ZERO_READ_LIMIT,
        }
    }
}

impl SessionConfig {
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Overrides the chunk size used for devices of the given kind.
    pub fn with_chunk_size(mut self, kind: DeviceKind, chunk_size: usize) -> Self {
        match kind {
            DeviceKind::Ftx232h => self.ftx232h_chunk_size = chunk_size,
            DeviceKind::Ft60x => self.ft60x_chunk_size = chunk_size,
        }
        self
    }

    pub fn with_zero_read_limit(mut self, limit: u32) -> Self {
        self.zero_read_limit = limit;
        self
    }

    /// The chunk size for devices of the given kind.
    pub fn chunk_size(&self, kind: DeviceKind) -> usize {
        match kind {
            DeviceKind::Ftx232h => self.ftx232h_chunk_size,
            DeviceKind::Ft60x => self.ft60x_chunk_size,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.ftx232h_chunk_size == 0 || self.ft60x_chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk size must not be zero"));
        }
        // The FTX232H driver buffers are four chunks large
        if self.ftx232h_chunk_size > usize::MAX / 4 {
            return Err(Error::InvalidConfig("FTX232H chunk size is too large"));
        }
        if self.zero_read_limit == 0 {
            return Err(Error::InvalidConfig("zero read limit must be at least 1"));
        }
        Ok(())
    }
}
