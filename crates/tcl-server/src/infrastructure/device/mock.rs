//! Mock pixel device for testing.
//!
//! Records every buffer written to it so tests can inspect exactly what the
//! strand would have received, in order.
//!
//! # `should_fail` flag
//!
//! Set `should_fail = true` to make every write return
//! [`DeviceError::Write`], for exercising error paths without hardware.

use crate::application::{DeviceError, PixelDevice};

/// A device that records writes instead of performing them.
#[derive(Debug, Default)]
pub struct MockDevice {
    /// Each buffer passed to `write`, in call order.
    pub writes: Vec<Vec<u8>>,
    pub should_fail: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose writes always fail.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }
}

impl PixelDevice for MockDevice {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        if self.should_fail {
            return Err(DeviceError::Write(std::io::Error::new(
                std::io::ErrorKind::Other,
                "mock failure",
            )));
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }
}
