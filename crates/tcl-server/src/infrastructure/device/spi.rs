//! SPI output through the Linux spidev interface.
//!
//! The bus is configured for mode 0, 8 bits per word, at the requested
//! clock speed.  Buffers are sent in transfers of at most
//! [`MAX_TRANSFER_LEN`] bytes, the default spidev buffer size.

use std::path::Path;

#[cfg(target_os = "linux")]
use tracing::info;

use crate::application::{DeviceError, PixelDevice};

/// Largest single spidev transfer.
pub const MAX_TRANSFER_LEN: usize = 4096;

/// An open SPI device.
pub struct SpiDevice {
    #[cfg(target_os = "linux")]
    spi: spidev::Spidev,
}

#[cfg(target_os = "linux")]
impl SpiDevice {
    /// Opens and configures the device at `path`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Open`] if the node cannot be opened,
    /// [`DeviceError::Configure`] if the mode or speed is rejected.
    pub fn open(path: impl AsRef<Path>, speed_hz: u32) -> Result<Self, DeviceError> {
        use spidev::{SpiModeFlags, Spidev, SpidevOptions};

        let path = path.as_ref().to_path_buf();
        let mut spi = Spidev::open(&path).map_err(|source| DeviceError::Open {
            path: path.clone(),
            source,
        })?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).map_err(|source| DeviceError::Configure {
            path: path.clone(),
            source,
        })?;

        info!(
            "SPI device {} ready at {:.3} MHz",
            path.display(),
            f64::from(speed_hz) * 1e-6
        );
        Ok(Self { spi })
    }
}

#[cfg(not(target_os = "linux"))]
impl SpiDevice {
    /// SPI output needs Linux spidev.
    pub fn open(path: impl AsRef<Path>, speed_hz: u32) -> Result<Self, DeviceError> {
        let _ = (path, speed_hz);
        Err(DeviceError::Unsupported)
    }
}

impl PixelDevice for SpiDevice {
    #[cfg(target_os = "linux")]
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        use std::io::Write;

        for chunk in bytes.chunks(MAX_TRANSFER_LEN) {
            self.spi.write_all(chunk)?;
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn write(&mut self, _bytes: &[u8]) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }
}
