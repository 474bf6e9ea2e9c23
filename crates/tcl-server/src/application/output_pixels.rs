//! PixelOutput: turns decoded frames into device writes.
//!
//! This use case sits at the application layer and delegates the actual byte
//! transfer to a [`PixelDevice`] implementation from the infrastructure layer.
//!
//! ```text
//! SourceManager ──handle_pixels(address, &[Pixel])──▶ PixelOutput
//!                                                      │ count frame
//!                                                      │ gamma + P9813 encode
//!                                                      ▼
//!                                                  PixelDevice::write
//! ```

use std::convert::Infallible;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use opc_core::{Pixel, WireEncoder};
use thiserror::Error;
use tracing::{debug, info};

/// Channel level of the diagnostic pixel.
pub const DIAGNOSTIC_LEVEL: u8 = 64;

/// Error type for device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to configure device {path}: {source}")]
    Configure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("device write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("SPI output is not supported on this platform")]
    Unsupported,
}

/// Blocking byte sink for the encoded strand data.
///
/// A write either transfers the whole buffer or fails; the caller does not
/// retry.
#[cfg_attr(test, mockall::automock)]
pub trait PixelDevice {
    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;
}

/// Receives the pixels of each completed set-pixels frame.
///
/// Implemented for [`PixelOutput`] and for any `FnMut(u8, &[Pixel])` closure,
/// which is what most tests use.
pub trait PixelHandler {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once per frame with the frame's address and its pixels.
    /// The slice is only valid for the duration of the call.
    fn handle_pixels(&mut self, address: u8, pixels: &[Pixel]) -> Result<(), Self::Error>;
}

impl<F> PixelHandler for F
where
    F: FnMut(u8, &[Pixel]),
{
    type Error = Infallible;

    fn handle_pixels(&mut self, address: u8, pixels: &[Pixel]) -> Result<(), Infallible> {
        self(address, pixels);
        Ok(())
    }
}

/// Returns the shutdown/diagnostic colour for the given Unix time: one of
/// red, green, blue at [`DIAGNOSTIC_LEVEL`], chosen by `secs % 3`.
pub fn diagnostic_pixel(secs: u64) -> Pixel {
    match secs % 3 {
        0 => Pixel::new(DIAGNOSTIC_LEVEL, 0, 0),
        1 => Pixel::new(0, DIAGNOSTIC_LEVEL, 0),
        _ => Pixel::new(0, 0, DIAGNOSTIC_LEVEL),
    }
}

/// The Output Pixels use case.
pub struct PixelOutput<D> {
    device: D,
    encoder: WireEncoder,
    frames: u64,
    report_interval: u64,
}

impl<D: PixelDevice> PixelOutput<D> {
    /// `report_interval` of 0 disables the periodic frame-count log.
    pub fn new(device: D, encoder: WireEncoder, report_interval: u64) -> Self {
        Self {
            device,
            encoder,
            frames: 0,
            report_interval,
        }
    }

    /// Encodes `pixels` and writes them to the device as one transfer.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the device write fails.
    pub fn output(&mut self, pixels: &[Pixel]) -> Result<(), DeviceError> {
        self.frames += 1;
        if self.report_interval > 0 && self.frames % self.report_interval == 0 {
            info!(frames = self.frames, "frames output");
        }
        let bytes = self.encoder.encode(pixels);
        self.device.write(bytes)
    }

    /// Writes the single diagnostic pixel for `now`.
    ///
    /// Not counted as a frame.
    pub fn write_diagnostic(&mut self, now: SystemTime) -> Result<(), DeviceError> {
        let secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let pixel = diagnostic_pixel(secs);
        debug!(?pixel, "writing diagnostic pixel");
        let bytes = self.encoder.encode(&[pixel]);
        self.device.write(bytes)
    }

    /// Frames written since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: PixelDevice> PixelHandler for PixelOutput<D> {
    type Error = DeviceError;

    fn handle_pixels(&mut self, _address: u8, pixels: &[Pixel]) -> Result<(), DeviceError> {
        self.output(pixels)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use opc_core::{ColorOrder, GammaTable};
    use std::time::Duration;

    fn encoder() -> WireEncoder {
        WireEncoder::new(GammaTable::identity(), ColorOrder::Bgr)
    }

    #[test]
    fn test_output_writes_encoded_frame_to_device() {
        // Arrange
        let mut device = MockPixelDevice::new();
        device
            .expect_write()
            .with(eq(vec![0u8, 0, 0, 0, 0xFF, 30, 20, 10]))
            .times(1)
            .returning(|_| Ok(()));
        let mut output = PixelOutput::new(device, encoder(), 0);

        // Act
        let result = output.output(&[Pixel::new(10, 20, 30)]);

        // Assert
        assert!(result.is_ok());
        assert_eq!(output.frames(), 1);
    }

    #[test]
    fn test_output_zero_pixels_writes_preamble_only() {
        let mut device = MockPixelDevice::new();
        device
            .expect_write()
            .with(eq(vec![0u8; 4]))
            .times(1)
            .returning(|_| Ok(()));
        let mut output = PixelOutput::new(device, encoder(), 0);

        assert!(output.output(&[]).is_ok());
    }

    #[test]
    fn test_output_applies_gamma_before_write() {
        // Arrange: gamma 2.2 maps 128 to 56.
        let mut device = MockPixelDevice::new();
        device
            .expect_write()
            .withf(|bytes: &[u8]| bytes.len() == 8 && bytes[5..] == [56, 56, 56])
            .times(1)
            .returning(|_| Ok(()));
        let enc = WireEncoder::new(GammaTable::uniform(2.2), ColorOrder::Bgr);
        let mut output = PixelOutput::new(device, enc, 0);

        // Act / Assert
        assert!(output.output(&[Pixel::new(128, 128, 128)]).is_ok());
    }

    #[test]
    fn test_output_propagates_device_error() {
        let mut device = MockPixelDevice::new();
        device.expect_write().returning(|_| {
            Err(DeviceError::Write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "bus gone",
            )))
        });
        let mut output = PixelOutput::new(device, encoder(), 0);

        let result = output.output(&[Pixel::BLACK]);

        assert!(matches!(result, Err(DeviceError::Write(_))));
    }

    #[test]
    fn test_handle_pixels_ignores_address() {
        let mut device = MockPixelDevice::new();
        device.expect_write().times(2).returning(|_| Ok(()));
        let mut output = PixelOutput::new(device, encoder(), 0);

        output.handle_pixels(0, &[Pixel::BLACK]).unwrap();
        output.handle_pixels(7, &[Pixel::BLACK]).unwrap();

        assert_eq!(output.frames(), 2);
    }

    #[test]
    fn test_frame_counter_keeps_counting_past_report_interval() {
        let mut device = MockPixelDevice::new();
        device.expect_write().times(5).returning(|_| Ok(()));
        let mut output = PixelOutput::new(device, encoder(), 2);

        for _ in 0..5 {
            output.output(&[Pixel::BLACK]).unwrap();
        }

        assert_eq!(output.frames(), 5);
    }

    #[test]
    fn test_diagnostic_pixel_rotates_red_green_blue() {
        assert_eq!(diagnostic_pixel(0), Pixel::new(64, 0, 0));
        assert_eq!(diagnostic_pixel(1), Pixel::new(0, 64, 0));
        assert_eq!(diagnostic_pixel(2), Pixel::new(0, 0, 64));
        assert_eq!(diagnostic_pixel(3), Pixel::new(64, 0, 0));
    }

    #[test]
    fn test_write_diagnostic_writes_one_pixel_and_is_not_counted() {
        // Arrange: t = 4 selects green.
        let mut device = MockPixelDevice::new();
        device
            .expect_write()
            .with(eq(vec![0u8, 0, 0, 0, !(1u8 << 2), 0, 64, 0]))
            .times(1)
            .returning(|_| Ok(()));
        let mut output = PixelOutput::new(device, encoder(), 0);

        // Act
        let result = output.write_diagnostic(UNIX_EPOCH + Duration::from_secs(4));

        // Assert
        assert!(result.is_ok());
        assert_eq!(output.frames(), 0);
    }

    #[test]
    fn test_closure_handler_receives_address_and_pixels() {
        let mut seen = Vec::new();
        let mut handler = |address: u8, pixels: &[Pixel]| seen.push((address, pixels.to_vec()));

        handler.handle_pixels(3, &[Pixel::new(1, 2, 3)]).unwrap();

        assert_eq!(seen, vec![(3, vec![Pixel::new(1, 2, 3)])]);
    }
}
