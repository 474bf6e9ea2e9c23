//! Output devices for the encoded strand data.
//!
//! The SPI implementation is only available on Linux; elsewhere
//! [`SpiDevice::open`] returns [`DeviceError::Unsupported`](crate::application::DeviceError::Unsupported).

pub mod mock;
pub mod spi;

pub use mock::MockDevice;
pub use spi::SpiDevice;
