//! Application layer use cases for the server.
//!
//! # What use cases does the server have?
//!
//! - **`output_pixels`** – Receives the pixels of each completed OPC frame,
//!   counts it, gamma-corrects and encodes it for the TCL strand, and writes
//!   the result to a [`PixelDevice`].  The concrete device (SPI on Linux, a
//!   recording mock in tests) is injected at construction time.
//!
//! The [`PixelHandler`] trait is the seam between the network layer and this
//! one: the source manager calls it once per completed set-pixels frame.

pub mod output_pixels;

pub use output_pixels::{diagnostic_pixel, DeviceError, PixelDevice, PixelHandler, PixelOutput};
