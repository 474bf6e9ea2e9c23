//! Output encoders for LED hardware.

pub mod tcl;

pub use tcl::{control_byte, encoded_len, ColorOrder, WireEncoder, PREAMBLE};
