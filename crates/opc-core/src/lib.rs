//! # opc-core
//!
//! Shared library for the TCL server containing the Open Pixel Control (OPC)
//! frame decoder, colour types, gamma tables, and the Total Control Lighting
//! wire encoder.
//!
//! It has zero dependencies on network sockets or device files: bytes go in,
//! frames and encoded buffers come out.  The server crate owns all I/O.
//!
//! # Architecture overview
//!
//! The TCL server bridges a TCP pixel-streaming protocol to an LED strip that
//! hangs off an SPI bus.  Data moves through this crate in two directions:
//!
//! - **`protocol`** – How pixel frames arrive over the network.  A 4-byte
//!   header (address, command, big-endian payload length) is followed by the
//!   payload.  [`FrameDecoder`] reassembles frames from arbitrarily split reads.
//!
//! - **`color`** – The [`Pixel`] value type and the per-channel
//!   [`GammaTable`] lookup used before output.
//!
//! - **`wire`** – How pixels leave for the hardware.  [`WireEncoder`] packs a
//!   pixel sequence into the P9813 stream expected by TCL strands.

pub mod color;
pub mod protocol;
pub mod wire;

pub use color::gamma::GammaTable;
pub use color::pixel::Pixel;
pub use protocol::decoder::{DecoderState, FrameDecoder};
pub use protocol::frame::{
    encode_frame, encode_pixels_frame, Command, Frame, FrameHeader, ProtocolError,
};
pub use wire::tcl::{ColorOrder, WireEncoder};
