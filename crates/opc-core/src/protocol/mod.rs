//! Protocol module containing the OPC frame types and the incremental decoder.

pub mod decoder;
pub mod frame;

pub use decoder::{DecoderState, FrameDecoder};
pub use frame::*;
