//! Open Pixel Control frame types and the sender-side encoder.
//!
//! Wire format:
//! ```text
//! [address:1][command:1][payload_len:2][payload:N]
//! ```
//! Total header size: 4 bytes.  The length is big-endian and counts payload
//! bytes only, so a frame carries at most 65535 payload bytes.
//!
//! For [`Command::SetPixels`] the payload is a packed sequence of
//! `r,g,b` triplets.  A trailing partial triplet is ignored.

use thiserror::Error;

use crate::color::pixel::Pixel;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 4;

/// Largest payload length the 16-bit length field can declare.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Size of the per-connection payload buffer.
pub const PAYLOAD_CAPACITY: usize = 1 << 16;

/// Well-known OPC TCP port.
pub const DEFAULT_PORT: u16 = 7890;

/// Command code for "set pixel colours".
pub const SET_PIXELS: u8 = 1;

/// Errors raised while building frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The payload does not fit in the 16-bit length field.
    #[error("payload of {len} bytes exceeds the {max}-byte frame limit")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Frame command code.
///
/// Only "set pixel colours" is acted on.  Every other code still decodes so
/// that the stream stays in sync, it just produces no pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SetPixels,
    Other(u8),
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        match code {
            SET_PIXELS => Command::SetPixels,
            other => Command::Other(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        match command {
            Command::SetPixels => SET_PIXELS,
            Command::Other(code) => code,
        }
    }
}

/// The decoded 4-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Channel or strip identifier.
    pub address: u8,
    pub command: Command,
    /// Declared payload length in bytes.
    pub payload_len: u16,
}

impl FrameHeader {
    /// Parses a header from its wire bytes.
    pub fn from_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self {
            address: bytes[0],
            command: Command::from(bytes[1]),
            payload_len: u16::from_be_bytes([bytes[2], bytes[3]]),
        }
    }

    /// Serializes the header to its wire bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [hi, lo] = self.payload_len.to_be_bytes();
        [self.address, self.command.into(), hi, lo]
    }
}

/// A complete frame, borrowing its payload from the decoder that produced it.
///
/// Frames are ephemeral: the borrow ends before the decoder can accept the
/// next byte, so nothing is retained across reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub address: u8,
    pub command: Command,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// The payload viewed as pixels, dropping any trailing partial pixel.
    ///
    /// Meaningful only for [`Command::SetPixels`]; callers check the command.
    pub fn pixels(&self) -> &'a [Pixel] {
        Pixel::slice_from_bytes(self.payload)
    }

    /// Number of whole pixels in the payload (`payload.len() / 3`).
    pub fn pixel_count(&self) -> usize {
        self.pixels().len()
    }

    /// The header this frame was decoded from.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            address: self.address,
            command: self.command,
            // Frames are only built from a 16-bit length field.
            payload_len: self.payload.len() as u16,
        }
    }
}

// ── Sender side ───────────────────────────────────────────────────────────────

/// Encodes a frame (header + payload) into a byte vector.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if `payload` is longer than
/// 65535 bytes.
///
/// # Examples
///
/// ```rust
/// use opc_core::{encode_frame, Command};
///
/// let bytes = encode_frame(1, Command::SetPixels, &[10, 20, 30]).unwrap();
/// assert_eq!(bytes, vec![1, 1, 0, 3, 10, 20, 30]);
/// ```
pub fn encode_frame(address: u8, command: Command, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let payload_len = u16::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge {
        len: payload.len(),
        max: MAX_PAYLOAD_LEN,
    })?;
    let header = FrameHeader {
        address,
        command,
        payload_len,
    };

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Encodes a "set pixel colours" frame.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] for more than 21845 pixels.
pub fn encode_pixels_frame(address: u8, pixels: &[Pixel]) -> Result<Vec<u8>, ProtocolError> {
    encode_frame(address, Command::SetPixels, Pixel::slice_as_bytes(pixels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_from_bytes_reads_big_endian_length() {
        let header = FrameHeader::from_bytes([7, 1, 0x01, 0x02]);
        assert_eq!(header.address, 7);
        assert_eq!(header.command, Command::SetPixels);
        assert_eq!(header.payload_len, 0x0102);
    }

    #[test]
    fn test_header_to_bytes_is_inverse_of_from_bytes() {
        let bytes = [255, 42, 0xFF, 0xFF];
        assert_eq!(FrameHeader::from_bytes(bytes).to_bytes(), bytes);
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::from(1), Command::SetPixels);
        assert_eq!(Command::from(0), Command::Other(0));
        assert_eq!(Command::from(255), Command::Other(255));
        assert_eq!(u8::from(Command::SetPixels), 1);
        assert_eq!(u8::from(Command::Other(9)), 9);
    }

    #[test]
    fn test_frame_pixels_drop_trailing_remainder() {
        let payload = [1, 2, 3, 4, 5, 6, 7, 8];
        let frame = Frame {
            address: 0,
            command: Command::SetPixels,
            payload: &payload,
        };
        assert_eq!(frame.pixel_count(), 2);
        assert_eq!(frame.pixels()[1], Pixel::new(4, 5, 6));
        assert_eq!(frame.header().payload_len, 8);
    }

    #[test]
    fn test_encode_frame_layout() {
        let bytes = encode_frame(3, Command::Other(0xFF), &[9; 300]).unwrap();
        assert_eq!(&bytes[..4], &[3, 0xFF, 0x01, 0x2C]);
        assert_eq!(bytes.len(), 304);
    }

    #[test]
    fn test_encode_frame_accepts_maximum_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN];
        let bytes = encode_frame(0, Command::SetPixels, &payload).unwrap();
        assert_eq!(&bytes[2..4], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_encode_frame_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            encode_frame(0, Command::SetPixels, &payload),
            Err(ProtocolError::PayloadTooLarge {
                len: MAX_PAYLOAD_LEN + 1,
                max: MAX_PAYLOAD_LEN,
            })
        );
    }

    #[test]
    fn test_encode_pixels_frame_packs_rgb_triplets() {
        let bytes = encode_pixels_frame(1, &[Pixel::new(10, 20, 30)]).unwrap();
        assert_eq!(bytes, vec![1, SET_PIXELS, 0, 3, 10, 20, 30]);
    }
}
