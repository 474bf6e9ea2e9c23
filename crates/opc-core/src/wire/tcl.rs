//! Total Control Lighting (P9813) wire encoder.
//!
//! Wire format:
//! ```text
//! [0x00 0x00 0x00 0x00]                      preamble
//! [flag][c1][c2][c3] × pixel count            one 4-byte group per pixel
//! ```
//!
//! The flag byte carries the inverted top two bits of each channel so the
//! strand can check framing:
//!
//! ```text
//! bit:   7   6   5    4    3    2    1    0
//!        1   1  ~B7  ~B6  ~G7  ~G6  ~R7  ~R6
//! ```
//!
//! The three colour bytes follow in [`ColorOrder`].  P9813 strands expect
//! blue, green, red, which is the default; some controller revisions wire the
//! channels the other way round, so red, green, blue can be selected
//! explicitly in configuration.

use serde::{Deserialize, Serialize};

use crate::color::gamma::GammaTable;
use crate::color::pixel::Pixel;
use crate::protocol::frame::MAX_PAYLOAD_LEN;

/// Fixed bytes sent ahead of every pixel group.
pub const PREAMBLE: [u8; 4] = [0; 4];

/// Encoded size of one pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Most pixels a single OPC frame can carry.
pub const MAX_PIXELS: usize = MAX_PAYLOAD_LEN / 3;

/// Order of the three colour bytes after each flag byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    /// Blue, green, red.
    #[default]
    Bgr,
    /// Red, green, blue.
    Rgb,
}

/// Computes the flag byte for an (already corrected) pixel.
pub fn control_byte(pixel: Pixel) -> u8 {
    let flag = (pixel.r >> 6) | ((pixel.g >> 6) << 2) | ((pixel.b >> 6) << 4);
    !flag
}

/// Size of the encoded buffer for `pixel_count` pixels.
pub fn encoded_len(pixel_count: usize) -> usize {
    PREAMBLE.len() + pixel_count * BYTES_PER_PIXEL
}

/// Appends the encoding of `pixels` to `out`.
///
/// Each pixel is gamma corrected first; the flag byte is computed from the
/// corrected channels.
pub fn encode_into(pixels: &[Pixel], gamma: &GammaTable, order: ColorOrder, out: &mut Vec<u8>) {
    out.reserve(encoded_len(pixels.len()));
    out.extend_from_slice(&PREAMBLE);
    for &raw in pixels {
        let p = gamma.correct(raw);
        out.push(control_byte(p));
        match order {
            ColorOrder::Bgr => out.extend_from_slice(&[p.b, p.g, p.r]),
            ColorOrder::Rgb => out.extend_from_slice(&[p.r, p.g, p.b]),
        }
    }
}

/// Gamma-corrects and packs pixel sequences, reusing one output buffer.
#[derive(Debug, Clone)]
pub struct WireEncoder {
    gamma: GammaTable,
    order: ColorOrder,
    buf: Vec<u8>,
}

impl WireEncoder {
    /// Creates an encoder with a buffer sized for the largest OPC frame.
    pub fn new(gamma: GammaTable, order: ColorOrder) -> Self {
        Self {
            gamma,
            order,
            buf: Vec::with_capacity(encoded_len(MAX_PIXELS)),
        }
    }

    /// Encodes `pixels` and returns the bytes to hand to the device.
    ///
    /// The returned slice is valid until the next call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use opc_core::{ColorOrder, GammaTable, Pixel, WireEncoder};
    ///
    /// let mut encoder = WireEncoder::new(GammaTable::identity(), ColorOrder::Bgr);
    /// assert_eq!(encoder.encode(&[]), &[0, 0, 0, 0]);
    ///
    /// let bytes = encoder.encode(&[Pixel::new(0xFF, 0x00, 0x00)]);
    /// assert_eq!(bytes, &[0, 0, 0, 0, 0xFC, 0x00, 0x00, 0xFF]);
    /// ```
    pub fn encode(&mut self, pixels: &[Pixel]) -> &[u8] {
        self.buf.clear();
        encode_into(pixels, &self.gamma, self.order, &mut self.buf);
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_encoder(order: ColorOrder) -> WireEncoder {
        WireEncoder::new(GammaTable::identity(), order)
    }

    #[test]
    fn test_encode_empty_is_preamble_only() {
        let mut encoder = identity_encoder(ColorOrder::Bgr);
        assert_eq!(encoder.encode(&[]), &PREAMBLE);
    }

    #[test]
    fn test_control_byte_black_and_white() {
        assert_eq!(control_byte(Pixel::BLACK), 0xFF);
        assert_eq!(control_byte(Pixel::new(255, 255, 255)), 0xC0);
    }

    #[test]
    fn test_control_byte_channel_positions() {
        // Red occupies bits 1..0, green 3..2, blue 5..4.
        assert_eq!(control_byte(Pixel::new(0xC0, 0, 0)), !0b00_00_11);
        assert_eq!(control_byte(Pixel::new(0, 0xC0, 0)), !0b00_11_00);
        assert_eq!(control_byte(Pixel::new(0, 0, 0xC0)), !0b11_00_00);
        assert_eq!(control_byte(Pixel::new(0x40, 0x80, 0x3F)), !0b00_10_01);
    }

    #[test]
    fn test_control_byte_top_bits_always_set() {
        for v in [0u8, 0x3F, 0x40, 0x7F, 0x80, 0xBF, 0xC0, 0xFF] {
            assert_eq!(control_byte(Pixel::new(v, v, v)) & 0xC0, 0xC0);
        }
    }

    #[test]
    fn test_encode_bgr_order() {
        let mut encoder = identity_encoder(ColorOrder::Bgr);
        let bytes = encoder.encode(&[Pixel::new(10, 20, 30)]);
        assert_eq!(bytes, &[0, 0, 0, 0, 0xFF, 30, 20, 10]);
    }

    #[test]
    fn test_encode_rgb_order() {
        let mut encoder = identity_encoder(ColorOrder::Rgb);
        let bytes = encoder.encode(&[Pixel::new(10, 20, 30)]);
        assert_eq!(bytes, &[0, 0, 0, 0, 0xFF, 10, 20, 30]);
    }

    #[test]
    fn test_encode_length_for_many_pixels() {
        let mut encoder = identity_encoder(ColorOrder::Bgr);
        let pixels = vec![Pixel::new(1, 2, 3); 100];
        assert_eq!(encoder.encode(&pixels).len(), encoded_len(100));
        assert_eq!(encoded_len(100), 404);
    }

    #[test]
    fn test_encode_applies_gamma_before_flag() {
        // With gamma 2.0, 0xC0 (192) maps to 145 (0x91): top bits become 10.
        let mut encoder = WireEncoder::new(GammaTable::uniform(2.0), ColorOrder::Bgr);
        let bytes = encoder.encode(&[Pixel::new(192, 0, 0)]).to_vec();
        assert_eq!(bytes[4], !0b00_00_10);
        assert_eq!(bytes[7], 145);
    }

    #[test]
    fn test_encode_reuses_buffer_between_calls() {
        let mut encoder = identity_encoder(ColorOrder::Bgr);
        encoder.encode(&[Pixel::BLACK; 3]);
        let bytes = encoder.encode(&[Pixel::BLACK]);
        assert_eq!(bytes.len(), encoded_len(1));
    }

    #[test]
    fn test_encode_into_appends() {
        let mut out = vec![0xAA];
        encode_into(&[Pixel::BLACK], &GammaTable::identity(), ColorOrder::Rgb, &mut out);
        assert_eq!(out, vec![0xAA, 0, 0, 0, 0, 0xFF, 0, 0, 0]);
    }

    #[test]
    fn test_color_order_defaults_to_bgr() {
        assert_eq!(ColorOrder::default(), ColorOrder::Bgr);
    }
}
