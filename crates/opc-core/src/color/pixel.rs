//! The [`Pixel`] value type.
//!
//! A pixel is three 8-bit channels.  The struct is `#[repr(C)]` with no
//! padding, so a tightly packed `r,g,b,r,g,b,...` byte slice can be viewed as
//! `&[Pixel]` without copying.  That is exactly the layout of an OPC
//! "set pixel colours" payload.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Size of one pixel on the OPC wire, in bytes.
pub const PIXEL_SIZE: usize = 3;

/// One RGB colour value.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    /// All channels off.
    pub const BLACK: Pixel = Pixel::new(0, 0, 0);

    /// Creates a pixel from its red, green, and blue channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Views a packed `r,g,b` byte slice as pixels.
    ///
    /// Trailing bytes that do not make up a whole pixel are ignored, so a
    /// 7-byte slice yields two pixels.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use opc_core::Pixel;
    ///
    /// let bytes = [10, 20, 30, 40, 50, 60, 70];
    /// let pixels = Pixel::slice_from_bytes(&bytes);
    /// assert_eq!(pixels, &[Pixel::new(10, 20, 30), Pixel::new(40, 50, 60)]);
    /// ```
    pub fn slice_from_bytes(bytes: &[u8]) -> &[Pixel] {
        let whole = bytes.len() - bytes.len() % PIXEL_SIZE;
        bytemuck::cast_slice(&bytes[..whole])
    }

    /// Views a pixel slice as its packed `r,g,b` bytes.
    pub fn slice_as_bytes(pixels: &[Pixel]) -> &[u8] {
        bytemuck::cast_slice(pixels)
    }
}

impl From<[u8; 3]> for Pixel {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Pixel> for [u8; 3] {
    fn from(p: Pixel) -> Self {
        [p.r, p.g, p.b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_size_matches_struct_size() {
        assert_eq!(std::mem::size_of::<Pixel>(), PIXEL_SIZE);
        assert_eq!(std::mem::align_of::<Pixel>(), 1);
    }

    #[test]
    fn test_slice_from_bytes_truncates_partial_pixel() {
        let bytes = [1, 2, 3, 4, 5];
        let pixels = Pixel::slice_from_bytes(&bytes);
        assert_eq!(pixels, &[Pixel::new(1, 2, 3)]);
    }

    #[test]
    fn test_slice_from_bytes_empty_and_short_inputs() {
        assert!(Pixel::slice_from_bytes(&[]).is_empty());
        assert!(Pixel::slice_from_bytes(&[9, 9]).is_empty());
    }

    #[test]
    fn test_slice_as_bytes_preserves_channel_order() {
        let pixels = [Pixel::new(1, 2, 3), Pixel::new(4, 5, 6)];
        assert_eq!(Pixel::slice_as_bytes(&pixels), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_array_conversions() {
        let p = Pixel::from([7, 8, 9]);
        assert_eq!(p, Pixel::new(7, 8, 9));
        assert_eq!(<[u8; 3]>::from(p), [7, 8, 9]);
    }
}
