//! Per-channel gamma correction tables.
//!
//! LEDs respond linearly to PWM duty cycle while the eye does not, so colour
//! values are remapped through a power curve before output:
//!
//! ```text
//! corrected = round(255 * (v / 255) ^ gamma), clamped to 0..=255
//! ```
//!
//! The curve is evaluated once per channel into a 256-entry table; applying it
//! is then a single array lookup per channel.

use crate::color::pixel::Pixel;

/// Number of entries per channel table (one per `u8` value).
pub const TABLE_SIZE: usize = 256;

/// Three fixed lookup tables mapping raw channel values to corrected ones.
///
/// Built once (at startup, from configuration) and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaTable {
    red: [u8; TABLE_SIZE],
    green: [u8; TABLE_SIZE],
    blue: [u8; TABLE_SIZE],
}

impl GammaTable {
    /// Builds the tables from one exponent per channel.
    ///
    /// Exponents of `1.0` produce the identity mapping.  The function is pure
    /// and deterministic; it performs no validation of the exponents.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use opc_core::GammaTable;
    ///
    /// let table = GammaTable::new(2.2, 2.2, 2.2);
    /// assert_eq!(table.red(0), 0);
    /// assert_eq!(table.red(255), 255);
    /// assert!(table.red(128) < 128);
    /// ```
    pub fn new(gamma_red: f64, gamma_green: f64, gamma_blue: f64) -> Self {
        Self {
            red: build_channel(gamma_red),
            green: build_channel(gamma_green),
            blue: build_channel(gamma_blue),
        }
    }

    /// Builds the tables with the same exponent on every channel.
    pub fn uniform(gamma: f64) -> Self {
        Self::new(gamma, gamma, gamma)
    }

    /// The identity mapping (no correction).
    pub fn identity() -> Self {
        Self::uniform(1.0)
    }

    /// Corrected red channel value.
    pub fn red(&self, value: u8) -> u8 {
        self.red[value as usize]
    }

    /// Corrected green channel value.
    pub fn green(&self, value: u8) -> u8 {
        self.green[value as usize]
    }

    /// Corrected blue channel value.
    pub fn blue(&self, value: u8) -> u8 {
        self.blue[value as usize]
    }

    /// Applies all three channel tables to a pixel.
    pub fn correct(&self, pixel: Pixel) -> Pixel {
        Pixel::new(self.red(pixel.r), self.green(pixel.g), self.blue(pixel.b))
    }

    /// Returns `true` if every channel maps each value to itself.
    pub fn is_identity(&self) -> bool {
        (0..TABLE_SIZE).all(|i| {
            let v = i as u8;
            self.red[i] == v && self.green[i] == v && self.blue[i] == v
        })
    }
}

impl Default for GammaTable {
    fn default() -> Self {
        Self::identity()
    }
}

fn build_channel(gamma: f64) -> [u8; TABLE_SIZE] {
    std::array::from_fn(|i| {
        let normalized = i as f64 / 255.0;
        // `as u8` saturates, and maps NaN to 0.
        (255.0 * normalized.powf(gamma)).round().clamp(0.0, 255.0) as u8
    })
}
