//! Colour values and colour correction.

pub mod gamma;
pub mod pixel;

pub use gamma::GammaTable;
pub use pixel::Pixel;
