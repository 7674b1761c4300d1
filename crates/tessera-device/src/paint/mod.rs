//! Color types shared by clears, texture uploads and pixel readback.

mod color;

pub use color::PixelColor;
