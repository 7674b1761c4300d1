use bytemuck::{Pod, Zeroable};

/// 8-bit BGRA texel, laid out so that a slice of colors is the byte stream the
/// backend uploads (`BGRA` / `UNSIGNED_BYTE`). Read as a little-endian `u32`
/// the value is `0xAARRGGBB`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PixelColor {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl PixelColor {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }

    /// Creates a color from a packed `0xAARRGGBB` value.
    #[inline]
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Returns the packed `0xAARRGGBB` value.
    #[inline]
    pub const fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Returns `[r, g, b, a]` normalized to `0.0..=1.0`, the form clear calls take.
    #[inline]
    pub fn to_f32(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

impl From<u32> for PixelColor {
    fn from(argb: u32) -> Self {
        Self::from_argb(argb)
    }
}
