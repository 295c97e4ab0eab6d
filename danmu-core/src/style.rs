//! Text style data structures for DanMu comments

/// Font used when a comment does not name one
pub const DEFAULT_FONT_NAME: &str = "Microsoft YaHei UI";

/// Font size (in points) used when a comment does not carry one
pub const DEFAULT_FONT_SIZE: u32 = 25;

/// RGBA text color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Opaque white, the fallback comment color
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    /// Creates a new color from its four channels
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color from a packed `0xRRGGBB` integer.
    ///
    /// Bits above the low 24 are ignored.
    pub const fn from_packed_rgb(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
            a: 255,
        }
    }

    /// Returns the color with a different alpha channel
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
