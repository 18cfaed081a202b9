//! Color representation and source-over blending.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with 8-bit straight (non-premultiplied) components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn from_array(px: [u8; 4]) -> Self {
        Self::rgba(px[0], px[1], px[2], px[3])
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub const fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Paint `self` over `background` using straight-alpha source-over.
    pub fn blend_over(&self, background: Color) -> Color {
        if self.is_opaque() || background.a == 0 {
            return *self;
        }
        if self.a == 0 {
            return background;
        }

        let fg_a = self.a as f32 / 255.0;
        let bg_a = background.a as f32 / 255.0;
        let out_a = fg_a + bg_a * (1.0 - fg_a);

        let blend = |fg: u8, bg: u8| -> u8 {
            let out = (fg as f32 * fg_a + bg as f32 * bg_a * (1.0 - fg_a)) / out_a;
            out.round().clamp(0.0, 255.0) as u8
        };

        Color::rgba(
            blend(self.r, background.r),
            blend(self.g, background.g),
            blend(self.b, background.b),
            (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
        )
    }
}

impl From<[u8; 4]> for Color {
    fn from(px: [u8; 4]) -> Self {
        Self::from_array(px)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
