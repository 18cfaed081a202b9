//! Immutable raster images.

use common::color::Color;
use common::error::{OverlayError, OverlayResult};
use common::geometry::Size;
use image::{ImageFormat, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// Shared handle to an immutable RGBA8 image (straight alpha).
///
/// Cloning is cheap: clones share the same pixel buffer. The buffer is never
/// written after construction.
#[derive(Clone)]
pub struct RasterImage {
    inner: Arc<RasterData>,
}

struct RasterData {
    size: Size,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap raw RGBA bytes. Returns `None` if the buffer length does not
    /// match `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = byte_len(width, height)?;
        if pixels.len() != expected {
            return None;
        }

        Some(Self::from_parts(Size::new(width, height), pixels))
    }

    /// Build an image by evaluating `f` for every pixel.
    pub fn from_fn(size: Size, mut f: impl FnMut(u32, u32) -> Color) -> Self {
        let mut pixels = Vec::with_capacity(size.area() as usize * 4);
        for y in 0..size.height {
            for x in 0..size.width {
                pixels.extend_from_slice(&f(x, y).to_array());
            }
        }
        Self::from_parts(size, pixels)
    }

    /// Image filled with one color.
    pub fn filled(size: Size, color: Color) -> Self {
        let px = color.to_array();
        let pixels = px
            .iter()
            .copied()
            .cycle()
            .take(size.area() as usize * 4)
            .collect();
        Self::from_parts(size, pixels)
    }

    /// Allocate a transparent buffer, let `fill` write it, then freeze it.
    pub fn with_pixels(size: Size, fill: impl FnOnce(&mut [u8])) -> Self {
        let mut pixels = vec![0; size.area() as usize * 4];
        fill(&mut pixels);
        Self::from_parts(size, pixels)
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let size = Size::new(image.width(), image.height());
        Self::from_parts(size, image.into_raw())
    }

    fn from_parts(size: Size, pixels: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(RasterData { size, pixels }),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.size.height
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.inner.size
    }

    /// Whether the image has no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.size.is_empty()
    }

    /// Raw RGBA bytes, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.inner.pixels
    }

    /// One row of RGBA bytes.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height() {
            return None;
        }
        let stride = self.width() as usize * 4;
        let start = y as usize * stride;
        self.inner.pixels.get(start..start + stride)
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
        if !self.inner.size.contains(x, y) {
            return None;
        }

        let idx = (y as usize * self.width() as usize + x as usize) * 4;
        let px = self.inner.pixels.get(idx..idx + 4)?;
        Some(Color::rgba(px[0], px[1], px[2], px[3]))
    }

    /// Whether both handles point at the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &RasterImage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.inner.pixels.len()
    }

    /// Convert to the `image` crate's buffer type.
    pub fn to_display_format(&self) -> RgbaImage {
        to_display_format(self)
    }

    /// Encode as PNG.
    pub fn encode_png(&self) -> OverlayResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.to_display_format()
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| OverlayError::invalid(e.to_string()))?;
        Ok(out.into_inner())
    }
}

/// Convert a raster into the display-side image type. Pure; the source is
/// left untouched.
pub fn to_display_format(image: &RasterImage) -> RgbaImage {
    RgbaImage::from_raw(image.width(), image.height(), image.pixels().to_vec())
        .unwrap_or_default()
}

fn byte_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

impl PartialEq for RasterImage {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.inner.size == other.inner.size && self.inner.pixels == other.inner.pixels)
    }
}

impl Eq for RasterImage {}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(RasterImage::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(RasterImage::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(RasterImage::from_rgba(0, 0, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_filled() {
        let img = RasterImage::filled(Size::new(3, 2), Color::RED);
        assert_eq!(img.memory_usage(), 24);
        assert_eq!(img.get_pixel(2, 1), Some(Color::RED));
        assert_eq!(img.get_pixel(3, 0), None);
        assert_eq!(img.row(1).map(<[u8]>::len), Some(12));
        assert!(img.row(2).is_none());
    }

    #[test]
    fn test_from_fn() {
        let img = RasterImage::from_fn(Size::new(2, 2), |x, y| Color::rgb(x as u8, y as u8, 0));
        assert_eq!(img.get_pixel(1, 0), Some(Color::rgb(1, 0, 0)));
        assert_eq!(img.get_pixel(0, 1), Some(Color::rgb(0, 1, 0)));
    }

    #[test]
    fn test_with_pixels() {
        let img = RasterImage::with_pixels(Size::new(2, 1), |px| px[4..].copy_from_slice(&[9, 8, 7, 6]));
        assert_eq!(img.get_pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(img.get_pixel(1, 0), Some(Color::rgba(9, 8, 7, 6)));
    }

    #[test]
    fn test_equality_and_identity() {
        let a = RasterImage::filled(Size::new(1, 1), Color::BLUE);
        let b = RasterImage::filled(Size::new(1, 1), Color::BLUE);
        let c = a.clone();

        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&c));
        assert_ne!(a, RasterImage::filled(Size::new(1, 1), Color::RED));
    }

    #[test]
    fn test_display_conversion() {
        let img = RasterImage::filled(Size::new(4, 3), Color::rgba(1, 2, 3, 4));
        let display = img.to_display_format();
        assert_eq!(display.dimensions(), (4, 3));
        assert_eq!(display.get_pixel(3, 2).0, [1, 2, 3, 4]);
        assert_eq!(RasterImage::from_rgba_image(display), img);
    }

    #[test]
    fn test_encode_png() {
        let img = RasterImage::filled(Size::new(2, 2), Color::GREEN);
        let bytes = img.encode_png().unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(RasterImage::from_rgba_image(decoded), img);
    }
}
