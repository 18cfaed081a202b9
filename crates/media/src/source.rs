//! Image sources and the resolver seam.

use crate::raster::RasterImage;
use common::error::{OverlayError, OverlayResult};

/// Image content handed to a layer stack.
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// An asset looked up by name.
    Named(String),
    /// An image that is already decoded.
    Raster(RasterImage),
    /// Encoded file bytes (PNG, JPEG, ...).
    Encoded(Vec<u8>),
}

impl From<&str> for ImageSource {
    fn from(name: &str) -> Self {
        ImageSource::Named(name.to_string())
    }
}

impl From<String> for ImageSource {
    fn from(name: String) -> Self {
        ImageSource::Named(name)
    }
}

impl From<RasterImage> for ImageSource {
    fn from(image: RasterImage) -> Self {
        ImageSource::Raster(image)
    }
}

impl From<&RasterImage> for ImageSource {
    fn from(image: &RasterImage) -> Self {
        ImageSource::Raster(image.clone())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Encoded(bytes)
    }
}

/// Turns an [`ImageSource`] into a raster image.
///
/// Implementations must fail with `ImageNotFound` for unknown names and
/// `InvalidImage` for data that is not a usable raster.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, source: &ImageSource) -> OverlayResult<RasterImage>;
}

/// Reject rasters with no pixels.
pub(crate) fn validate(image: RasterImage, name: Option<&str>) -> OverlayResult<RasterImage> {
    if image.is_empty() {
        let reason = format!("zero extent {}x{}", image.width(), image.height());
        return Err(match name {
            Some(name) => OverlayError::invalid_named(name, reason),
            None => OverlayError::invalid(reason),
        });
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::color::Color;
    use common::geometry::Size;

    #[test]
    fn test_conversions() {
        assert!(matches!(ImageSource::from("Star"), ImageSource::Named(ref n) if n == "Star"));
        assert!(matches!(
            ImageSource::from(String::from("Square")),
            ImageSource::Named(ref n) if n == "Square"
        ));

        let img = RasterImage::filled(Size::new(1, 1), Color::RED);
        assert!(matches!(ImageSource::from(&img), ImageSource::Raster(ref r) if r.ptr_eq(&img)));
        assert!(matches!(ImageSource::from(img), ImageSource::Raster(_)));
        assert!(matches!(ImageSource::from(vec![1u8, 2]), ImageSource::Encoded(_)));
    }

    #[test]
    fn test_validate() {
        let ok = RasterImage::filled(Size::new(1, 1), Color::RED);
        assert!(validate(ok, None).is_ok());

        let empty = RasterImage::filled(Size::new(0, 5), Color::RED);
        let err = validate(empty, Some("Blank")).unwrap_err();
        assert_eq!(err.to_string(), "Blank: is invalid (zero extent 0x5)");
    }
}
