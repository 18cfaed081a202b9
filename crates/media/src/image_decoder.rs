//! Image decoding.

use crate::raster::RasterImage;
use common::error::OverlayError;
use image::{ImageReader, Limits};
use std::io::Cursor;
use thiserror::Error;

/// Image decoder.
#[derive(Clone, Debug)]
pub struct ImageDecoder {
    /// Maximum image dimensions.
    max_width: u32,
    max_height: u32,
    /// Maximum memory usage.
    max_memory: usize,
}

impl ImageDecoder {
    /// Create a new image decoder.
    pub fn new() -> Self {
        Self {
            max_width: 16384,
            max_height: 16384,
            max_memory: 256 * 1024 * 1024, // 256MB
        }
    }

    /// Set maximum dimensions.
    pub fn set_max_dimensions(&mut self, width: u32, height: u32) {
        self.max_width = width;
        self.max_height = height;
    }

    /// Set maximum memory.
    pub fn set_max_memory(&mut self, bytes: usize) {
        self.max_memory = bytes;
    }

    /// Decode an image from bytes.
    pub fn decode(&self, data: &[u8]) -> Result<RasterImage, ImageError> {
        let format = ImageFormat::detect(data).ok_or(ImageError::UnknownFormat)?;
        self.decode_with_format(data, format)
    }

    /// Decode an image with a known format.
    pub fn decode_with_format(
        &self,
        data: &[u8],
        format: ImageFormat,
    ) -> Result<RasterImage, ImageError> {
        let codec = format.codec().ok_or_else(|| {
            ImageError::UnsupportedFormat(format!("{} requires a vector renderer", format.mime_type()))
        })?;

        // Read the header first so oversized images are never allocated.
        let (width, height) = ImageReader::with_format(Cursor::new(data), codec)
            .into_dimensions()
            .map_err(|e| ImageError::DecodingError(e.to_string()))?;
        self.check_dimensions(width, height)?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);

        let mut reader = ImageReader::with_format(Cursor::new(data), codec);
        reader.limits(limits);
        let img = reader
            .decode()
            .map_err(|e| ImageError::DecodingError(e.to_string()))?;

        let rgba = img.to_rgba8();
        tracing::trace!(
            "Decoded {} image {}x{}",
            format.extension(),
            rgba.width(),
            rgba.height()
        );
        Ok(RasterImage::from_rgba_image(rgba))
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<(), ImageError> {
        if width > self.max_width || height > self.max_height {
            return Err(ImageError::DimensionsTooLarge {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }

        let memory = (width as usize) * (height as usize) * 4;
        if memory > self.max_memory {
            return Err(ImageError::MemoryLimitExceeded {
                required: memory,
                limit: self.max_memory,
            });
        }

        Ok(())
    }
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Image format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Ico,
    /// Detected but never decoded.
    Svg,
}

impl ImageFormat {
    /// Formats the decoder can load, in asset lookup order.
    pub const DECODABLE: [ImageFormat; 6] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::WebP,
        ImageFormat::Bmp,
        ImageFormat::Ico,
    ];

    /// Detect image format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // GIF: GIF87a or GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        // BMP: BM
        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }

        // ICO: 00 00 01 00
        if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
            return Some(ImageFormat::Ico);
        }

        if data.starts_with(b"<?xml") || data.starts_with(b"<svg") {
            return Some(ImageFormat::Svg);
        }

        None
    }

    fn codec(&self) -> Option<image::ImageFormat> {
        match self {
            ImageFormat::Png => Some(image::ImageFormat::Png),
            ImageFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFormat::Gif => Some(image::ImageFormat::Gif),
            ImageFormat::WebP => Some(image::ImageFormat::WebP),
            ImageFormat::Bmp => Some(image::ImageFormat::Bmp),
            ImageFormat::Ico => Some(image::ImageFormat::Ico),
            ImageFormat::Svg => None,
        }
    }

    /// Get MIME type for format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Ico => "image/x-icon",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// Get file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Ico => "ico",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Image decoding error.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unknown image format")]
    UnknownFormat,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Image dimensions too large: {width}x{height} (max: {max_width}x{max_height})")]
    DimensionsTooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("Memory limit exceeded: required {required} bytes, limit is {limit} bytes")]
    MemoryLimitExceeded { required: usize, limit: usize },
}

impl From<ImageError> for OverlayError {
    fn from(err: ImageError) -> Self {
        OverlayError::invalid(err.to_string())
    }
}
