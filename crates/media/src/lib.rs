//! Image handling for layer stacks.
//!
//! This crate provides:
//! - `RasterImage`, the immutable pixel handle stored in layers
//! - Image decoding (PNG, JPEG, GIF, WebP, BMP, ICO)
//! - Image resolution from names, encoded bytes or existing rasters
//! - An asset catalog backed by registered bytes and search directories

pub mod raster;
pub mod image_decoder;
pub mod source;
pub mod catalog;

pub use raster::{to_display_format, RasterImage};
pub use image_decoder::{ImageDecoder, ImageError, ImageFormat};
pub use source::{ImageResolver, ImageSource};
pub use catalog::AssetCatalog;
