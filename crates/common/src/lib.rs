//! Common types shared across the overlay crates.

pub mod color;
pub mod geometry;
pub mod error;

pub use color::Color;
pub use geometry::Size;
pub use error::{OverlayError, OverlayResult};
