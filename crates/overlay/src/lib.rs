//! Overlay - flatten stacks of images into one.
//!
//! This crate wires the layer stack and compositor to the outside world:
//! - configuration
//! - background compositing on the tokio blocking pool
//! - a load/composite/encode/write pipeline used by the `overlay` binary

pub mod config;
pub mod renderer;
pub mod pipeline;

pub use config::OverlayConfig;
pub use pipeline::{FlattenPipeline, PipelineResult, PipelineStage};
pub use renderer::OverlayRenderer;

/// Overlay version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
