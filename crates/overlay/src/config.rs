//! Overlay configuration.

use compositor::{BlendSettings, CompositorSettings};
use overlay_media::{AssetCatalog, ImageDecoder};
use std::path::PathBuf;

/// Configuration for a flattening run.
#[derive(Clone, Debug)]
pub struct OverlayConfig {
    /// Layers from bottom to top: asset names or image file paths.
    pub layers: Vec<String>,
    /// Directories searched for named assets.
    pub asset_dirs: Vec<PathBuf>,
    /// Where the flattened PNG is written.
    pub output: PathBuf,
    /// Compositor settings.
    pub compositor: CompositorSettings,
    /// Largest accepted image width or height.
    pub max_image_dimension: u32,
    /// Largest accepted decoded image size in bytes.
    pub max_image_memory: usize,
}

impl OverlayConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the layers, bottom first.
    pub fn with_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Add an asset search directory.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dirs.push(dir.into());
        self
    }

    /// Set the output path.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Blend on the calling thread only.
    pub fn with_serial_blending(mut self) -> Self {
        self.compositor.blend = BlendSettings::serial();
        self
    }

    /// Blend rows on a dedicated pool of `threads` workers.
    pub fn with_blend_threads(mut self, threads: usize) -> Self {
        self.compositor.blend.threads = Some(threads);
        self
    }

    /// Set the decoder's dimension limit.
    pub fn with_max_image_dimension(mut self, max: u32) -> Self {
        self.max_image_dimension = max;
        self
    }

    /// Build the asset catalog described by this configuration.
    pub fn catalog(&self) -> AssetCatalog {
        let mut decoder = ImageDecoder::new();
        decoder.set_max_dimensions(self.max_image_dimension, self.max_image_dimension);
        decoder.set_max_memory(self.max_image_memory);

        self.asset_dirs
            .iter()
            .fold(AssetCatalog::with_decoder(decoder), |catalog, dir| {
                catalog.with_search_path(dir)
            })
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            asset_dirs: Vec::new(),
            output: PathBuf::from("composite.png"),
            compositor: CompositorSettings::default().with_stats(true),
            max_image_dimension: 16384,
            max_image_memory: 256 * 1024 * 1024, // 256MB
        }
    }
}
