//! Flatten pipeline - load layers, composite, encode, write.

use crate::config::OverlayConfig;
use crate::renderer::OverlayRenderer;
use anyhow::Result;
use common::error::OverlayResult;
use common::geometry::Size;
use compositor::LayerStack;
use overlay_media::AssetCatalog;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Flattens the configured layers into one PNG file.
pub struct FlattenPipeline {
    config: OverlayConfig,
    catalog: Arc<AssetCatalog>,
    renderer: OverlayRenderer,
}

impl FlattenPipeline {
    /// Create a new pipeline.
    pub fn new(config: OverlayConfig) -> Self {
        let catalog = Arc::new(config.catalog());
        let renderer = OverlayRenderer::new(config.compositor.clone());
        Self {
            config,
            catalog,
            renderer,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Build the layer stack.
    ///
    /// A layer that names an existing file is read from that path and
    /// registered under its own name; anything else is looked up in the asset
    /// directories.
    pub fn load(&self) -> OverlayResult<LayerStack> {
        load_layers(Arc::clone(&self.catalog), &self.config.layers)
    }

    /// Build the layer stack on the blocking pool.
    async fn load_in_background(&self) -> Result<LayerStack> {
        let catalog = Arc::clone(&self.catalog);
        let layers = self.config.layers.clone();
        Ok(tokio::task::spawn_blocking(move || load_layers(catalog, &layers)).await??)
    }

    /// Run every stage.
    pub async fn run(&self) -> Result<PipelineResult> {
        let mut result = PipelineResult::new();

        let start = Instant::now();
        let stack = self.load_in_background().await?;
        result.layers = stack.count();
        result.stage_times.push((PipelineStage::Load, start.elapsed()));

        let start = Instant::now();
        let flattened = self.renderer.composite(&stack).await?;
        result.stage_times.push((PipelineStage::Composite, start.elapsed()));

        let Some(image) = flattened else {
            tracing::warn!("No layers to flatten, nothing written");
            return Ok(result);
        };
        result.size = Some(image.size());

        let start = Instant::now();
        let bytes = tokio::task::spawn_blocking(move || image.encode_png()).await??;
        result.stage_times.push((PipelineStage::Encode, start.elapsed()));

        let start = Instant::now();
        tokio::fs::write(&self.config.output, &bytes).await?;
        result.stage_times.push((PipelineStage::Write, start.elapsed()));
        result.output = Some(self.config.output.clone());

        let stats = self.renderer.stats();
        tracing::debug!(
            "Composited {} layers with {} blends in {:.2}ms",
            stats.layers_composited,
            stats.blends,
            stats.composition_time_ms
        );

        Ok(result)
    }
}

fn load_layers(catalog: Arc<AssetCatalog>, layers: &[String]) -> OverlayResult<LayerStack> {
    let mut mapping = HashMap::with_capacity(layers.len());

    for (index, layer) in layers.iter().enumerate() {
        let path = Path::new(layer);
        if path.is_file() {
            catalog.register(layer.as_str(), std::fs::read(path)?);
        }
        mapping.insert(index as isize, layer.as_str());
    }

    LayerStack::from_layers(catalog, mapping)
}

/// Pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    /// Resolve layers into a stack.
    Load,
    /// Flatten the stack.
    Composite,
    /// Encode as PNG.
    Encode,
    /// Write the output file.
    Write,
}

/// Result of running the pipeline.
#[derive(Debug, Default)]
pub struct PipelineResult {
    /// Number of layers loaded.
    pub layers: usize,
    /// Size of the flattened image, if one was produced.
    pub size: Option<Size>,
    /// File written, if any.
    pub output: Option<PathBuf>,
    /// Time spent in each stage.
    pub stage_times: Vec<(PipelineStage, Duration)>,
}

impl PipelineResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total time.
    pub fn total_time(&self) -> Duration {
        self.stage_times.iter().map(|(_, d)| *d).sum()
    }
}
