//! Overlay - flatten layered images into one PNG.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use overlay::{FlattenPipeline, OverlayConfig};

/// Composite images bottom to top with source-over blending
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Layers from bottom to top: asset names or image paths
    #[arg(required = true)]
    layers: Vec<String>,

    /// Directory searched for named assets (repeatable)
    #[arg(short, long = "assets")]
    assets: Vec<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "composite.png")]
    output: PathBuf,

    /// Blend on a single thread
    #[arg(long)]
    serial: bool,

    /// Worker threads for row blending
    #[arg(long, conflicts_with = "serial")]
    threads: Option<usize>,

    /// Largest accepted image width or height
    #[arg(long, default_value = "16384")]
    max_dimension: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> OverlayConfig {
        let mut config = OverlayConfig::new()
            .with_layers(self.layers.iter().cloned())
            .with_output(&self.output)
            .with_max_image_dimension(self.max_dimension);

        for dir in &self.assets {
            config = config.with_asset_dir(dir);
        }
        if self.serial {
            config = config.with_serial_blending();
        }
        if let Some(threads) = self.threads {
            config = config.with_blend_threads(threads);
        }

        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the flag.
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Overlay v{}", overlay::VERSION);

    let pipeline = FlattenPipeline::new(args.config());
    let result = pipeline.run().await?;

    match (&result.output, result.size) {
        (Some(path), Some(size)) => info!(
            "Flattened {} layers into {}x{} image: {} ({:.2?})",
            result.layers,
            size.width,
            size.height,
            path.display(),
            result.total_time()
        ),
        _ => info!("Nothing to flatten"),
    }

    Ok(())
}
