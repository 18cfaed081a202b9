//! Pairwise image blending.

use common::color::Color;
use once_cell::sync::OnceCell;
use overlay_media::RasterImage;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Paints one image over another.
///
/// Implementations must be pure: the result depends only on the two inputs.
pub trait Blend: Send + Sync {
    /// Paint `overlay` on top of `base`.
    fn blend(&self, base: &RasterImage, overlay: &RasterImage) -> RasterImage;
}

impl<B: Blend + ?Sized> Blend for Arc<B> {
    fn blend(&self, base: &RasterImage, overlay: &RasterImage) -> RasterImage {
        (**self).blend(base, overlay)
    }
}

impl<B: Blend + ?Sized> Blend for Box<B> {
    fn blend(&self, base: &RasterImage, overlay: &RasterImage) -> RasterImage {
        (**self).blend(base, overlay)
    }
}

/// Blender settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendSettings {
    /// Blend rows in parallel.
    pub parallel: bool,
    /// Minimum output pixel count before rows are split across threads.
    pub parallel_threshold: u64,
    /// Worker threads for a dedicated pool. `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl BlendSettings {
    /// Single-threaded blending.
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_parallel_threshold(mut self, pixels: u64) -> Self {
        self.parallel_threshold = pixels;
        self
    }
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 256 * 256,
            threads: None,
        }
    }
}

/// CPU source-over blender for straight-alpha RGBA images.
///
/// The output covers the union of both extents, anchored at the origin.
/// Overlay pixels are painted over the base where the overlay exists; the
/// base shows through everywhere else, and pixels covered by neither image
/// are transparent.
///
/// A dedicated thread pool, when configured, is created on first use and
/// kept for the blender's lifetime. Serial and parallel paths produce the
/// same bytes.
pub struct SourceOverBlender {
    settings: BlendSettings,
    pool: OnceCell<Option<ThreadPool>>,
}

impl SourceOverBlender {
    pub fn new(settings: BlendSettings) -> Self {
        Self {
            settings,
            pool: OnceCell::new(),
        }
    }

    pub fn serial() -> Self {
        Self::new(BlendSettings::serial())
    }

    pub fn settings(&self) -> &BlendSettings {
        &self.settings
    }

    /// Whether the dedicated pool has been created.
    pub fn has_context(&self) -> bool {
        matches!(self.pool.get(), Some(Some(_)))
    }

    fn context(&self) -> Option<&ThreadPool> {
        self.pool
            .get_or_init(|| {
                let threads = self.settings.threads?;
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("overlay-blend-{i}"))
                    .build()
                {
                    Ok(pool) => {
                        tracing::debug!("Created blend pool with {} threads", threads);
                        Some(pool)
                    }
                    Err(err) => {
                        tracing::warn!("Falling back to global pool: {}", err);
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl Blend for SourceOverBlender {
    fn blend(&self, base: &RasterImage, overlay: &RasterImage) -> RasterImage {
        let size = base.size().union(overlay.size());
        if size.is_empty() {
            return RasterImage::with_pixels(size, |_| {});
        }

        let stride = size.width as usize * 4;
        let parallel = self.settings.parallel && size.area() >= self.settings.parallel_threshold;

        RasterImage::with_pixels(size, |pixels| {
            if !parallel {
                for (y, row) in pixels.chunks_mut(stride).enumerate() {
                    paint_row(base, overlay, y as u32, row);
                }
                return;
            }
            match self.context() {
                Some(pool) => pool.install(|| paint_rows_parallel(base, overlay, stride, pixels)),
                None => paint_rows_parallel(base, overlay, stride, pixels),
            }
        })
    }
}

fn paint_rows_parallel(base: &RasterImage, overlay: &RasterImage, stride: usize, pixels: &mut [u8]) {
    pixels
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| paint_row(base, overlay, y as u32, row));
}

/// Write output row `y`: the base row, then the overlay row painted over it.
fn paint_row(base: &RasterImage, overlay: &RasterImage, y: u32, row: &mut [u8]) {
    if let Some(below) = base.row(y) {
        row[..below.len()].copy_from_slice(below);
    }

    let Some(above) = overlay.row(y) else {
        return;
    };

    for (dst, src) in row.chunks_exact_mut(4).zip(above.chunks_exact(4)) {
        let top = Color::rgba(src[0], src[1], src[2], src[3]);
        let bottom = Color::rgba(dst[0], dst[1], dst[2], dst[3]);
        dst.copy_from_slice(&top.blend_over(bottom).to_array());
    }
}

impl Default for SourceOverBlender {
    fn default() -> Self {
        Self::new(BlendSettings::default())
    }
}

impl fmt::Debug for SourceOverBlender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceOverBlender")
            .field("settings", &self.settings)
            .field("has_context", &self.has_context())
            .finish()
    }
}
