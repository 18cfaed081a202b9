//! Background compositing.

use anyhow::Result;
use compositor::{Compositor, CompositorSettings, CompositorStats, LayerStack};
use image::RgbaImage;
use overlay_media::{to_display_format, RasterImage};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Runs composites off the calling task.
///
/// Each call takes a snapshot of the stack, so the caller may keep mutating
/// its own copy while a composite is in flight. To cancel, drop or ignore
/// the result; a running fold is never interrupted.
///
/// The compositor, and any blend context it caches, is shared by every
/// call. Create one renderer and reuse it.
#[derive(Clone)]
pub struct OverlayRenderer {
    compositor: Arc<Compositor>,
}

impl OverlayRenderer {
    pub fn new(settings: CompositorSettings) -> Self {
        Self {
            compositor: Arc::new(Compositor::from_settings(settings)),
        }
    }

    /// Start compositing a snapshot of `stack` on the blocking pool.
    pub fn spawn_composite(&self, stack: &LayerStack) -> JoinHandle<Option<RasterImage>> {
        let snapshot = stack.clone();
        let compositor = Arc::clone(&self.compositor);
        tokio::task::spawn_blocking(move || compositor.composite(&snapshot))
    }

    /// Composite a snapshot of `stack`.
    pub async fn composite(&self, stack: &LayerStack) -> Result<Option<RasterImage>> {
        Ok(self.spawn_composite(stack).await?)
    }

    /// Composite a snapshot of `stack` and convert it for display.
    pub async fn render(&self, stack: &LayerStack) -> Result<Option<RgbaImage>> {
        match self.composite(stack).await? {
            Some(image) => Ok(Some(Self::convert(image).await?)),
            None => Ok(None),
        }
    }

    /// Convert an image for display on the blocking pool.
    pub async fn convert(image: RasterImage) -> Result<RgbaImage> {
        Ok(tokio::task::spawn_blocking(move || to_display_format(&image)).await?)
    }

    pub fn stats(&self) -> CompositorStats {
        self.compositor.stats()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(CompositorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::color::Color;
    use common::geometry::Size;
    use overlay_media::AssetCatalog;

    fn stack() -> LayerStack {
        let mut stack = LayerStack::new(Arc::new(AssetCatalog::new()));
        stack
            .append(RasterImage::filled(Size::new(4, 4), Color::BLUE))
            .unwrap();
        stack
            .append(RasterImage::filled(Size::new(2, 2), Color::rgba(255, 0, 0, 128)))
            .unwrap();
        stack
    }

    #[tokio::test]
    async fn test_matches_synchronous_composite() {
        let renderer = OverlayRenderer::default();
        let stack = stack();

        let background = renderer.composite(&stack).await.unwrap().unwrap();
        let direct = Compositor::from_settings(CompositorSettings::serial())
            .composite(&stack)
            .unwrap();
        assert_eq!(background, direct);
    }

    #[tokio::test]
    async fn test_snapshot_isolated_from_mutation() {
        let renderer = OverlayRenderer::new(CompositorSettings::serial());
        let mut stack = stack();

        let handle = renderer.spawn_composite(&stack);
        stack.clear();

        let out = handle.await.unwrap().unwrap();
        assert_eq!(out.size(), Size::new(4, 4));
        assert!(renderer.composite(&stack).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_render_and_convert() {
        let renderer = OverlayRenderer::new(CompositorSettings::serial().with_stats(true));
        let display = renderer.render(&stack()).await.unwrap().unwrap();
        assert_eq!(display.dimensions(), (4, 4));
        assert_eq!(display.get_pixel(3, 3).0, [0, 0, 255, 255]);
        assert_eq!(renderer.stats().blends, 1);

        let dot = RasterImage::filled(Size::new(1, 1), Color::GREEN);
        let converted = OverlayRenderer::convert(dot).await.unwrap();
        assert_eq!(converted.get_pixel(0, 0).0, [0, 255, 0, 255]);
    }
}
