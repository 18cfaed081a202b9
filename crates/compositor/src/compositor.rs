//! Flattening layer stacks.

use crate::blend::{Blend, BlendSettings, SourceOverBlender};
use crate::layer::LayerStack;
use image::RgbaImage;
use overlay_media::{to_display_format, RasterImage};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Reduces a [`LayerStack`] to one image by blending each layer over the
/// result of the layers below it.
///
/// The compositor never mutates the stack. It keeps no state between calls
/// apart from statistics and whatever context the blender caches.
pub struct Compositor<B: Blend = SourceOverBlender> {
    /// Blend backend.
    blend: B,
    /// Compositor settings.
    settings: CompositorSettings,
    /// Statistics for the last composite.
    stats: Mutex<CompositorStats>,
}

/// Compositor settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositorSettings {
    /// Settings for the built-in blender.
    pub blend: BlendSettings,
    /// Record timing and counts for each composite.
    pub collect_stats: bool,
}

impl CompositorSettings {
    /// Settings for single-threaded compositing.
    pub fn serial() -> Self {
        Self {
            blend: BlendSettings::serial(),
            ..Self::default()
        }
    }

    pub fn with_blend(mut self, blend: BlendSettings) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.collect_stats = enabled;
        self
    }
}

/// Compositor statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositorStats {
    /// Layers in the last composited stack.
    pub layers_composited: u32,
    /// Blend calls made by the last composite.
    pub blends: u32,
    /// Composites run since creation.
    pub composites: u64,
    /// Duration of the last composite in milliseconds.
    pub composition_time_ms: f32,
}

impl Compositor<SourceOverBlender> {
    /// Create a compositor using the built-in source-over blender.
    pub fn from_settings(settings: CompositorSettings) -> Self {
        let blend = SourceOverBlender::new(settings.blend.clone());
        Self::with_settings(blend, settings)
    }

    /// Create with default settings.
    pub fn with_defaults() -> Self {
        Self::from_settings(CompositorSettings::default())
    }

    /// Replace the settings. The blender is rebuilt, dropping any cached
    /// context.
    pub fn set_settings(&mut self, settings: CompositorSettings) {
        self.blend = SourceOverBlender::new(settings.blend.clone());
        self.settings = settings;
    }
}

impl<B: Blend> Compositor<B> {
    /// Create a compositor around a blend backend.
    pub fn new(blend: B) -> Self {
        Self::with_settings(blend, CompositorSettings::default())
    }

    pub fn with_settings(blend: B, settings: CompositorSettings) -> Self {
        Self {
            blend,
            settings,
            stats: Mutex::new(CompositorStats::default()),
        }
    }

    /// Flatten `stack` into one image.
    ///
    /// Layer 1 is blended over layer 0, then each following layer is blended
    /// over the running result in index order. With fewer than two layers
    /// there is nothing to blend: the bottom layer is returned as is, or
    /// `None` for an empty stack.
    pub fn composite(&self, stack: &LayerStack) -> Option<RasterImage> {
        let start = Instant::now();
        let mut layers = stack.iter();

        let (base, overlay) = match (layers.next(), layers.next()) {
            (Some(base), Some(overlay)) => (base, overlay),
            (bottom, _) => {
                tracing::debug!("Nothing to blend in stack of {} layers", stack.count());
                self.record(stack.count(), 0, start);
                return bottom.cloned();
            }
        };

        let mut working = self.blend.blend(base, overlay);
        let mut blends = 1;

        for (offset, layer) in layers.enumerate() {
            tracing::trace!("Blending layer {}", offset + 2);
            working = self.blend.blend(&working, layer);
            blends += 1;
        }

        self.record(stack.count(), blends, start);
        Some(working)
    }

    /// Flatten `stack` and convert the result for display.
    pub fn render(&self, stack: &LayerStack) -> Option<RgbaImage> {
        self.composite(stack).map(|image| to_display_format(&image))
    }

    fn record(&self, layers: usize, blends: u32, start: Instant) {
        if !self.settings.collect_stats {
            return;
        }

        let mut stats = self.stats.lock();
        stats.layers_composited = layers as u32;
        stats.blends = blends;
        stats.composites += 1;
        stats.composition_time_ms = start.elapsed().as_secs_f32() * 1000.0;
    }

    /// Get compositor statistics.
    pub fn stats(&self) -> CompositorStats {
        self.stats.lock().clone()
    }

    /// Get compositor settings.
    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    pub fn blender(&self) -> &B {
        &self.blend
    }
}

impl Default for Compositor<SourceOverBlender> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::color::Color;
    use common::geometry::Size;
    use overlay_media::AssetCatalog;
    use std::sync::Arc;

    fn shade(n: u8) -> RasterImage {
        RasterImage::filled(Size::new(1, 1), Color::rgb(n, 0, 0))
    }

    fn stack_of(images: &[RasterImage]) -> LayerStack {
        let mut stack = LayerStack::new(Arc::new(AssetCatalog::new()));
        for image in images {
            stack.append(image).unwrap();
        }
        stack
    }

    fn red(image: &RasterImage) -> u8 {
        image.get_pixel(0, 0).unwrap().r
    }

    /// Non-commutative, non-associative: `base * 3 + overlay`.
    struct WeightedBlend;

    impl Blend for WeightedBlend {
        fn blend(&self, base: &RasterImage, overlay: &RasterImage) -> RasterImage {
            shade(red(base).wrapping_mul(3).wrapping_add(red(overlay)))
        }
    }

    /// Records the red channel of each blend's inputs and keeps the overlay.
    #[derive(Default)]
    struct RecordingBlend {
        calls: Mutex<Vec<(u8, u8)>>,
    }

    impl Blend for RecordingBlend {
        fn blend(&self, base: &RasterImage, overlay: &RasterImage) -> RasterImage {
            self.calls.lock().push((red(base), red(overlay)));
            overlay.clone()
        }
    }

    #[test]
    fn test_empty_stack() {
        let compositor = Compositor::new(WeightedBlend);
        assert!(compositor.composite(&stack_of(&[])).is_none());
        assert!(compositor.render(&stack_of(&[])).is_none());
    }

    #[test]
    fn test_single_layer_returned_unchanged() {
        let recorder = Arc::new(RecordingBlend::default());
        let compositor = Compositor::new(recorder.clone());

        let a = shade(5);
        let out = compositor.composite(&stack_of(&[a.clone()])).unwrap();
        assert!(out.ptr_eq(&a));
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn test_two_layers() {
        let compositor = Compositor::new(WeightedBlend);
        let out = compositor.composite(&stack_of(&[shade(1), shade(2)])).unwrap();
        assert_eq!(out, WeightedBlend.blend(&shade(1), &shade(2)));
        assert_eq!(red(&out), 5);
    }

    #[test]
    fn test_left_fold_order() {
        let compositor = Compositor::new(WeightedBlend);
        let (a, b, c) = (shade(1), shade(2), shade(3));
        let out = compositor.composite(&stack_of(&[a.clone(), b.clone(), c.clone()])).unwrap();

        let left = WeightedBlend.blend(&WeightedBlend.blend(&a, &b), &c);
        let right = WeightedBlend.blend(&a, &WeightedBlend.blend(&b, &c));
        assert_eq!(out, left);
        assert_ne!(out, right);
        assert_eq!(red(&out), 18);
    }

    #[test]
    fn test_blend_call_sequence() {
        let recorder = Arc::new(RecordingBlend::default());
        let compositor = Compositor::new(recorder.clone());

        let stack = stack_of(&[shade(1), shade(2), shade(3), shade(4)]);
        let out = compositor.composite(&stack).unwrap();

        // Each call sees the previous result as its base.
        assert_eq!(*recorder.calls.lock(), vec![(1, 2), (2, 3), (3, 4)]);
        assert_eq!(red(&out), 4);
    }

    #[test]
    fn test_stack_not_mutated() {
        let compositor = Compositor::new(WeightedBlend);
        let stack = stack_of(&[shade(1), shade(2), shade(3)]);
        let before: Vec<_> = stack.iter().cloned().collect();

        compositor.composite(&stack);

        assert_eq!(stack.count(), 3);
        for (a, b) in stack.iter().zip(&before) {
            assert!(a.ptr_eq(b));
        }
    }

    #[test]
    fn test_source_over_last_writer_wins() {
        let compositor = Compositor::from_settings(CompositorSettings::serial());
        let stack = stack_of(&[
            RasterImage::filled(Size::new(2, 2), Color::BLUE),
            RasterImage::filled(Size::new(2, 2), Color::rgba(255, 0, 0, 128)),
            RasterImage::filled(Size::new(1, 1), Color::GREEN),
        ]);

        let out = compositor.composite(&stack).unwrap();
        assert_eq!(out.size(), Size::new(2, 2));
        assert_eq!(out.get_pixel(0, 0), Some(Color::GREEN));
        assert_eq!(out.get_pixel(1, 1), Some(Color::rgba(128, 0, 127, 255)));
    }

    #[test]
    fn test_render_converts_result() {
        let compositor = Compositor::with_defaults();
        let stack = stack_of(&[
            RasterImage::filled(Size::new(3, 2), Color::BLUE),
            RasterImage::filled(Size::new(3, 2), Color::RED),
        ]);

        let display = compositor.render(&stack).unwrap();
        assert_eq!(display.dimensions(), (3, 2));
        assert_eq!(display.get_pixel(2, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_context_reuse_is_invisible() {
        let settings = CompositorSettings::default().with_blend(
            BlendSettings::default()
                .with_parallel_threshold(0)
                .with_threads(2),
        );
        let compositor = Compositor::from_settings(settings);
        let stack = stack_of(&[
            RasterImage::filled(Size::new(8, 8), Color::BLUE),
            RasterImage::filled(Size::new(8, 8), Color::rgba(0, 255, 0, 90)),
            RasterImage::filled(Size::new(4, 8), Color::rgba(255, 0, 0, 200)),
        ]);

        let first = compositor.composite(&stack).unwrap();
        let second = compositor.composite(&stack).unwrap();
        let fresh = Compositor::from_settings(CompositorSettings::serial())
            .composite(&stack)
            .unwrap();

        assert!(compositor.blender().has_context());
        assert_eq!(first, second);
        assert_eq!(first, fresh);
    }

    #[test]
    fn test_stats() {
        let compositor = Compositor::with_settings(
            WeightedBlend,
            CompositorSettings::default().with_stats(true),
        );
        compositor.composite(&stack_of(&[shade(1), shade(2), shade(3)]));

        let stats = compositor.stats();
        assert_eq!(stats.layers_composited, 3);
        assert_eq!(stats.blends, 2);
        assert_eq!(stats.composites, 1);

        compositor.composite(&stack_of(&[shade(1)]));
        let stats = compositor.stats();
        assert_eq!(stats.blends, 0);
        assert_eq!(stats.composites, 2);

        let quiet = Compositor::new(WeightedBlend);
        quiet.composite(&stack_of(&[shade(1), shade(2)]));
        assert_eq!(quiet.stats(), CompositorStats::default());
    }

    #[test]
    fn test_set_settings() {
        let mut compositor = Compositor::with_defaults();
        assert!(compositor.blender().settings().parallel);

        compositor.set_settings(CompositorSettings::serial().with_stats(true));
        assert!(!compositor.blender().settings().parallel);
        assert!(compositor.settings().collect_stats);
    }
}
