//! Ordered image layers.

use common::error::{OverlayError, OverlayResult};
use image::RgbaImage;
use overlay_media::{to_display_format, ImageResolver, ImageSource, RasterImage};
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;

/// An ordered stack of images, densely indexed from 0.
///
/// Index 0 is the bottom (background) layer; the highest index is painted
/// last. Every operation that accepts new image content runs it through the
/// stack's [`ImageResolver`] first and leaves the stack untouched if that
/// fails. Operations that only rearrange existing layers never fail: indices
/// that do not exist are ignored.
///
/// Cloning a stack yields an independent snapshot. Layer handles are shared
/// and immutable, so this does not copy pixel data.
#[derive(Clone)]
pub struct LayerStack {
    layers: Vec<RasterImage>,
    resolver: Arc<dyn ImageResolver>,
}

impl LayerStack {
    /// Create an empty stack.
    pub fn new(resolver: Arc<dyn ImageResolver>) -> Self {
        Self {
            layers: Vec::new(),
            resolver,
        }
    }

    /// Create a stack from an index -> image mapping.
    ///
    /// The mapping must cover exactly `0..len`, otherwise this fails with
    /// `InvalidDictionary` before any image is resolved. Images are then
    /// resolved bottom to top and the first failure is returned.
    ///
    /// ```ignore
    /// let layers = HashMap::from([(0, "Background Image"), (1, "Overlay Image")]);
    /// let stack = LayerStack::from_layers(catalog, layers)?;
    /// ```
    pub fn from_layers<S, H>(
        resolver: Arc<dyn ImageResolver>,
        initial: HashMap<isize, S, H>,
    ) -> OverlayResult<Self>
    where
        S: Into<ImageSource>,
        H: BuildHasher,
    {
        if !Self::is_dense_mapping(&initial) {
            return Err(OverlayError::InvalidDictionary);
        }

        let mut entries: Vec<(isize, S)> = initial.into_iter().collect();
        entries.sort_unstable_by_key(|(index, _)| *index);

        let layers = entries
            .into_iter()
            .map(|(_, source)| resolver.resolve(&source.into()))
            .collect::<OverlayResult<Vec<_>>>()?;

        tracing::debug!("Created layer stack with {} layers", layers.len());
        Ok(Self { layers, resolver })
    }

    /// Check that a mapping's keys are exactly `0..len`.
    ///
    /// An empty mapping is dense.
    pub fn is_dense_mapping<V, H: BuildHasher>(mapping: &HashMap<isize, V, H>) -> bool {
        (0..mapping.len()).all(|index| {
            isize::try_from(index).map_or(false, |key| mapping.contains_key(&key))
        })
    }

    /// Number of layers.
    pub fn count(&self) -> usize {
        self.layers.len()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Index of the topmost layer, or `-1` when the stack is empty.
    pub fn top_index(&self) -> isize {
        self.layers.len() as isize - 1
    }

    /// Get the image at `index`.
    pub fn get(&self, index: usize) -> Option<&RasterImage> {
        self.layers.get(index)
    }

    /// Get the image at `index` converted for display.
    pub fn layer(&self, index: usize) -> Option<RgbaImage> {
        self.get(index).map(to_display_format)
    }

    /// Layers from bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, RasterImage> {
        self.layers.iter()
    }

    /// Add an image on top of the stack.
    pub fn append(&mut self, image: impl Into<ImageSource>) -> OverlayResult<()> {
        let image = self.resolve(image)?;
        self.layers.push(image);
        Ok(())
    }

    /// Insert an image at `index`, moving that layer and everything above
    /// it up by one.
    ///
    /// An index past the top appends instead.
    pub fn insert(&mut self, image: impl Into<ImageSource>, index: usize) -> OverlayResult<()> {
        if index > self.layers.len() {
            tracing::debug!(
                "Insert index {} past top of {} layers, appending",
                index,
                self.layers.len()
            );
            return self.append(image);
        }

        let image = self.resolve(image)?;
        self.layers.insert(index, image);
        Ok(())
    }

    /// Remove the layer at `index`, moving everything above it down by one.
    ///
    /// Returns the removed image, or `None` if there was no such layer.
    pub fn remove(&mut self, index: usize) -> Option<RasterImage> {
        if index >= self.layers.len() {
            tracing::debug!("Ignoring removal of missing layer {}", index);
            return None;
        }
        Some(self.layers.remove(index))
    }

    /// Replace the image at `index`.
    ///
    /// The image is resolved even when `index` does not exist, so resolution
    /// errors are always reported. A missing index is otherwise ignored; this
    /// never adds a layer.
    pub fn update(&mut self, index: usize, image: impl Into<ImageSource>) -> OverlayResult<()> {
        let image = self.resolve(image)?;
        match self.layers.get_mut(index) {
            Some(slot) => *slot = image,
            None => tracing::debug!("Ignoring update of missing layer {}", index),
        }
        Ok(())
    }

    /// Exchange two layers. Does nothing unless both exist.
    pub fn swap(&mut self, first: usize, second: usize) {
        let len = self.layers.len();
        if first < len && second < len {
            self.layers.swap(first, second);
        } else {
            tracing::debug!("Ignoring swap of {} and {} with {} layers", first, second, len);
        }
    }

    /// Remove every layer.
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    fn resolve(&self, image: impl Into<ImageSource>) -> OverlayResult<RasterImage> {
        self.resolver.resolve(&image.into())
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a RasterImage;
    type IntoIter = std::slice::Iter<'a, RasterImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

impl fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerStack")
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}
