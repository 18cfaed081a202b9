//! Layer stacks and compositing.
//!
//! A [`LayerStack`] keeps images in paint order, densely indexed from the
//! bottom layer at 0. A [`Compositor`] flattens a stack into one image by
//! blending each layer over everything below it with a [`Blend`] backend,
//! source-over by default.

pub mod layer;
pub mod blend;
pub mod compositor;

pub use self::compositor::{Compositor, CompositorSettings, CompositorStats};
pub use blend::{Blend, BlendSettings, SourceOverBlender};
pub use layer::LayerStack;
