//! Pixel extents.

use serde::{Deserialize, Serialize};

/// Width and height of a raster in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const ZERO: Size = Size { width: 0, height: 0 };

    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Smallest extent anchored at the origin that covers both sizes.
    #[inline]
    pub fn union(&self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_union() {
        let a = Size::new(4, 2);
        let b = Size::new(3, 5);
        assert_eq!(a.union(b), Size::new(4, 5));
        assert_eq!(a.union(b), b.union(a));
    }

    #[test]
    fn test_size_empty() {
        assert!(Size::ZERO.is_empty());
        assert!(Size::new(0, 10).is_empty());
        assert!(!Size::new(1, 1).is_empty());
        assert_eq!(Size::new(3, 4).area(), 12);
    }
}
