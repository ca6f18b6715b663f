//! Layout-space geometry
//!
//! All scrolling geometry is expressed in CSS pixels of the main frame's document
//! unless stated otherwise.

/// Unit tag for CSS pixels in layout space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutPixel;

pub type LayoutPoint = euclid::Point2D<f32, LayoutPixel>;
pub type LayoutVector = euclid::Vector2D<f32, LayoutPixel>;
pub type LayoutSize = euclid::Size2D<f32, LayoutPixel>;
pub type LayoutRect = euclid::Rect<f32, LayoutPixel>;

/// Shorthand for building a [`LayoutRect`] from its origin and size components
#[inline]
pub fn layout_rect(x: f32, y: f32, width: f32, height: f32) -> LayoutRect {
    LayoutRect::new(LayoutPoint::new(x, y), LayoutSize::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_rect_components() {
        let rect = layout_rect(10.0, 20.0, 300.0, 400.0);
        assert_eq!(rect.origin, LayoutPoint::new(10.0, 20.0));
        assert_eq!(rect.size, LayoutSize::new(300.0, 400.0));
        assert_eq!(rect.max_x(), 310.0);
        assert_eq!(rect.max_y(), 420.0);
    }
}
