//! A union of axis-aligned rectangles
//!
//! Used for the non-fast-scrollable region: areas of the page where wheel input
//! cannot be resolved off the main thread.

use blitz_traits::geometry::{LayoutPoint, LayoutRect, LayoutVector};

/// Set of rectangles unioned together
///
/// The stored rectangles may overlap. Query results only depend on the union, never
/// on the order rectangles were added in.
#[derive(Debug, Clone, Default)]
pub struct Region {
    rects: Vec<LayoutRect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: LayoutRect) -> Self {
        let mut region = Self::new();
        region.unite(rect);
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[LayoutRect] {
        &self.rects
    }

    pub fn unite(&mut self, rect: LayoutRect) {
        if rect.is_empty() {
            return;
        }
        if self.rects.iter().any(|existing| existing.contains_rect(&rect)) {
            return;
        }
        self.rects.retain(|existing| !rect.contains_rect(existing));
        self.rects.push(rect);
    }

    pub fn unite_region(&mut self, other: &Region) {
        for rect in &other.rects {
            self.unite(*rect);
        }
    }

    /// Half-open containment: the right and bottom edges are outside
    pub fn contains(&self, point: LayoutPoint) -> bool {
        self.rects.iter().any(|rect| rect.contains(point))
    }

    pub fn intersects(&self, rect: &LayoutRect) -> bool {
        self.rects.iter().any(|existing| existing.intersects(rect))
    }

    /// Smallest rectangle covering the whole region
    pub fn bounds(&self) -> LayoutRect {
        self.rects
            .iter()
            .copied()
            .reduce(|acc, rect| acc.union(&rect))
            .unwrap_or_else(LayoutRect::zero)
    }

    pub fn translate(&mut self, offset: LayoutVector) {
        for rect in &mut self.rects {
            *rect = rect.translate(offset);
        }
    }

    pub fn translated(&self, offset: LayoutVector) -> Region {
        let mut region = self.clone();
        region.translate(offset);
        region
    }
}

impl FromIterator<LayoutRect> for Region {
    fn from_iter<I: IntoIterator<Item = LayoutRect>>(iter: I) -> Self {
        let mut region = Region::new();
        for rect in iter {
            region.unite(rect);
        }
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitz_traits::geometry::layout_rect;

    #[test]
    fn test_empty_region() {
        let region = Region::new();
        assert!(region.is_empty());
        assert!(!region.contains(LayoutPoint::new(0.0, 0.0)));
        assert!(!region.intersects(&layout_rect(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(region.bounds(), LayoutRect::zero());
    }

    #[test]
    fn test_empty_rects_are_ignored() {
        let mut region = Region::new();
        region.unite(layout_rect(10.0, 10.0, 0.0, 50.0));
        assert!(region.is_empty());
    }

    #[test]
    fn test_contained_rects_are_absorbed() {
        let mut region = Region::new();
        region.unite(layout_rect(10.0, 10.0, 10.0, 10.0));
        region.unite(layout_rect(0.0, 0.0, 100.0, 100.0));
        region.unite(layout_rect(50.0, 50.0, 5.0, 5.0));
        assert_eq!(region.rects().len(), 1);
        assert_eq!(region.bounds(), layout_rect(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_containment_is_half_open() {
        let region = Region::from_rect(layout_rect(0.0, 0.0, 100.0, 50.0));
        assert!(region.contains(LayoutPoint::new(0.0, 0.0)));
        assert!(region.contains(LayoutPoint::new(99.5, 49.5)));
        assert!(!region.contains(LayoutPoint::new(100.0, 10.0)));
        assert!(!region.contains(LayoutPoint::new(10.0, 50.0)));
    }

    #[test]
    fn test_disjoint_union() {
        let region: Region = [
            layout_rect(0.0, 0.0, 10.0, 10.0),
            layout_rect(100.0, 100.0, 10.0, 10.0),
        ]
        .into_iter()
        .collect();
        assert!(region.contains(LayoutPoint::new(5.0, 5.0)));
        assert!(region.contains(LayoutPoint::new(105.0, 105.0)));
        assert!(!region.contains(LayoutPoint::new(50.0, 50.0)));
        assert!(region.intersects(&layout_rect(8.0, 8.0, 4.0, 4.0)));
        assert!(!region.intersects(&layout_rect(20.0, 20.0, 40.0, 40.0)));
        assert_eq!(region.bounds(), layout_rect(0.0, 0.0, 110.0, 110.0));
    }

    #[test]
    fn test_translate() {
        let region = Region::from_rect(layout_rect(0.0, 0.0, 10.0, 10.0))
            .translated(LayoutVector::new(20.0, 30.0));
        assert!(region.contains(LayoutPoint::new(25.0, 35.0)));
        assert!(!region.contains(LayoutPoint::new(5.0, 5.0)));
    }
}
