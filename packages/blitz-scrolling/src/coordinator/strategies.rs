//! Compositor hooks the coordinator drives on the main thread

use blitz_traits::geometry::{LayoutPoint, LayoutVector};
use blitz_traits::page::FrameViewFacts;

/// How the main frame's scroll layer follows a scroll position change
pub trait LayerPositioning {
    /// Whether fixed and sticky content gets its own compositing layers. Without
    /// them, any viewport-constrained object forces main-thread scrolling.
    fn supports_fixed_position_layers(&self) -> bool {
        true
    }

    /// Move the scroll layer to `position` immediately. Layer positions are negated
    /// scroll positions.
    fn set_scroll_layer_position(&self, position: LayoutPoint);

    /// The compositor already shows `position`: record it on the layer without
    /// moving it again
    fn sync_scroll_layer_position(&self, position: LayoutPoint);

    /// Move fixed and sticky layers by the offset computed for the new position
    fn reposition_viewport_constrained_layers(&self, offset: LayoutVector);
}

pub trait ScrollbarLayers {
    fn update_scrollbar_layers(&self, frame_view: &FrameViewFacts);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLayerPositioning;

impl LayerPositioning for NoopLayerPositioning {
    fn set_scroll_layer_position(&self, _position: LayoutPoint) {}
    fn sync_scroll_layer_position(&self, _position: LayoutPoint) {}
    fn reposition_viewport_constrained_layers(&self, _offset: LayoutVector) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScrollbarLayers;

impl ScrollbarLayers for NoopScrollbarLayers {
    fn update_scrollbar_layers(&self, _frame_view: &FrameViewFacts) {}
}
