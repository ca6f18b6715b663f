//! The page as seen by the scrolling coordinator
//!
//! Layout owns the real frame tree. The coordinator only ever reads a
//! [`FrameViewFacts`] snapshot per frame and calls back into the page on the main
//! thread through [`ScrollingPageProvider`].

use crate::events::BlitzWheelEvent;
use crate::geometry::{LayoutPoint, LayoutRect, LayoutSize, LayoutVector};

/// Identifies a frame within a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollbarMode {
    #[default]
    Auto,
    AlwaysOff,
    AlwaysOn,
}

/// Whether an axis may be scrolled past its bounds with a spring-back effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollElasticity {
    #[default]
    None,
    Automatic,
    Allowed,
}

impl ScrollElasticity {
    #[inline]
    pub fn is_elastic(self) -> bool {
        self != ScrollElasticity::None
    }
}

/// A scrollable area inside a frame, as computed by layout
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollableAreaFacts {
    /// Bounding box in the frame's document coordinates
    pub bounding_box: LayoutRect,
    /// The area is scrolled by the compositor rather than by repainting
    pub uses_compositor_scrolling: bool,
}

/// A plugin view embedded in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct PluginFacts {
    pub frame_rect: LayoutRect,
    pub wants_wheel_events: bool,
}

/// Everything the scrolling coordinator needs to know about one frame view
#[derive(Debug, Clone, PartialEq)]
pub struct FrameViewFacts {
    /// Offset of this frame's origin within its parent frame's document
    pub location_in_parent: LayoutVector,
    pub scrollable_areas: Vec<ScrollableAreaFacts>,
    pub plugins: Vec<PluginFacts>,
    /// Wheel event listeners registered on this frame's document
    pub wheel_event_handler_count: u32,
    pub has_slow_repaint_objects: bool,
    pub has_viewport_constrained_objects: bool,
    /// Viewport-constrained objects that are not painted into their own layer
    pub has_non_layer_fixed_objects: bool,
    pub is_image_document: bool,
    pub visible_content_rect: LayoutRect,
    pub contents_size: LayoutSize,
    pub scroll_position: LayoutPoint,
    /// Non-zero for right-to-left or bottom-up documents
    pub scroll_origin: LayoutPoint,
    pub frame_scale_factor: f32,
    pub fixed_elements_layout_relative_to_frame: bool,
    pub horizontal_scrollbar_mode: ScrollbarMode,
    pub vertical_scrollbar_mode: ScrollbarMode,
    pub horizontal_elasticity: ScrollElasticity,
    pub vertical_elasticity: ScrollElasticity,
}

impl Default for FrameViewFacts {
    fn default() -> Self {
        Self {
            location_in_parent: LayoutVector::zero(),
            scrollable_areas: Vec::new(),
            plugins: Vec::new(),
            wheel_event_handler_count: 0,
            has_slow_repaint_objects: false,
            has_viewport_constrained_objects: false,
            has_non_layer_fixed_objects: false,
            is_image_document: false,
            visible_content_rect: LayoutRect::zero(),
            contents_size: LayoutSize::zero(),
            scroll_position: LayoutPoint::zero(),
            scroll_origin: LayoutPoint::zero(),
            frame_scale_factor: 1.0,
            fixed_elements_layout_relative_to_frame: false,
            horizontal_scrollbar_mode: ScrollbarMode::Auto,
            vertical_scrollbar_mode: ScrollbarMode::Auto,
            horizontal_elasticity: ScrollElasticity::None,
            vertical_elasticity: ScrollElasticity::None,
        }
    }
}

impl FrameViewFacts {
    pub fn minimum_scroll_position(&self) -> LayoutPoint {
        LayoutPoint::new(-self.scroll_origin.x, -self.scroll_origin.y)
    }

    pub fn maximum_scroll_position(&self) -> LayoutPoint {
        let minimum = self.minimum_scroll_position();
        let visible = self.visible_content_rect.size;
        LayoutPoint::new(
            f32::max(
                minimum.x,
                self.contents_size.width - visible.width - self.scroll_origin.x,
            ),
            f32::max(
                minimum.y,
                self.contents_size.height - visible.height - self.scroll_origin.y,
            ),
        )
    }
}

/// Main-thread view of a page, implemented by the embedder
///
/// Every method is called on the main thread only.
pub trait ScrollingPageProvider {
    fn main_frame(&self) -> FrameId;

    /// Direct child frames, in frame tree order
    fn child_frames(&self, frame: FrameId) -> Vec<FrameId>;

    /// `None` when the frame has no view (detached, or not laid out yet)
    fn frame_view(&self, frame: FrameId) -> Option<FrameViewFacts>;

    /// The page's root render tree is layer-backed
    fn uses_accelerated_compositing(&self) -> bool;

    fn set_constrains_scrolling_to_content_edge(&self, frame: FrameId, constrains: bool);

    /// Tell the frame view its scroll position changed underneath it
    fn notify_scroll_position_changed(&self, frame: FrameId, position: LayoutPoint);

    fn in_programmatic_scroll(&self, frame: FrameId) -> bool {
        let _ = frame;
        false
    }

    fn set_in_programmatic_scroll(&self, frame: FrameId, programmatic: bool) {
        let _ = (frame, programmatic);
    }

    /// Dispatch through the ordinary DOM event path. Returns true when the page
    /// consumed the event.
    fn dispatch_wheel_event(&self, event: &BlitzWheelEvent) -> bool;
}

/// A page with a single, empty, non-composited main frame
pub struct DummyPageProvider;

impl ScrollingPageProvider for DummyPageProvider {
    fn main_frame(&self) -> FrameId {
        FrameId(0)
    }
    fn child_frames(&self, _frame: FrameId) -> Vec<FrameId> {
        Vec::new()
    }
    fn frame_view(&self, _frame: FrameId) -> Option<FrameViewFacts> {
        None
    }
    fn uses_accelerated_compositing(&self) -> bool {
        false
    }
    fn set_constrains_scrolling_to_content_edge(&self, _frame: FrameId, _constrains: bool) {}
    fn notify_scroll_position_changed(&self, _frame: FrameId, _position: LayoutPoint) {}
    fn dispatch_wheel_event(&self, _event: &BlitzWheelEvent) -> bool {
        false
    }
}
