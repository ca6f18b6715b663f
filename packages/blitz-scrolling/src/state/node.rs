use blitz_traits::geometry::{LayoutPoint, LayoutRect, LayoutSize};
use blitz_traits::page::{FrameViewFacts, ScrollElasticity, ScrollbarMode};

use crate::{MainThreadScrollingReasons, Region, ScrollingNodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollingNodeKind {
    /// The viewport of a frame. The root of the tree is the main frame's node.
    FrameScrolling,
    /// An overflow scrolling area inside a frame
    OverflowScrolling,
}

bitflags::bitflags! {
    /// Properties of a [`ScrollingStateNode`] touched since the last commit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangedProperties: u32 {
        const SCROLL_POSITION = 1 << 0;
        const SCROLL_LIMITS = 1 << 1;
        const CONTENT_SIZE = 1 << 2;
        const VIEWPORT_RECT = 1 << 3;
        const SCROLL_ORIGIN = 1 << 4;
        const SCROLLBAR_MODES = 1 << 5;
        const ELASTICITY = 1 << 6;
        const FRAME_SCALE_FACTOR = 1 << 7;
        const WHEEL_EVENT_HANDLER_COUNT = 1 << 8;
        const NON_FAST_SCROLLABLE_REGION = 1 << 9;
        const MAIN_THREAD_SCROLLING_REASONS = 1 << 10;
        const REQUESTED_SCROLL_POSITION = 1 << 11;
        const CHILD_NODES = 1 << 12;
    }
}

/// Layout geometry of one scrollable area
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollingNodeGeometry {
    /// Visible area, in main frame document coordinates
    pub viewport_rect: LayoutRect,
    pub content_size: LayoutSize,
    pub scroll_position: LayoutPoint,
    pub scroll_origin: LayoutPoint,
    pub minimum_scroll_position: LayoutPoint,
    pub maximum_scroll_position: LayoutPoint,
    pub horizontal_scrollbar_mode: ScrollbarMode,
    pub vertical_scrollbar_mode: ScrollbarMode,
    pub horizontal_elasticity: ScrollElasticity,
    pub vertical_elasticity: ScrollElasticity,
    pub frame_scale_factor: f32,
}

impl ScrollingNodeGeometry {
    pub fn from_frame_view(facts: &FrameViewFacts) -> Self {
        Self {
            viewport_rect: facts.visible_content_rect,
            content_size: facts.contents_size,
            scroll_position: facts.scroll_position,
            scroll_origin: facts.scroll_origin,
            minimum_scroll_position: facts.minimum_scroll_position(),
            maximum_scroll_position: facts.maximum_scroll_position(),
            horizontal_scrollbar_mode: facts.horizontal_scrollbar_mode,
            vertical_scrollbar_mode: facts.vertical_scrollbar_mode,
            horizontal_elasticity: facts.horizontal_elasticity,
            vertical_elasticity: facts.vertical_elasticity,
            frame_scale_factor: facts.frame_scale_factor,
        }
    }

    /// Geometry of a left-to-right overflow area with automatic scrollbars
    pub fn for_overflow(
        viewport_rect: LayoutRect,
        content_size: LayoutSize,
        scroll_position: LayoutPoint,
    ) -> Self {
        let maximum_scroll_position = LayoutPoint::new(
            f32::max(0.0, content_size.width - viewport_rect.width()),
            f32::max(0.0, content_size.height - viewport_rect.height()),
        );
        Self {
            viewport_rect,
            content_size,
            scroll_position,
            scroll_origin: LayoutPoint::zero(),
            minimum_scroll_position: LayoutPoint::zero(),
            maximum_scroll_position,
            horizontal_scrollbar_mode: ScrollbarMode::Auto,
            vertical_scrollbar_mode: ScrollbarMode::Auto,
            horizontal_elasticity: ScrollElasticity::None,
            vertical_elasticity: ScrollElasticity::None,
            frame_scale_factor: 1.0,
        }
    }
}

/// Main-thread record of one scrollable area
///
/// Every setter only marks its property as changed when the value actually differs,
/// so a commit carries exactly what moved since the previous one.
#[derive(Debug, Clone)]
pub struct ScrollingStateNode {
    id: ScrollingNodeId,
    kind: ScrollingNodeKind,
    pub(crate) parent: Option<ScrollingNodeId>,
    pub(crate) children: Vec<ScrollingNodeId>,
    changed: ChangedProperties,

    scroll_position: LayoutPoint,
    minimum_scroll_position: LayoutPoint,
    maximum_scroll_position: LayoutPoint,
    content_size: LayoutSize,
    viewport_rect: LayoutRect,
    scroll_origin: LayoutPoint,
    horizontal_scrollbar_mode: ScrollbarMode,
    vertical_scrollbar_mode: ScrollbarMode,
    horizontal_elasticity: ScrollElasticity,
    vertical_elasticity: ScrollElasticity,
    frame_scale_factor: f32,
    wheel_event_handler_count: u32,
    non_fast_scrollable_region: Region,
    main_thread_scrolling_reasons: MainThreadScrollingReasons,
    requested_scroll_position: Option<LayoutPoint>,
}

fn set_if_changed<T: PartialEq>(
    field: &mut T,
    value: T,
    changed: &mut ChangedProperties,
    flag: ChangedProperties,
) {
    if *field != value {
        *field = value;
        changed.insert(flag);
    }
}

impl ScrollingStateNode {
    /// A freshly attached node reports every property as changed
    pub fn new(
        kind: ScrollingNodeKind,
        id: ScrollingNodeId,
        parent: Option<ScrollingNodeId>,
    ) -> Self {
        Self {
            id,
            kind,
            parent,
            children: Vec::new(),
            changed: ChangedProperties::all(),
            scroll_position: LayoutPoint::zero(),
            minimum_scroll_position: LayoutPoint::zero(),
            maximum_scroll_position: LayoutPoint::zero(),
            content_size: LayoutSize::zero(),
            viewport_rect: LayoutRect::zero(),
            scroll_origin: LayoutPoint::zero(),
            horizontal_scrollbar_mode: ScrollbarMode::Auto,
            vertical_scrollbar_mode: ScrollbarMode::Auto,
            horizontal_elasticity: ScrollElasticity::None,
            vertical_elasticity: ScrollElasticity::None,
            frame_scale_factor: 1.0,
            wheel_event_handler_count: 0,
            non_fast_scrollable_region: Region::new(),
            main_thread_scrolling_reasons: MainThreadScrollingReasons::empty(),
            requested_scroll_position: None,
        }
    }

    pub fn id(&self) -> ScrollingNodeId {
        self.id
    }

    pub fn kind(&self) -> ScrollingNodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ScrollingNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScrollingNodeId] {
        &self.children
    }

    pub fn changed_properties(&self) -> ChangedProperties {
        self.changed
    }

    pub fn has_changed_property(&self, property: ChangedProperties) -> bool {
        self.changed.intersects(property)
    }

    pub fn has_changed_properties(&self) -> bool {
        !self.changed.is_empty()
    }

    pub(crate) fn clear_changed_properties(&mut self) {
        self.changed = ChangedProperties::empty();
    }

    pub(crate) fn mark_children_changed(&mut self) {
        self.changed.insert(ChangedProperties::CHILD_NODES);
    }

    pub fn scroll_position(&self) -> LayoutPoint {
        self.scroll_position
    }

    pub fn minimum_scroll_position(&self) -> LayoutPoint {
        self.minimum_scroll_position
    }

    pub fn maximum_scroll_position(&self) -> LayoutPoint {
        self.maximum_scroll_position
    }

    pub fn content_size(&self) -> LayoutSize {
        self.content_size
    }

    pub fn viewport_rect(&self) -> LayoutRect {
        self.viewport_rect
    }

    pub fn scroll_origin(&self) -> LayoutPoint {
        self.scroll_origin
    }

    pub fn scrollbar_modes(&self) -> (ScrollbarMode, ScrollbarMode) {
        (self.horizontal_scrollbar_mode, self.vertical_scrollbar_mode)
    }

    pub fn elasticity(&self) -> (ScrollElasticity, ScrollElasticity) {
        (self.horizontal_elasticity, self.vertical_elasticity)
    }

    pub fn frame_scale_factor(&self) -> f32 {
        self.frame_scale_factor
    }

    pub fn wheel_event_handler_count(&self) -> u32 {
        self.wheel_event_handler_count
    }

    pub fn non_fast_scrollable_region(&self) -> &Region {
        &self.non_fast_scrollable_region
    }

    pub fn main_thread_scrolling_reasons(&self) -> MainThreadScrollingReasons {
        self.main_thread_scrolling_reasons
    }

    pub fn requested_scroll_position(&self) -> Option<LayoutPoint> {
        self.requested_scroll_position
    }

    pub fn set_scroll_position(&mut self, position: LayoutPoint) {
        set_if_changed(
            &mut self.scroll_position,
            position,
            &mut self.changed,
            ChangedProperties::SCROLL_POSITION,
        );
    }

    /// Record a position the scrolling tree already holds, without sending it back
    pub(crate) fn sync_scroll_position_from_tree(&mut self, position: LayoutPoint) {
        self.scroll_position = position;
    }

    pub fn set_scroll_limits(&mut self, minimum: LayoutPoint, maximum: LayoutPoint) {
        if self.minimum_scroll_position != minimum || self.maximum_scroll_position != maximum {
            self.minimum_scroll_position = minimum;
            self.maximum_scroll_position = maximum;
            self.changed.insert(ChangedProperties::SCROLL_LIMITS);
        }
    }

    pub fn set_content_size(&mut self, size: LayoutSize) {
        set_if_changed(
            &mut self.content_size,
            size,
            &mut self.changed,
            ChangedProperties::CONTENT_SIZE,
        );
    }

    pub fn set_viewport_rect(&mut self, rect: LayoutRect) {
        set_if_changed(
            &mut self.viewport_rect,
            rect,
            &mut self.changed,
            ChangedProperties::VIEWPORT_RECT,
        );
    }

    pub fn set_scroll_origin(&mut self, origin: LayoutPoint) {
        set_if_changed(
            &mut self.scroll_origin,
            origin,
            &mut self.changed,
            ChangedProperties::SCROLL_ORIGIN,
        );
    }

    pub fn set_scrollbar_modes(&mut self, horizontal: ScrollbarMode, vertical: ScrollbarMode) {
        if (self.horizontal_scrollbar_mode, self.vertical_scrollbar_mode) != (horizontal, vertical)
        {
            self.horizontal_scrollbar_mode = horizontal;
            self.vertical_scrollbar_mode = vertical;
            self.changed.insert(ChangedProperties::SCROLLBAR_MODES);
        }
    }

    pub fn set_elasticity(&mut self, horizontal: ScrollElasticity, vertical: ScrollElasticity) {
        if (self.horizontal_elasticity, self.vertical_elasticity) != (horizontal, vertical) {
            self.horizontal_elasticity = horizontal;
            self.vertical_elasticity = vertical;
            self.changed.insert(ChangedProperties::ELASTICITY);
        }
    }

    pub fn set_frame_scale_factor(&mut self, scale: f32) {
        set_if_changed(
            &mut self.frame_scale_factor,
            scale,
            &mut self.changed,
            ChangedProperties::FRAME_SCALE_FACTOR,
        );
    }

    pub fn set_wheel_event_handler_count(&mut self, count: u32) {
        set_if_changed(
            &mut self.wheel_event_handler_count,
            count,
            &mut self.changed,
            ChangedProperties::WHEEL_EVENT_HANDLER_COUNT,
        );
    }

    pub fn set_non_fast_scrollable_region(&mut self, region: Region) {
        if self.non_fast_scrollable_region.rects() != region.rects() {
            self.non_fast_scrollable_region = region;
            self.changed
                .insert(ChangedProperties::NON_FAST_SCROLLABLE_REGION);
        }
    }

    pub fn set_main_thread_scrolling_reasons(&mut self, reasons: MainThreadScrollingReasons) {
        set_if_changed(
            &mut self.main_thread_scrolling_reasons,
            reasons,
            &mut self.changed,
            ChangedProperties::MAIN_THREAD_SCROLLING_REASONS,
        );
    }

    /// A request is an event, not a value: asking twice for the same position
    /// scrolls twice
    pub fn set_requested_scroll_position(&mut self, position: LayoutPoint) {
        self.requested_scroll_position = Some(position);
        self.changed
            .insert(ChangedProperties::REQUESTED_SCROLL_POSITION);
    }

    pub fn update_geometry(&mut self, geometry: &ScrollingNodeGeometry) {
        self.set_viewport_rect(geometry.viewport_rect);
        self.set_content_size(geometry.content_size);
        self.set_scroll_origin(geometry.scroll_origin);
        self.set_scroll_limits(
            geometry.minimum_scroll_position,
            geometry.maximum_scroll_position,
        );
        self.set_scroll_position(geometry.scroll_position);
        self.set_scrollbar_modes(
            geometry.horizontal_scrollbar_mode,
            geometry.vertical_scrollbar_mode,
        );
        self.set_elasticity(geometry.horizontal_elasticity, geometry.vertical_elasticity);
        self.set_frame_scale_factor(geometry.frame_scale_factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitz_traits::geometry::layout_rect;

    fn node() -> ScrollingStateNode {
        let mut node = ScrollingStateNode::new(
            ScrollingNodeKind::FrameScrolling,
            ScrollingNodeId::new(1).unwrap(),
            None,
        );
        node.clear_changed_properties();
        node
    }

    #[test]
    fn test_new_node_reports_everything_changed() {
        let node = ScrollingStateNode::new(
            ScrollingNodeKind::OverflowScrolling,
            ScrollingNodeId::new(3).unwrap(),
            ScrollingNodeId::new(1),
        );
        assert_eq!(node.changed_properties(), ChangedProperties::all());
    }

    #[test]
    fn test_setting_same_value_does_not_mark_change() {
        let mut node = node();
        node.set_scroll_position(LayoutPoint::zero());
        node.set_wheel_event_handler_count(0);
        node.set_non_fast_scrollable_region(Region::new());
        assert!(!node.has_changed_properties());
    }

    #[test]
    fn test_only_touched_properties_are_marked() {
        let mut node = node();
        node.set_scroll_position(LayoutPoint::new(0.0, 40.0));
        node.set_content_size(LayoutSize::new(800.0, 2000.0));
        assert_eq!(
            node.changed_properties(),
            ChangedProperties::SCROLL_POSITION | ChangedProperties::CONTENT_SIZE
        );
    }

    #[test]
    fn test_requested_scroll_position_always_marks() {
        let mut node = node();
        node.set_requested_scroll_position(LayoutPoint::new(0.0, 100.0));
        node.clear_changed_properties();
        node.set_requested_scroll_position(LayoutPoint::new(0.0, 100.0));
        assert!(node.has_changed_property(ChangedProperties::REQUESTED_SCROLL_POSITION));
    }

    #[test]
    fn test_overflow_geometry_limits() {
        let geometry = ScrollingNodeGeometry::for_overflow(
            layout_rect(0.0, 100.0, 300.0, 200.0),
            LayoutSize::new(300.0, 1000.0),
            LayoutPoint::zero(),
        );
        assert_eq!(geometry.maximum_scroll_position, LayoutPoint::new(0.0, 800.0));

        let mut node = node();
        node.update_geometry(&geometry);
        assert!(node.has_changed_property(ChangedProperties::SCROLL_LIMITS));
        assert!(node.has_changed_property(ChangedProperties::VIEWPORT_RECT));
        assert!(!node.has_changed_property(ChangedProperties::SCROLL_POSITION));
    }
}
