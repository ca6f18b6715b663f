use std::time::Instant;

use blitz_traits::events::{BlitzWheelEvent, WheelEventPhase};
use blitz_traits::geometry::{LayoutPoint, LayoutRect, LayoutSize, LayoutVector};
use blitz_traits::page::{ScrollElasticity, ScrollbarMode};

use super::kinetic::{MomentumAnimation, ScrollHistory};
use super::layers::LayerUpdateScope;
use crate::state::{ChangedProperties, ScrollingNodeKind, ScrollingStateNode};
use crate::{MainThreadScrollingReasons, Region, ScrollingConfig, ScrollingNodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelEventHandling {
    Unhandled,
    Handled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollClamping {
    Clamped,
    Unclamped,
}

fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max.max(min))
}

/// Scroll one axis by `change`, spending any opposing rubber-band stretch first.
/// Returns the new position, rounded to whole pixels, and stretch.
fn scroll_axis(
    position: f32,
    min: f32,
    max: f32,
    stretch: f32,
    change: f32,
    elastic: bool,
    resistance: f32,
) -> (f32, f32) {
    let mut change = change;
    let mut stretch = stretch;
    if stretch != 0.0 && change != 0.0 && change.signum() != stretch.signum() {
        let relaxed = stretch + change;
        if relaxed == 0.0 || relaxed.signum() == stretch.signum() {
            return (position, relaxed);
        }
        change = relaxed;
        stretch = 0.0;
    }

    let target = position + change;
    if elastic {
        stretch += (target - clamp_axis(target, min, max)) * resistance;
    }
    (clamp_axis(target.round(), min, max), stretch)
}

/// Scrolling-thread mirror of one [`ScrollingStateNode`]
#[derive(Debug, Clone)]
pub struct ScrollingTreeNode {
    id: ScrollingNodeId,
    kind: ScrollingNodeKind,
    pub(crate) parent: Option<ScrollingNodeId>,
    pub(crate) children: Vec<ScrollingNodeId>,

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

    stretch: LayoutVector,
    history: ScrollHistory,
    animation: Option<MomentumAnimation>,
}

impl ScrollingTreeNode {
    pub fn new(kind: ScrollingNodeKind, id: ScrollingNodeId, config: &ScrollingConfig) -> Self {
        Self {
            id,
            kind,
            parent: None,
            children: Vec::new(),
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
            stretch: LayoutVector::zero(),
            history: ScrollHistory::from_config(config),
            animation: None,
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

    /// Current rubber-band overscroll, in scroll position direction
    pub fn stretch(&self) -> LayoutVector {
        self.stretch
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn is_pinned_left(&self) -> bool {
        self.scroll_position.x <= self.minimum_scroll_position.x
    }

    pub fn is_pinned_right(&self) -> bool {
        self.scroll_position.x >= self.maximum_scroll_position.x
    }

    /// Offset to apply to the scrolled contents layer
    pub fn scroll_offset(&self) -> LayoutVector {
        -(self.scroll_position.to_vector() + self.stretch)
    }

    /// Pull in the properties `state` marks as changed, or everything when `full`
    ///
    /// Requested scroll positions are left to the tree, which reports them back to
    /// the main thread.
    pub(crate) fn update_from_state_node(&mut self, state: &ScrollingStateNode, full: bool) {
        let changed = if full {
            ChangedProperties::all()
        } else {
            state.changed_properties()
        };

        if changed.contains(ChangedProperties::VIEWPORT_RECT) {
            self.viewport_rect = state.viewport_rect();
        }
        if changed.contains(ChangedProperties::CONTENT_SIZE) {
            self.content_size = state.content_size();
        }
        if changed.contains(ChangedProperties::SCROLL_ORIGIN) {
            self.scroll_origin = state.scroll_origin();
        }
        if changed.contains(ChangedProperties::SCROLL_LIMITS) {
            self.minimum_scroll_position = state.minimum_scroll_position();
            self.maximum_scroll_position = state.maximum_scroll_position();
        }
        if changed.contains(ChangedProperties::SCROLL_POSITION) {
            self.scroll_position = state.scroll_position();
        }
        if changed.contains(ChangedProperties::SCROLLBAR_MODES) {
            (self.horizontal_scrollbar_mode, self.vertical_scrollbar_mode) =
                state.scrollbar_modes();
        }
        if changed.contains(ChangedProperties::ELASTICITY) {
            (self.horizontal_elasticity, self.vertical_elasticity) = state.elasticity();
        }
        if changed.contains(ChangedProperties::FRAME_SCALE_FACTOR) {
            self.frame_scale_factor = state.frame_scale_factor();
        }
        if changed.contains(ChangedProperties::WHEEL_EVENT_HANDLER_COUNT) {
            self.wheel_event_handler_count = state.wheel_event_handler_count();
        }
        if changed.contains(ChangedProperties::NON_FAST_SCROLLABLE_REGION) {
            self.non_fast_scrollable_region = state.non_fast_scrollable_region().clone();
        }
        if changed.contains(ChangedProperties::MAIN_THREAD_SCROLLING_REASONS) {
            self.main_thread_scrolling_reasons = state.main_thread_scrolling_reasons();
        }
    }

    fn is_scrolling_disabled(&self) -> bool {
        self.horizontal_scrollbar_mode == ScrollbarMode::AlwaysOff
            && self.vertical_scrollbar_mode == ScrollbarMode::AlwaysOff
            && !self.horizontal_elasticity.is_elastic()
            && !self.vertical_elasticity.is_elastic()
    }

    fn has_scrollable_extent(&self) -> bool {
        self.maximum_scroll_position.x > self.minimum_scroll_position.x
            || self.maximum_scroll_position.y > self.minimum_scroll_position.y
    }

    fn axis_can_consume(
        change: f32,
        position: f32,
        min: f32,
        max: f32,
        mode: ScrollbarMode,
        elasticity: ScrollElasticity,
    ) -> bool {
        if change == 0.0 {
            return false;
        }
        if elasticity.is_elastic() {
            return true;
        }
        if mode == ScrollbarMode::AlwaysOff {
            return false;
        }
        if change < 0.0 {
            position > min
        } else {
            position < max
        }
    }

    pub fn can_handle_wheel_event(&self, event: &BlitzWheelEvent) -> bool {
        if self.is_scrolling_disabled() {
            return false;
        }
        if self.content_size.width <= 0.0 || self.content_size.height <= 0.0 {
            return false;
        }

        let change = -event.delta;
        if change.x == 0.0 && change.y == 0.0 {
            return self.has_scrollable_extent()
                || self.horizontal_elasticity.is_elastic()
                || self.vertical_elasticity.is_elastic();
        }

        Self::axis_can_consume(
            change.x,
            self.scroll_position.x,
            self.minimum_scroll_position.x,
            self.maximum_scroll_position.x,
            self.horizontal_scrollbar_mode,
            self.horizontal_elasticity,
        ) || Self::axis_can_consume(
            change.y,
            self.scroll_position.y,
            self.minimum_scroll_position.y,
            self.maximum_scroll_position.y,
            self.vertical_scrollbar_mode,
            self.vertical_elasticity,
        )
    }

    pub fn handle_wheel_event(
        &mut self,
        event: &BlitzWheelEvent,
        config: &ScrollingConfig,
        scope: &LayerUpdateScope<'_>,
    ) -> WheelEventHandling {
        // Our own animation replaces the platform's momentum
        if event.is_momentum() && self.animation.is_some() {
            return WheelEventHandling::Handled;
        }
        if !self.can_handle_wheel_event(event) {
            return WheelEventHandling::Unhandled;
        }

        let has_delta = event.delta.x != 0.0 || event.delta.y != 0.0;
        if has_delta && !event.is_momentum() {
            self.animation = None;
        }

        if has_delta {
            self.history.push(event.timestamp, event.delta);
            self.scroll_by(-event.delta, config);
        }

        if config.kinetic_scrolling
            && (event.is_end_of_non_momentum_scroll() || event.is_transitioning_to_momentum_scroll())
        {
            let velocity = match event.velocity {
                Some(velocity) => {
                    self.history.clear();
                    -velocity
                }
                None => -self.history.take_velocity(),
            };
            self.animation = MomentumAnimation::start(velocity, event.timestamp, config);

            #[cfg(feature = "tracing")]
            if self.animation.is_some() {
                tracing::trace!(
                    "Scrolling node {} starting momentum at {:?} px/s",
                    self.id,
                    velocity
                );
            }
        }

        if !Self::is_gesture_in_progress(event) {
            self.stretch = LayoutVector::zero();
        }

        self.reposition_scrolling_layers(scope);
        WheelEventHandling::Handled
    }

    fn is_gesture_in_progress(event: &BlitzWheelEvent) -> bool {
        matches!(
            event.phase,
            WheelEventPhase::Began
                | WheelEventPhase::Changed
                | WheelEventPhase::Stationary
                | WheelEventPhase::MayBegin
        ) || matches!(
            event.momentum_phase,
            WheelEventPhase::Began | WheelEventPhase::Changed | WheelEventPhase::Stationary
        )
    }

    /// Scroll by `change` in scroll position direction, stretching on elastic axes
    pub fn scroll_by(&mut self, change: LayoutVector, config: &ScrollingConfig) {
        let resistance = config.rubber_band_resistance;
        let (x, stretch_x) = scroll_axis(
            self.scroll_position.x,
            self.minimum_scroll_position.x,
            self.maximum_scroll_position.x,
            self.stretch.x,
            change.x,
            self.horizontal_elasticity.is_elastic(),
            resistance,
        );
        let (y, stretch_y) = scroll_axis(
            self.scroll_position.y,
            self.minimum_scroll_position.y,
            self.maximum_scroll_position.y,
            self.stretch.y,
            change.y,
            self.vertical_elasticity.is_elastic(),
            resistance,
        );
        self.scroll_position = LayoutPoint::new(x, y);
        self.stretch = LayoutVector::new(stretch_x, stretch_y);
    }

    /// Jump to `position`, cancelling stretch and momentum
    pub fn scroll_to(&mut self, position: LayoutPoint, clamping: ScrollClamping) {
        self.scroll_position = self.adjusted_scroll_position(position, clamping);
        self.stretch = LayoutVector::zero();
        self.animation = None;
        self.history.clear();
    }

    pub fn adjusted_scroll_position(
        &self,
        position: LayoutPoint,
        clamping: ScrollClamping,
    ) -> LayoutPoint {
        let rounded = position.round();
        match clamping {
            ScrollClamping::Unclamped => rounded,
            ScrollClamping::Clamped => LayoutPoint::new(
                clamp_axis(
                    rounded.x,
                    self.minimum_scroll_position.x,
                    self.maximum_scroll_position.x,
                ),
                clamp_axis(
                    rounded.y,
                    self.minimum_scroll_position.y,
                    self.maximum_scroll_position.y,
                ),
            ),
        }
    }

    pub(crate) fn set_scroll_position_from_tree(&mut self, position: LayoutPoint) {
        self.scroll_position = position;
    }

    /// Advance a running momentum animation. Returns whether it is still running.
    pub fn animate(
        &mut self,
        now: Instant,
        config: &ScrollingConfig,
        scope: &LayerUpdateScope<'_>,
    ) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        let Some(delta) = animation.step(now, config) else {
            self.animation = None;
            return false;
        };

        let before = self.scroll_position;
        self.scroll_position = self.adjusted_scroll_position(before + delta, ScrollClamping::Clamped);
        self.reposition_scrolling_layers(scope);

        // Ran into the edge, or slowed below half a pixel per frame
        if (delta.x != 0.0 || delta.y != 0.0) && self.scroll_position == before {
            self.animation = None;
            return false;
        }
        true
    }

    pub fn reposition_scrolling_layers(&self, scope: &LayerUpdateScope<'_>) {
        scope.set_scroll_offset(self.id, self.scroll_offset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ScrollingNodeGeometry;
    use crate::tree::layers::NoopLayerSink;
    use blitz_traits::geometry::layout_rect;
    use std::time::Duration;

    fn node(config: &ScrollingConfig) -> ScrollingTreeNode {
        let id = ScrollingNodeId::new(1).unwrap();
        let mut state = ScrollingStateNode::new(ScrollingNodeKind::FrameScrolling, id, None);
        state.update_geometry(&ScrollingNodeGeometry::for_overflow(
            layout_rect(0.0, 0.0, 800.0, 600.0),
            LayoutSize::new(800.0, 2000.0),
            LayoutPoint::zero(),
        ));
        let mut node = ScrollingTreeNode::new(ScrollingNodeKind::FrameScrolling, id, config);
        node.update_from_state_node(&state, true);
        node
    }

    fn wheel(dy: f32) -> BlitzWheelEvent {
        BlitzWheelEvent::new(LayoutPoint::new(10.0, 10.0), LayoutVector::new(0.0, dy))
    }

    #[test]
    fn test_scroll_is_clamped() {
        let config = ScrollingConfig::default();
        let sink = NoopLayerSink;
        let mut node = node(&config);
        let scope = LayerUpdateScope::new(&sink);

        node.handle_wheel_event(&wheel(-150.0), &config, &scope);
        assert_eq!(node.scroll_position(), LayoutPoint::new(0.0, 150.0));
        node.handle_wheel_event(&wheel(-5000.0), &config, &scope);
        assert_eq!(node.scroll_position(), LayoutPoint::new(0.0, 1400.0));
        assert_eq!(node.scroll_offset(), LayoutVector::new(0.0, -1400.0));
    }

    #[test]
    fn test_cannot_push_against_bound() {
        let config = ScrollingConfig::default();
        let node = node(&config);
        // Content moving down while already at the top
        assert!(!node.can_handle_wheel_event(&wheel(40.0)));
        assert!(node.can_handle_wheel_event(&wheel(-40.0)));
        assert!(node.can_handle_wheel_event(&wheel(0.0)));
    }

    #[test]
    fn test_elastic_axis_stretches_and_relaxes() {
        let config = ScrollingConfig::default();
        let sink = NoopLayerSink;
        let scope = LayerUpdateScope::new(&sink);
        let mut node = node(&config);
        node.vertical_elasticity = ScrollElasticity::Allowed;

        assert!(node.can_handle_wheel_event(&wheel(40.0)));
        node.handle_wheel_event(&wheel(40.0).with_phase(WheelEventPhase::Changed), &config, &scope);
        assert_eq!(node.scroll_position(), LayoutPoint::zero());
        assert_eq!(node.stretch(), LayoutVector::new(0.0, -20.0));

        node.handle_wheel_event(&wheel(0.0).with_phase(WheelEventPhase::Ended), &config, &scope);
        assert_eq!(node.stretch(), LayoutVector::zero());
    }

    #[test]
    fn test_disabled_node_rejects_everything() {
        let config = ScrollingConfig::default();
        let mut node = node(&config);
        node.horizontal_scrollbar_mode = ScrollbarMode::AlwaysOff;
        node.vertical_scrollbar_mode = ScrollbarMode::AlwaysOff;
        assert!(!node.can_handle_wheel_event(&wheel(-40.0)));
    }

    #[test]
    fn test_adjusted_scroll_position_rounds_then_clamps() {
        let config = ScrollingConfig::default();
        let node = node(&config);
        assert_eq!(
            node.adjusted_scroll_position(LayoutPoint::new(0.4, 99.6), ScrollClamping::Clamped),
            LayoutPoint::new(0.0, 100.0)
        );
        assert_eq!(
            node.adjusted_scroll_position(LayoutPoint::new(0.0, 9000.2), ScrollClamping::Clamped),
            LayoutPoint::new(0.0, 1400.0)
        );
        assert_eq!(
            node.adjusted_scroll_position(LayoutPoint::new(0.0, -30.4), ScrollClamping::Unclamped),
            LayoutPoint::new(0.0, -30.0)
        );
    }

    #[test]
    fn test_sub_pixel_deltas_keep_whole_pixel_positions() {
        let config = ScrollingConfig::default();
        let sink = NoopLayerSink;
        let scope = LayerUpdateScope::new(&sink);
        let mut node = node(&config);

        for _ in 0..3 {
            node.handle_wheel_event(&wheel(-0.4), &config, &scope);
            let y = node.scroll_position().y;
            assert_eq!(y, y.round(), "scroll position drifted to {y}");
        }
        node.handle_wheel_event(&wheel(-2.6), &config, &scope);
        assert_eq!(node.scroll_position(), LayoutPoint::new(0.0, 3.0));
    }

    #[test]
    fn test_unscrollable_node_leaves_event_unhandled() {
        let config = ScrollingConfig::default();
        let sink = NoopLayerSink;
        let scope = LayerUpdateScope::new(&sink);
        let id = ScrollingNodeId::new(1).unwrap();
        let mut empty = ScrollingTreeNode::new(ScrollingNodeKind::OverflowScrolling, id, &config);
        assert_eq!(
            empty.handle_wheel_event(&wheel(-40.0), &config, &scope),
            WheelEventHandling::Unhandled
        );

        let mut node = node(&config);
        assert_eq!(
            node.handle_wheel_event(&wheel(40.0), &config, &scope),
            WheelEventHandling::Unhandled,
            "already at the top"
        );
        assert_eq!(
            node.handle_wheel_event(&wheel(-40.0), &config, &scope),
            WheelEventHandling::Handled
        );
        assert_eq!(node.scroll_position(), LayoutPoint::new(0.0, 40.0));
    }

    #[test]
    fn test_kinetic_momentum_and_preemption() {
        let config = ScrollingConfig::with_kinetic_scrolling();
        let sink = NoopLayerSink;
        let scope = LayerUpdateScope::new(&sink);
        let mut node = node(&config);
        let start = Instant::now();

        for i in 0..4u64 {
            let event = wheel(-20.0)
                .with_phase(WheelEventPhase::Changed)
                .with_timestamp(start + Duration::from_millis(i * 10));
            node.handle_wheel_event(&event, &config, &scope);
        }
        let end = wheel(0.0)
            .with_phase(WheelEventPhase::Ended)
            .with_timestamp(start + Duration::from_millis(40));
        node.handle_wheel_event(&end, &config, &scope);
        assert!(node.is_animating());

        let before = node.scroll_position();
        assert!(node.animate(start + Duration::from_millis(56), &config, &scope));
        assert!(node.scroll_position().y > before.y);

        // Platform momentum is ignored while our animation runs
        let momentum = wheel(-300.0).with_momentum_phase(WheelEventPhase::Changed);
        let position = node.scroll_position();
        node.handle_wheel_event(&momentum, &config, &scope);
        assert_eq!(node.scroll_position(), position);

        // A new user delta stops it
        node.handle_wheel_event(&wheel(-1.0).with_phase(WheelEventPhase::Began), &config, &scope);
        assert!(!node.is_animating());
    }
}
