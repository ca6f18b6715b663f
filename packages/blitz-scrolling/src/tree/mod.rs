//! The scrolling tree: the scrolling thread's mirror of the committed state tree
//!
//! Hit-testing and commit application happen under one mutex, so a wheel event is
//! always classified against a single, complete snapshot. Swipe state lives behind a
//! second mutex which is only ever taken after the first.

mod kinetic;
mod layers;
mod node;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use blitz_traits::events::{BlitzWheelEvent, WheelEventPhase};
use blitz_traits::geometry::{LayoutPoint, LayoutRect};
use crossbeam_channel::Sender;
use parking_lot::Mutex;

pub use kinetic::{MomentumAnimation, ScrollHistory};
pub use layers::{LayerUpdateScope, NoopLayerSink, ScrollingLayerSink};
pub use node::{ScrollClamping, ScrollingTreeNode, WheelEventHandling};

use crate::state::{ChangedProperties, ScrollingStateTree};
use crate::thread::{ScrollingLayerPositionAction, ScrollingTreeMessage};
use crate::{MainThreadScrollingReasons, Region, ScrollingConfig, ScrollingNodeId};

/// Outcome of classifying a wheel event on the scrolling tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollingEventResult {
    /// Neither side should scroll, e.g. the event starts a back/forward swipe
    DidNotHandleEvent,
    /// The scrolling thread owns this event
    DidHandleEvent,
    /// Only the main thread can handle this event
    SendToMainThread,
}

enum WheelTarget {
    Node(ScrollingNodeId),
    MainThread,
    Nothing,
}

#[derive(Debug, Default)]
pub(crate) struct TreeState {
    pub(crate) nodes: HashMap<ScrollingNodeId, ScrollingTreeNode>,
    pub(crate) root: Option<ScrollingNodeId>,
    pub(crate) non_fast_scrollable_region: Region,
    pub(crate) main_frame_scroll_position: LayoutPoint,
    pub(crate) has_wheel_event_handlers: bool,
    pub(crate) main_thread_scrolling_reasons: MainThreadScrollingReasons,
    pub(crate) latched_node: Option<ScrollingNodeId>,
    pub(crate) invalidated: bool,
}

impl TreeState {
    /// Wheel events arrive in viewport coordinates, node rects are in document ones
    fn document_point(&self, point: LayoutPoint) -> LayoutPoint {
        point + self.main_frame_scroll_position.to_vector()
    }

    /// Deepest node whose viewport contains `point`. The root contains every point.
    fn deepest_node_at(&self, point: LayoutPoint) -> Option<ScrollingNodeId> {
        let mut current = self.root?;
        'descend: loop {
            let Some(node) = self.nodes.get(&current) else {
                return Some(current);
            };
            // Later siblings paint on top
            for child in node.children().iter().rev() {
                let hit = self
                    .nodes
                    .get(child)
                    .is_some_and(|child| child.viewport_rect().contains(point));
                if hit {
                    current = *child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    fn resolve_target(&self, event: &BlitzWheelEvent, point: LayoutPoint) -> WheelTarget {
        let root_on_main_thread = !self.main_thread_scrolling_reasons.is_empty();

        if let Some(latched) = self.latched_node {
            if self.nodes.contains_key(&latched) {
                if root_on_main_thread && self.root == Some(latched) {
                    return WheelTarget::MainThread;
                }
                return WheelTarget::Node(latched);
            }
        }

        let mut current = self.deepest_node_at(point);
        while let Some(id) = current {
            let Some(node) = self.nodes.get(&id) else {
                break;
            };
            if root_on_main_thread && self.root == Some(id) {
                return WheelTarget::MainThread;
            }
            if node.can_handle_wheel_event(event) {
                return WheelTarget::Node(id);
            }
            current = node.parent();
        }

        if root_on_main_thread {
            WheelTarget::MainThread
        } else {
            WheelTarget::Nothing
        }
    }

    fn root_pin_state(&self) -> Option<(bool, bool)> {
        let root = self.nodes.get(&self.root?)?;
        Some((root.is_pinned_left(), root.is_pinned_right()))
    }
}

#[derive(Debug, Default)]
struct SwipeState {
    can_go_back: bool,
    can_go_forward: bool,
    main_frame_pinned_to_left: bool,
    main_frame_pinned_to_right: bool,
    rubber_bands_at_left: bool,
    rubber_bands_at_right: bool,
}

pub struct ScrollingTree {
    pub(crate) state: Mutex<TreeState>,
    swipe_state: Mutex<SwipeState>,
    config: ScrollingConfig,
    layer_sink: Arc<dyn ScrollingLayerSink>,
    main_thread: Sender<ScrollingTreeMessage>,
    scrolling_performance_logging: AtomicBool,
}

impl ScrollingTree {
    pub fn new(
        config: ScrollingConfig,
        layer_sink: Arc<dyn ScrollingLayerSink>,
        main_thread: Sender<ScrollingTreeMessage>,
    ) -> Self {
        let scrolling_performance_logging = AtomicBool::new(config.scrolling_performance_logging);
        Self {
            state: Mutex::new(TreeState::default()),
            swipe_state: Mutex::new(SwipeState::default()),
            config,
            layer_sink,
            main_thread,
            scrolling_performance_logging,
        }
    }

    pub fn config(&self) -> &ScrollingConfig {
        &self.config
    }

    fn post(&self, message: ScrollingTreeMessage) {
        if self.main_thread.send(message).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!("Main thread stopped listening, dropping scrolling tree message");
        }
    }

    /// Decide who handles `event`. Safe to call from any thread.
    pub fn try_to_handle_wheel_event(&self, event: &BlitzWheelEvent) -> ScrollingEventResult {
        let mut state = self.state.lock();

        if state.invalidated || state.root.is_none() {
            return ScrollingEventResult::SendToMainThread;
        }

        // Script may cancel the event
        if state.has_wheel_event_handlers {
            return ScrollingEventResult::SendToMainThread;
        }

        let point = state.document_point(event.position);
        if state.non_fast_scrollable_region.contains(point) {
            #[cfg(feature = "tracing")]
            tracing::trace!("Wheel event at {point:?} is in the non-fast scrollable region");
            return ScrollingEventResult::SendToMainThread;
        }

        if event.should_reset_latching() {
            state.latched_node = None;
        }

        if self.will_wheel_event_start_swipe_gesture(event) {
            return ScrollingEventResult::DidNotHandleEvent;
        }

        match state.resolve_target(event, point) {
            WheelTarget::Node(id) => {
                if event.should_consider_latching() {
                    state.latched_node = Some(id);
                }
                #[cfg(feature = "tracing")]
                tracing::trace!("Wheel event targets scrolling node {id}");
                ScrollingEventResult::DidHandleEvent
            }
            WheelTarget::MainThread => ScrollingEventResult::SendToMainThread,
            WheelTarget::Nothing => ScrollingEventResult::DidHandleEvent,
        }
    }

    /// Scroll the node targeted by `event`, or the nearest ancestor that can take it
    ///
    /// Called by the scrolling thread for events classified as `DidHandleEvent`.
    pub fn handle_wheel_event(&self, event: &BlitzWheelEvent) -> ScrollingEventResult {
        let started = Instant::now();
        let mut state = self.state.lock();
        if state.invalidated || state.root.is_none() {
            return ScrollingEventResult::SendToMainThread;
        }

        if event.should_reset_latching() {
            state.latched_node = None;
        }

        let point = state.document_point(event.position);
        let target = match state.resolve_target(event, point) {
            WheelTarget::Node(id) => id,
            WheelTarget::MainThread => return ScrollingEventResult::SendToMainThread,
            WheelTarget::Nothing => return ScrollingEventResult::DidHandleEvent,
        };
        if event.should_consider_latching() {
            state.latched_node = Some(target);
        }

        // The target may refuse once it is asked to scroll, e.g. a latched node
        // pushed against its edge. Hand the event up the ancestor chain then.
        let scope = LayerUpdateScope::new(self.layer_sink.as_ref());
        let root_on_main_thread = !state.main_thread_scrolling_reasons.is_empty();
        let mut target = target;
        let (before, position) = loop {
            if root_on_main_thread && state.root == Some(target) {
                return ScrollingEventResult::SendToMainThread;
            }
            let Some(node) = state.nodes.get_mut(&target) else {
                return ScrollingEventResult::SendToMainThread;
            };
            let before = node.scroll_position();
            if node.handle_wheel_event(event, &self.config, &scope) == WheelEventHandling::Handled {
                break (before, node.scroll_position());
            }
            match node.parent() {
                Some(parent) => target = parent,
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("No scrolling node could take the wheel event");
                    return ScrollingEventResult::SendToMainThread;
                }
            }
        };
        drop(scope);
        let is_root = state.root == Some(target);

        if is_root {
            state.main_frame_scroll_position = position;
            if let Some((left, right)) = state.root_pin_state() {
                self.set_main_frame_pin_state(left, right);
            }
        }
        drop(state);

        if position != before {
            self.post(ScrollingTreeMessage::ScrollPositionChanged {
                node_id: target,
                position,
                is_programmatic: false,
                action: ScrollingLayerPositionAction::Sync,
            });
        }

        if self.scrolling_performance_logging_enabled() {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "Scrolling performance: node {target} handled wheel event in {:?}",
                started.elapsed()
            );
        }
        #[cfg(not(feature = "tracing"))]
        let _ = started;

        ScrollingEventResult::DidHandleEvent
    }

    /// Replace the tree's contents with a committed snapshot
    ///
    /// Nothing is observable halfway: hit-testing waits for the whole snapshot to be
    /// applied.
    pub fn commit_new_tree_state(&self, snapshot: ScrollingStateTree) {
        let mut state = self.state.lock();
        if state.invalidated {
            #[cfg(feature = "tracing")]
            tracing::trace!("Ignoring commit to an invalidated scrolling tree");
            return;
        }

        let scope = LayerUpdateScope::new(self.layer_sink.as_ref());

        if snapshot.has_new_root_node() {
            state.nodes.clear();
            state.latched_node = None;
        }
        for removed in snapshot.removed_nodes() {
            state.nodes.remove(removed);
        }

        let order = snapshot.traverse();
        let mut requested = Vec::new();
        for id in &order {
            let Some(state_node) = snapshot.node(*id) else {
                continue;
            };
            let full = !state.nodes.contains_key(id);
            let node = state
                .nodes
                .entry(*id)
                .or_insert_with(|| ScrollingTreeNode::new(state_node.kind(), *id, &self.config));
            node.update_from_state_node(state_node, full);
            node.parent = state_node.parent();
            node.children = state_node.children().to_vec();

            if state_node.has_changed_property(ChangedProperties::REQUESTED_SCROLL_POSITION) {
                if let Some(position) = state_node.requested_scroll_position() {
                    requested.push((*id, position));
                }
            }
        }

        let visited: HashSet<ScrollingNodeId> = order.iter().copied().collect();
        state.nodes.retain(|id, _| visited.contains(id));
        state.root = snapshot.root_id();
        if let Some(latched) = state.latched_node {
            if !state.nodes.contains_key(&latched) {
                state.latched_node = None;
            }
        }

        let mut region = Region::new();
        for node in state.nodes.values() {
            region.unite_region(node.non_fast_scrollable_region());
        }
        state.non_fast_scrollable_region = region;

        let root_facts = state.root.and_then(|root| state.nodes.get(&root)).map(|root| {
            (
                root.wheel_event_handler_count() > 0,
                root.main_thread_scrolling_reasons(),
                root.scroll_position(),
            )
        });
        let (has_handlers, reasons, position) = root_facts.unwrap_or((
            false,
            MainThreadScrollingReasons::empty(),
            LayoutPoint::zero(),
        ));
        state.has_wheel_event_handlers = has_handlers;
        state.main_thread_scrolling_reasons = reasons;
        state.main_frame_scroll_position = position;

        let mut messages = Vec::with_capacity(requested.len());
        for (id, position) in requested {
            let Some(node) = state.nodes.get_mut(&id) else {
                continue;
            };
            node.scroll_to(position, ScrollClamping::Clamped);
            let position = node.scroll_position();
            if state.root == Some(id) {
                state.main_frame_scroll_position = position;
            }
            messages.push(ScrollingTreeMessage::ScrollPositionChanged {
                node_id: id,
                position,
                is_programmatic: true,
                action: ScrollingLayerPositionAction::Set,
            });
        }

        for node in state.nodes.values() {
            node.reposition_scrolling_layers(&scope);
        }
        drop(scope);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Committed scrolling tree: {} nodes, reasons: {}",
            state.nodes.len(),
            state.main_thread_scrolling_reasons
        );

        if let Some((left, right)) = state.root_pin_state() {
            self.set_main_frame_pin_state(left, right);
        }
        drop(state);

        for message in messages {
            self.post(message);
        }
    }

    /// Drop every node. From now on every event goes to the main thread.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.nodes.clear();
        state.root = None;
        state.latched_node = None;
        state.non_fast_scrollable_region = Region::new();
        state.invalidated = true;

        #[cfg(feature = "tracing")]
        tracing::info!("Scrolling tree invalidated");
    }

    pub fn is_invalidated(&self) -> bool {
        self.state.lock().invalidated
    }

    pub fn main_frame_scroll_position(&self) -> LayoutPoint {
        self.state.lock().main_frame_scroll_position
    }

    pub fn non_fast_scrollable_region(&self) -> Region {
        self.state.lock().non_fast_scrollable_region.clone()
    }

    pub fn root_node_id(&self) -> Option<ScrollingNodeId> {
        self.state.lock().root
    }

    pub fn latched_node(&self) -> Option<ScrollingNodeId> {
        self.state.lock().latched_node
    }

    pub fn node_scroll_position(&self, id: ScrollingNodeId) -> Option<LayoutPoint> {
        self.state
            .lock()
            .nodes
            .get(&id)
            .map(ScrollingTreeNode::scroll_position)
    }

    /// Record a main frame scroll position that the main thread already shows
    pub fn update_main_frame_scroll_position(&self, position: LayoutPoint) {
        let mut state = self.state.lock();
        state.main_frame_scroll_position = position;
        if let Some(root) = state.root {
            if let Some(node) = state.nodes.get_mut(&root) {
                node.set_scroll_position_from_tree(position);
            }
        }
        if let Some((left, right)) = state.root_pin_state() {
            self.set_main_frame_pin_state(left, right);
        }
    }

    /// Move the main frame and its scroll layer, then tell the main thread
    pub fn update_main_frame_scroll_position_and_scroll_layer_position(
        &self,
        position: LayoutPoint,
    ) {
        let mut state = self.state.lock();
        let Some(root) = state.root else {
            return;
        };
        state.main_frame_scroll_position = position;
        let scope = LayerUpdateScope::new(self.layer_sink.as_ref());
        if let Some(node) = state.nodes.get_mut(&root) {
            node.set_scroll_position_from_tree(position);
            node.reposition_scrolling_layers(&scope);
        }
        drop(scope);
        if let Some((left, right)) = state.root_pin_state() {
            self.set_main_frame_pin_state(left, right);
        }
        drop(state);

        self.post(ScrollingTreeMessage::ScrollPositionChanged {
            node_id: root,
            position,
            is_programmatic: false,
            action: ScrollingLayerPositionAction::Sync,
        });
    }

    pub fn update_back_forward_state(&self, can_go_back: bool, can_go_forward: bool) {
        let mut swipe = self.swipe_state.lock();
        swipe.can_go_back = can_go_back;
        swipe.can_go_forward = can_go_forward;
    }

    pub fn set_main_frame_pin_state(&self, pinned_to_left: bool, pinned_to_right: bool) {
        let mut swipe = self.swipe_state.lock();
        swipe.main_frame_pinned_to_left = pinned_to_left;
        swipe.main_frame_pinned_to_right = pinned_to_right;
    }

    /// Whether the main frame may rubber-band past its left/right edge instead of
    /// handing the gesture to a back/forward swipe
    pub fn set_can_rubber_band_state(&self, can_rubber_band_left: bool, can_rubber_band_right: bool) {
        let mut swipe = self.swipe_state.lock();
        swipe.rubber_bands_at_left = can_rubber_band_left;
        swipe.rubber_bands_at_right = can_rubber_band_right;
    }

    /// A horizontal `Began` gesture against a pinned edge with history behind it
    pub fn will_wheel_event_start_swipe_gesture(&self, event: &BlitzWheelEvent) -> bool {
        if event.phase != WheelEventPhase::Began {
            return false;
        }

        let dx = event.delta.x;
        let dy = event.delta.y;
        if dx.abs() <= self.config.swipe_min_horizontal_delta
            || dx.abs() < dy.abs() * self.config.swipe_direction_ratio
        {
            return false;
        }

        let swipe = self.swipe_state.lock();
        if dx > 0.0 {
            swipe.main_frame_pinned_to_left && !swipe.rubber_bands_at_left && swipe.can_go_back
        } else {
            swipe.main_frame_pinned_to_right && !swipe.rubber_bands_at_right && swipe.can_go_forward
        }
    }

    /// Step kinetic animations to `now`. Returns whether any is still running.
    pub fn animate(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        let root = state.root;
        let scope = LayerUpdateScope::new(self.layer_sink.as_ref());

        let mut moved = Vec::new();
        let mut still_animating = false;
        for (id, node) in state.nodes.iter_mut() {
            if !node.is_animating() {
                continue;
            }
            let before = node.scroll_position();
            still_animating |= node.animate(now, &self.config, &scope);
            if node.scroll_position() != before {
                moved.push((*id, node.scroll_position()));
            }
        }
        drop(scope);

        if let Some(position) = moved
            .iter()
            .find(|(id, _)| Some(*id) == root)
            .map(|(_, position)| *position)
        {
            state.main_frame_scroll_position = position;
            if let Some((left, right)) = state.root_pin_state() {
                self.set_main_frame_pin_state(left, right);
            }
        }
        drop(state);

        for (node_id, position) in moved {
            self.post(ScrollingTreeMessage::ScrollPositionChanged {
                node_id,
                position,
                is_programmatic: false,
                action: ScrollingLayerPositionAction::Sync,
            });
        }
        still_animating
    }

    pub fn is_animating(&self) -> bool {
        self.state
            .lock()
            .nodes
            .values()
            .any(ScrollingTreeNode::is_animating)
    }

    /// Deepest node under a viewport point, with its rect, as one consistent read
    pub fn hit_test(&self, point: LayoutPoint) -> Option<(ScrollingNodeId, LayoutRect)> {
        let state = self.state.lock();
        if state.invalidated {
            return None;
        }
        let point = state.document_point(point);
        let id = state.deepest_node_at(point)?;
        let node = state.nodes.get(&id)?;
        Some((id, node.viewport_rect()))
    }

    pub fn scrolling_performance_logging_enabled(&self) -> bool {
        self.scrolling_performance_logging.load(Ordering::Relaxed)
    }

    pub fn set_scrolling_performance_logging_enabled(&self, enabled: bool) {
        self.scrolling_performance_logging
            .store(enabled, Ordering::Relaxed);
    }
}
