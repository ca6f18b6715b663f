//! Main-thread side of threaded scrolling
//!
//! The coordinator reads layout facts from the page, keeps the scrolling state tree
//! up to date, commits it to the scrolling thread and applies the scroll positions
//! the scrolling thread reports back.

mod fixed_position;
mod strategies;

use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::thread::ThreadId;

use blitz_traits::events::BlitzWheelEvent;
use blitz_traits::geometry::{LayoutPoint, LayoutVector};
use blitz_traits::page::{FrameId, ScrollingPageProvider};
use crossbeam_channel::Receiver;

pub use fixed_position::scroll_offset_for_fixed_position;
pub use strategies::{LayerPositioning, NoopLayerPositioning, NoopScrollbarLayers, ScrollbarLayers};

use crate::error::ScrollingError;
use crate::state::{ScrollingNodeGeometry, ScrollingNodeKind, ScrollingStateTree};
use crate::thread::{ScrollingLayerPositionAction, ScrollingThread, ScrollingTreeMessage};
use crate::tree::{NoopLayerSink, ScrollingEventResult, ScrollingLayerSink, ScrollingTree};
use crate::{
    MainThreadScrollingReasons, Region, ScrollingConfig, ScrollingNodeId,
    ScrollingNodeIdAllocator,
};

/// Public contract of a scrolling coordinator. All methods are main-thread only.
pub trait ScrollingCoordinator {
    /// Only the main frame of a page using accelerated compositing is coordinated
    fn coordinates_scrolling_for_frame_view(&self, frame: FrameId) -> bool;

    /// Union of the areas of `frame` and its descendants that need the main thread
    /// to handle wheel events, offset by `frame_location`
    fn compute_non_fast_scrollable_region(
        &self,
        frame: FrameId,
        frame_location: LayoutVector,
    ) -> Region;

    fn compute_current_wheel_event_handler_count(&self) -> u32;

    fn main_thread_scrolling_reasons(&self) -> MainThreadScrollingReasons;

    fn frame_view_wheel_event_handler_count_changed(&mut self, frame: FrameId);
    fn frame_view_has_slow_repaint_objects_did_change(&mut self, frame: FrameId);
    fn frame_view_fixed_objects_did_change(&mut self, frame: FrameId);
    fn frame_view_root_layer_did_change(&mut self, frame: FrameId);
    fn frame_view_layout_updated(&mut self, frame: FrameId);

    /// Queue a main frame scroll position update for the next flush
    fn schedule_update_main_frame_scroll_position(
        &mut self,
        position: LayoutPoint,
        is_programmatic: bool,
        action: ScrollingLayerPositionAction,
    );

    fn update_main_frame_scroll_position(
        &mut self,
        position: LayoutPoint,
        is_programmatic: bool,
        action: ScrollingLayerPositionAction,
    );

    fn flush_pending_scroll_update(&mut self);

    /// Per-frame sync point: apply scrolling thread updates, then commit
    fn update_rendering(&mut self);

    fn set_force_main_thread_scroll_layer_position_updates(&mut self, force: bool);

    fn unique_scroll_layer_id(&self) -> ScrollingNodeId;

    /// Ask the scrolling thread to scroll `frame` to `position`. Returns whether the
    /// request was accepted.
    fn request_scroll_position_update(&mut self, frame: FrameId, position: LayoutPoint) -> bool;

    /// Route a wheel event to the scrolling thread when possible, to the page
    /// otherwise. Returns whether anyone handled it.
    fn handle_wheel_event(&mut self, event: &BlitzWheelEvent) -> bool;

    fn scrolling_state_tree_as_text(&self) -> String;

    fn page_destroyed(&mut self);
}

/// A main frame scroll position update waiting for the next flush
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingScrollUpdate {
    pub position: LayoutPoint,
    pub is_programmatic: bool,
    pub action: ScrollingLayerPositionAction,
}

impl PendingScrollUpdate {
    fn has_same_mode(&self, is_programmatic: bool, action: ScrollingLayerPositionAction) -> bool {
        self.is_programmatic == is_programmatic && self.action == action
    }
}

/// Optional collaborators for [`AsyncScrollingCoordinator::new`]. Anything left as
/// `None` gets an inert default.
#[derive(Default)]
pub struct CoordinatorProviders {
    pub layer_positioning: Option<Box<dyn LayerPositioning>>,
    pub scrollbar_layers: Option<Box<dyn ScrollbarLayers>>,
    pub layer_sink: Option<Arc<dyn ScrollingLayerSink>>,
    pub id_allocator: Option<Arc<ScrollingNodeIdAllocator>>,
}

fn log_skipped(operation: &str, error: &ScrollingError) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Skipping {operation}: {error}");
    #[cfg(not(feature = "tracing"))]
    let _ = (operation, error);
}

fn collect_non_fast_scrollable_region(
    page: &dyn ScrollingPageProvider,
    frame: FrameId,
    offset: LayoutVector,
    region: &mut Region,
) {
    let Some(facts) = page.frame_view(frame) else {
        return;
    };

    for area in &facts.scrollable_areas {
        if !area.uses_compositor_scrolling {
            region.unite(area.bounding_box.translate(offset));
        }
    }
    for plugin in &facts.plugins {
        if plugin.wants_wheel_events {
            region.unite(plugin.frame_rect.translate(offset));
        }
    }

    for child in page.child_frames(frame) {
        let Some(child_facts) = page.frame_view(child) else {
            continue;
        };
        collect_non_fast_scrollable_region(
            page,
            child,
            offset + child_facts.location_in_parent,
            region,
        );
    }
}

fn count_wheel_event_handlers(page: &dyn ScrollingPageProvider, frame: FrameId) -> u32 {
    let own = page
        .frame_view(frame)
        .map_or(0, |facts| facts.wheel_event_handler_count);
    page.child_frames(frame)
        .into_iter()
        .fold(own, |count, child| {
            count.saturating_add(count_wheel_event_handlers(page, child))
        })
}

/// Coordinator that hands main frame scrolling to a dedicated scrolling thread
pub struct AsyncScrollingCoordinator {
    page: Option<Weak<dyn ScrollingPageProvider>>,
    main_thread: ThreadId,
    config: ScrollingConfig,
    id_allocator: Arc<ScrollingNodeIdAllocator>,

    state_tree: ScrollingStateTree,
    scrolling_tree: Arc<ScrollingTree>,
    scrolling_thread: Option<ScrollingThread>,
    tree_messages: Receiver<ScrollingTreeMessage>,

    layer_positioning: Box<dyn LayerPositioning>,
    scrollbar_layers: Box<dyn ScrollbarLayers>,

    pending_scroll_update: Option<PendingScrollUpdate>,
    force_main_thread_scroll_layer_position_updates: bool,
    last_main_thread_scrolling_reasons: MainThreadScrollingReasons,
}

impl AsyncScrollingCoordinator {
    /// Create the coordinator together with its scrolling tree and thread
    ///
    /// Only a weak handle to `page` is kept: the page owns the coordinator, not the
    /// other way around.
    pub fn new(
        page: &Rc<dyn ScrollingPageProvider>,
        config: ScrollingConfig,
        providers: CoordinatorProviders,
    ) -> Result<Self, ScrollingError> {
        let (sender, tree_messages) = crossbeam_channel::unbounded();
        let layer_sink = providers
            .layer_sink
            .unwrap_or_else(|| Arc::new(NoopLayerSink));
        let scrolling_tree = Arc::new(ScrollingTree::new(config.clone(), layer_sink, sender));
        let scrolling_thread = ScrollingThread::spawn(scrolling_tree.clone())?;

        Ok(Self {
            page: Some(Rc::downgrade(page)),
            main_thread: std::thread::current().id(),
            force_main_thread_scroll_layer_position_updates: config
                .force_main_thread_scroll_layer_position_updates,
            config,
            id_allocator: providers
                .id_allocator
                .unwrap_or_else(ScrollingNodeIdAllocator::global),
            state_tree: ScrollingStateTree::new(),
            scrolling_tree,
            scrolling_thread: Some(scrolling_thread),
            tree_messages,
            layer_positioning: providers
                .layer_positioning
                .unwrap_or_else(|| Box::new(NoopLayerPositioning)),
            scrollbar_layers: providers
                .scrollbar_layers
                .unwrap_or_else(|| Box::new(NoopScrollbarLayers)),
            pending_scroll_update: None,
            last_main_thread_scrolling_reasons: MainThreadScrollingReasons::empty(),
        })
    }

    fn assert_main_thread(&self) {
        debug_assert_eq!(
            std::thread::current().id(),
            self.main_thread,
            "scrolling coordinator used off the main thread"
        );
    }

    fn page(&self) -> Result<Rc<dyn ScrollingPageProvider>, ScrollingError> {
        self.page
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(ScrollingError::PageDetached)
    }

    pub fn config(&self) -> &ScrollingConfig {
        &self.config
    }

    pub fn state_tree(&self) -> &ScrollingStateTree {
        &self.state_tree
    }

    pub fn scrolling_tree(&self) -> &Arc<ScrollingTree> {
        &self.scrolling_tree
    }

    pub fn pending_scroll_update(&self) -> Option<PendingScrollUpdate> {
        self.pending_scroll_update
    }

    pub fn force_main_thread_scroll_layer_position_updates(&self) -> bool {
        self.force_main_thread_scroll_layer_position_updates
    }

    /// Wait until the scrolling thread has processed everything sent so far
    pub fn synchronize_with_scrolling_thread(&self) -> Result<(), ScrollingError> {
        self.scrolling_thread
            .as_ref()
            .ok_or(ScrollingError::ThreadDisconnected)?
            .synchronize()
    }

    /// Add an overflow scrolling area (or any node) to the state tree
    pub fn attach_to_state_tree(
        &mut self,
        kind: ScrollingNodeKind,
        id: ScrollingNodeId,
        parent: Option<ScrollingNodeId>,
    ) -> Result<ScrollingNodeId, ScrollingError> {
        self.assert_main_thread();
        self.state_tree.attach_node(kind, id, parent)
    }

    pub fn detach_from_state_tree(&mut self, id: ScrollingNodeId) -> Result<(), ScrollingError> {
        self.assert_main_thread();
        self.state_tree.detach_node(id)
    }

    pub fn update_overflow_scrolling_node(
        &mut self,
        id: ScrollingNodeId,
        geometry: &ScrollingNodeGeometry,
        non_fast_scrollable_region: Region,
    ) -> Result<(), ScrollingError> {
        self.assert_main_thread();
        let node = self
            .state_tree
            .node_mut(id)
            .ok_or(ScrollingError::UnknownNode(id))?;
        node.update_geometry(geometry);
        node.set_non_fast_scrollable_region(non_fast_scrollable_region);
        Ok(())
    }

    fn update_main_thread_scrolling_reasons(&mut self) {
        let reasons = self.main_thread_scrolling_reasons();
        if let Some(root) = self.state_tree.root_node_mut() {
            root.set_main_thread_scrolling_reasons(reasons);
        }
        if reasons != self.last_main_thread_scrolling_reasons {
            #[cfg(feature = "tracing")]
            tracing::debug!("Main thread scrolling reasons changed to: {reasons}");
            self.last_main_thread_scrolling_reasons = reasons;
        }
    }

    fn update_root_state_node(&mut self, frame: FrameId) -> Result<(), ScrollingError> {
        let page = self.page()?;
        let facts = page
            .frame_view(frame)
            .ok_or(ScrollingError::UnknownFrame(frame))?;
        let region = self.compute_non_fast_scrollable_region(frame, LayoutVector::zero());
        let handler_count = self.compute_current_wheel_event_handler_count();

        let root = self
            .state_tree
            .root_node_mut()
            .ok_or(ScrollingError::NoRootNode)?;
        root.update_geometry(&ScrollingNodeGeometry::from_frame_view(&facts));
        root.set_non_fast_scrollable_region(region);
        root.set_wheel_event_handler_count(handler_count);

        self.update_main_thread_scrolling_reasons();
        Ok(())
    }

    fn create_root_state_node(&mut self, frame: FrameId) -> Result<ScrollingNodeId, ScrollingError> {
        let id = self.id_allocator.allocate();
        self.state_tree
            .attach_node(ScrollingNodeKind::FrameScrolling, id, None)?;
        self.update_root_state_node(frame)?;
        Ok(id)
    }

    fn commit_tree_state_if_needed(&mut self) -> Result<(), ScrollingError> {
        if !self.state_tree.has_changed_properties() {
            return Ok(());
        }
        let thread = self
            .scrolling_thread
            .as_ref()
            .ok_or(ScrollingError::ThreadDisconnected)?;
        let snapshot = self.state_tree.commit();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Committing scrolling state tree with {} nodes",
            snapshot.node_count()
        );

        thread.commit_tree_state(snapshot)
    }

    fn apply_scrolling_tree_message(&mut self, message: ScrollingTreeMessage) {
        match message {
            ScrollingTreeMessage::ScrollPositionChanged {
                node_id,
                position,
                is_programmatic,
                action,
            } => {
                if self.state_tree.root_id() == Some(node_id) {
                    self.schedule_update_main_frame_scroll_position(
                        position,
                        is_programmatic,
                        action,
                    );
                } else if let Some(node) = self.state_tree.node_mut(node_id) {
                    node.sync_scroll_position_from_tree(position);
                }
            }
        }
    }
}

impl ScrollingCoordinator for AsyncScrollingCoordinator {
    fn coordinates_scrolling_for_frame_view(&self, frame: FrameId) -> bool {
        self.assert_main_thread();
        let Ok(page) = self.page() else {
            return false;
        };
        frame == page.main_frame() && page.uses_accelerated_compositing()
    }

    fn compute_non_fast_scrollable_region(
        &self,
        frame: FrameId,
        frame_location: LayoutVector,
    ) -> Region {
        self.assert_main_thread();
        let mut region = Region::new();
        match self.page() {
            Ok(page) => {
                collect_non_fast_scrollable_region(&*page, frame, frame_location, &mut region)
            }
            Err(error) => log_skipped("non-fast scrollable region", &error),
        }
        region
    }

    fn compute_current_wheel_event_handler_count(&self) -> u32 {
        self.assert_main_thread();
        match self.page() {
            Ok(page) => count_wheel_event_handlers(&*page, page.main_frame()),
            Err(_) => 0,
        }
    }

    fn main_thread_scrolling_reasons(&self) -> MainThreadScrollingReasons {
        let mut reasons = MainThreadScrollingReasons::empty();
        if self.force_main_thread_scroll_layer_position_updates {
            reasons |= MainThreadScrollingReasons::FORCED_ON_MAIN_THREAD;
        }

        let Ok(page) = self.page() else {
            return reasons;
        };
        let Some(facts) = page.frame_view(page.main_frame()) else {
            return reasons;
        };

        let supports_fixed_layers = self.layer_positioning.supports_fixed_position_layers();
        if facts.has_slow_repaint_objects {
            reasons |= MainThreadScrollingReasons::HAS_SLOW_REPAINT_OBJECTS;
        }
        if !supports_fixed_layers && facts.has_viewport_constrained_objects {
            reasons |=
                MainThreadScrollingReasons::HAS_VIEWPORT_CONSTRAINED_OBJECTS_WITHOUT_SUPPORTING_FIXED_LAYERS;
        }
        if supports_fixed_layers && facts.has_non_layer_fixed_objects {
            reasons |= MainThreadScrollingReasons::HAS_NON_LAYER_FIXED_OBJECTS;
        }
        if facts.is_image_document {
            reasons |= MainThreadScrollingReasons::IS_IMAGE_DOCUMENT;
        }
        reasons
    }

    fn frame_view_wheel_event_handler_count_changed(&mut self, frame: FrameId) {
        if !self.coordinates_scrolling_for_frame_view(frame) {
            return;
        }
        let count = self.compute_current_wheel_event_handler_count();
        match self.state_tree.root_node_mut() {
            Some(root) => root.set_wheel_event_handler_count(count),
            None => log_skipped("wheel handler count", &ScrollingError::NoRootNode),
        }
        self.update_main_thread_scrolling_reasons();
    }

    fn frame_view_has_slow_repaint_objects_did_change(&mut self, frame: FrameId) {
        if !self.coordinates_scrolling_for_frame_view(frame) {
            return;
        }
        self.update_main_thread_scrolling_reasons();
    }

    fn frame_view_fixed_objects_did_change(&mut self, frame: FrameId) {
        if !self.coordinates_scrolling_for_frame_view(frame) {
            return;
        }
        self.update_main_thread_scrolling_reasons();
    }

    fn frame_view_root_layer_did_change(&mut self, frame: FrameId) {
        if !self.coordinates_scrolling_for_frame_view(frame) {
            return;
        }
        match self.create_root_state_node(frame) {
            #[cfg(feature = "tracing")]
            Ok(id) => tracing::debug!("Frame {frame:?} has scrolling root node {id}"),
            #[cfg(not(feature = "tracing"))]
            Ok(_) => {}
            Err(error) => log_skipped("root layer change", &error),
        }
    }

    fn frame_view_layout_updated(&mut self, frame: FrameId) {
        if !self.coordinates_scrolling_for_frame_view(frame) {
            return;
        }
        if let Err(error) = self.update_root_state_node(frame) {
            log_skipped("layout update", &error);
        }
    }

    fn schedule_update_main_frame_scroll_position(
        &mut self,
        position: LayoutPoint,
        is_programmatic: bool,
        action: ScrollingLayerPositionAction,
    ) {
        self.assert_main_thread();
        if let Some(pending) = self.pending_scroll_update.as_mut() {
            if pending.has_same_mode(is_programmatic, action) {
                pending.position = position;
                return;
            }
            #[cfg(feature = "tracing")]
            tracing::debug!("Scroll update mode changed, flushing pending update");
            self.flush_pending_scroll_update();
        }

        self.pending_scroll_update = Some(PendingScrollUpdate {
            position,
            is_programmatic,
            action,
        });
    }

    fn update_main_frame_scroll_position(
        &mut self,
        position: LayoutPoint,
        is_programmatic: bool,
        action: ScrollingLayerPositionAction,
    ) {
        self.assert_main_thread();
        let page = match self.page() {
            Ok(page) => page,
            Err(error) => return log_skipped("main frame scroll update", &error),
        };
        let frame = page.main_frame();

        let was_programmatic = page.in_programmatic_scroll(frame);
        page.set_in_programmatic_scroll(frame, is_programmatic);
        // The tree may report positions the frame view would clamp away while
        // rubber-banding
        page.set_constrains_scrolling_to_content_edge(frame, false);
        page.notify_scroll_position_changed(frame, position.round());
        page.set_constrains_scrolling_to_content_edge(frame, true);
        page.set_in_programmatic_scroll(frame, was_programmatic);

        let Some(facts) = page.frame_view(frame) else {
            return log_skipped(
                "main frame scroll update",
                &ScrollingError::UnknownFrame(frame),
            );
        };

        let layer_position = (-position.to_vector()).to_point();
        if is_programmatic || action == ScrollingLayerPositionAction::Set {
            self.layer_positioning
                .set_scroll_layer_position(layer_position);
        } else {
            self.layer_positioning
                .sync_scroll_layer_position(layer_position);
            self.layer_positioning
                .reposition_viewport_constrained_layers(
                    fixed_position::fixed_offset_for_frame_view(&facts, position),
                );
        }
        self.scrollbar_layers.update_scrollbar_layers(&facts);

        if let Some(root) = self.state_tree.root_node_mut() {
            root.sync_scroll_position_from_tree(position);
        }
    }

    fn flush_pending_scroll_update(&mut self) {
        if let Some(pending) = self.pending_scroll_update.take() {
            self.update_main_frame_scroll_position(
                pending.position,
                pending.is_programmatic,
                pending.action,
            );
        }
    }

    fn update_rendering(&mut self) {
        self.assert_main_thread();
        let messages: Vec<ScrollingTreeMessage> = self.tree_messages.try_iter().collect();
        for message in messages {
            self.apply_scrolling_tree_message(message);
        }
        self.flush_pending_scroll_update();

        if let Err(error) = self.commit_tree_state_if_needed() {
            log_skipped("scrolling state tree commit", &error);
        }
    }

    fn set_force_main_thread_scroll_layer_position_updates(&mut self, force: bool) {
        if self.force_main_thread_scroll_layer_position_updates == force {
            return;
        }
        self.force_main_thread_scroll_layer_position_updates = force;
        self.update_main_thread_scrolling_reasons();
    }

    fn unique_scroll_layer_id(&self) -> ScrollingNodeId {
        self.id_allocator.allocate()
    }

    fn request_scroll_position_update(&mut self, frame: FrameId, position: LayoutPoint) -> bool {
        if !self.coordinates_scrolling_for_frame_view(frame) {
            return false;
        }
        match self.state_tree.root_node_mut() {
            Some(root) => {
                root.set_requested_scroll_position(position);
                true
            }
            None => false,
        }
    }

    fn handle_wheel_event(&mut self, event: &BlitzWheelEvent) -> bool {
        let page = match self.page() {
            Ok(page) => page,
            Err(error) => {
                log_skipped("wheel event", &error);
                return false;
            }
        };

        if self.coordinates_scrolling_for_frame_view(page.main_frame()) {
            if let Some(thread) = self.scrolling_thread.as_ref() {
                match self.scrolling_tree.try_to_handle_wheel_event(event) {
                    ScrollingEventResult::DidHandleEvent => {
                        if thread.dispatch_wheel_event(event.clone()).is_ok() {
                            return true;
                        }
                    }
                    ScrollingEventResult::DidNotHandleEvent => return false,
                    ScrollingEventResult::SendToMainThread => {}
                }
            }
        }

        page.dispatch_wheel_event(event)
    }

    fn scrolling_state_tree_as_text(&self) -> String {
        self.state_tree.as_text()
    }

    fn page_destroyed(&mut self) {
        self.assert_main_thread();
        self.page = None;
        self.pending_scroll_update = None;
        self.scrolling_tree.invalidate();
        self.scrolling_thread = None;

        #[cfg(feature = "tracing")]
        tracing::info!("Page destroyed, scrolling coordinator detached");
    }
}

impl Drop for AsyncScrollingCoordinator {
    fn drop(&mut self) {
        self.scrolling_tree.invalidate();
    }
}
