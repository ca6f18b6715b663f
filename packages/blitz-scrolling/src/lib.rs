//! Threaded scrolling for Blitz.
//!
//! Lets a page scroll on a dedicated thread while the main thread is busy with
//! script or layout:
//!
//! - [`AsyncScrollingCoordinator`] lives on the main thread. It decides whether the
//!   main frame can scroll off the main thread, maintains the
//!   [`ScrollingStateTree`] and commits snapshots of it.
//! - [`ScrollingTree`] lives on the scrolling thread. It mirrors the last committed
//!   snapshot, classifies wheel events and scrolls the nodes it can handle.
//!
//! Wheel events the scrolling tree refuses go back through the page's ordinary
//! main-thread event path.

mod config;
mod debug;
mod error;
mod node_id;
mod reasons;
mod region;

pub mod coordinator;
pub mod state;
pub mod thread;
pub mod tree;

pub use config::ScrollingConfig;
pub use coordinator::{
    AsyncScrollingCoordinator, CoordinatorProviders, LayerPositioning, PendingScrollUpdate,
    ScrollbarLayers, ScrollingCoordinator, scroll_offset_for_fixed_position,
};
pub use error::ScrollingError;
pub use node_id::{ScrollingNodeId, ScrollingNodeIdAllocator};
pub use reasons::MainThreadScrollingReasons;
pub use region::Region;
pub use state::{ScrollingNodeKind, ScrollingStateNode, ScrollingStateTree};
pub use thread::{
    ScrollingLayerPositionAction, ScrollingThread, ScrollingThreadMessage, ScrollingTreeMessage,
};
pub use tree::{ScrollingEventResult, ScrollingLayerSink, ScrollingTree};
