//! The scrolling state tree: the main thread's snapshot of scrollable areas

mod node;
mod tree;

pub use node::{ChangedProperties, ScrollingNodeGeometry, ScrollingNodeKind, ScrollingStateNode};
pub use tree::ScrollingStateTree;
