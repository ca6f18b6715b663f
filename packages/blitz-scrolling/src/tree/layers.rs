use std::cell::RefCell;
use std::collections::HashMap;

use blitz_traits::geometry::LayoutVector;

use crate::ScrollingNodeId;

/// Where the scrolling thread pushes scroll offsets for the compositor
pub trait ScrollingLayerSink: Send + Sync {
    fn begin_layer_update(&self) {}

    /// Offset of the scrolled contents layer of `node`, i.e. minus its scroll position
    fn set_scroll_offset(&self, node: ScrollingNodeId, offset: LayoutVector);

    fn commit_layer_update(&self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLayerSink;

impl ScrollingLayerSink for NoopLayerSink {
    fn set_scroll_offset(&self, _node: ScrollingNodeId, _offset: LayoutVector) {}
}

/// Batches the layer changes of one tree update into a single compositor commit
///
/// Offsets are collected while the scope lives and flushed to the sink when it is
/// dropped. A node touched more than once only reports its last offset.
pub struct LayerUpdateScope<'a> {
    sink: &'a dyn ScrollingLayerSink,
    offsets: RefCell<Vec<(ScrollingNodeId, LayoutVector)>>,
    // Position of each node in `offsets`, which keeps first-touch order
    index: RefCell<HashMap<ScrollingNodeId, usize>>,
}

impl<'a> LayerUpdateScope<'a> {
    pub fn new(sink: &'a dyn ScrollingLayerSink) -> Self {
        Self {
            sink,
            offsets: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
        }
    }

    pub fn set_scroll_offset(&self, node: ScrollingNodeId, offset: LayoutVector) {
        let mut offsets = self.offsets.borrow_mut();
        let mut index = self.index.borrow_mut();
        match index.get(&node) {
            Some(&slot) => offsets[slot].1 = offset,
            None => {
                index.insert(node, offsets.len());
                offsets.push((node, offset));
            }
        }
    }
}

impl Drop for LayerUpdateScope<'_> {
    fn drop(&mut self) {
        let offsets = self.offsets.get_mut();
        if offsets.is_empty() {
            return;
        }
        self.sink.begin_layer_update();
        for (node, offset) in offsets.drain(..) {
            self.sink.set_scroll_offset(node, offset);
        }
        self.sink.commit_layer_update();
    }
}
