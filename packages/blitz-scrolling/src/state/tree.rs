use std::collections::HashMap;

use crate::ScrollingNodeId;
use crate::error::ScrollingError;

use super::node::{ScrollingNodeKind, ScrollingStateNode};

/// Main-thread description of the scrollable area hierarchy
///
/// The live tree is owned by the coordinator. [`commit`](Self::commit) produces an
/// owned snapshot which is moved to the scrolling thread, and resets change tracking
/// on the live tree so the next snapshot only carries what changed after it.
#[derive(Debug, Clone, Default)]
pub struct ScrollingStateTree {
    nodes: HashMap<ScrollingNodeId, ScrollingStateNode>,
    root: Option<ScrollingNodeId>,
    removed_nodes: Vec<ScrollingNodeId>,
    has_new_root_node: bool,
}

impl ScrollingStateTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_id(&self) -> Option<ScrollingNodeId> {
        self.root
    }

    pub fn root_node(&self) -> Option<&ScrollingStateNode> {
        self.root.and_then(|id| self.nodes.get(&id))
    }

    pub fn root_node_mut(&mut self) -> Option<&mut ScrollingStateNode> {
        let id = self.root?;
        self.nodes.get_mut(&id)
    }

    pub fn node(&self, id: ScrollingNodeId) -> Option<&ScrollingStateNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: ScrollingNodeId) -> Option<&mut ScrollingStateNode> {
        self.nodes.get_mut(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Ids detached since the last commit
    pub fn removed_nodes(&self) -> &[ScrollingNodeId] {
        &self.removed_nodes
    }

    /// Whether this tree (or snapshot) replaced its root since the previous commit
    pub fn has_new_root_node(&self) -> bool {
        self.has_new_root_node
    }

    /// Attach `id` under `parent`, or as the root when `parent` is `None`
    ///
    /// Attaching an id that already exists under the same parent is a no-op. An
    /// existing id under a different parent is moved. A new root replaces the whole
    /// tree.
    pub fn attach_node(
        &mut self,
        kind: ScrollingNodeKind,
        id: ScrollingNodeId,
        parent: Option<ScrollingNodeId>,
    ) -> Result<ScrollingNodeId, ScrollingError> {
        if let Some(existing) = self.nodes.get(&id) {
            if existing.parent == parent {
                return Ok(id);
            }
        }

        let Some(parent_id) = parent else {
            if self.root == Some(id) {
                return Ok(id);
            }
            // Everything from the old root is gone with it
            self.removed_nodes.extend(self.nodes.keys().copied());
            self.nodes.clear();
            self.nodes
                .insert(id, ScrollingStateNode::new(kind, id, None));
            self.root = Some(id);
            self.has_new_root_node = true;

            #[cfg(feature = "tracing")]
            tracing::debug!("Scrolling state tree has new root node {id}");

            return Ok(id);
        };

        if !self.nodes.contains_key(&parent_id) {
            return Err(ScrollingError::UnknownParentNode(parent_id));
        }

        if self.nodes.contains_key(&id) {
            self.unlink_from_parent(id);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.parent = Some(parent_id);
            }
        } else {
            self.nodes
                .insert(id, ScrollingStateNode::new(kind, id, Some(parent_id)));
        }

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.push(id);
            parent.mark_children_changed();
        }
        Ok(id)
    }

    /// Remove `id` and its whole subtree. Detaching the root empties the tree.
    pub fn detach_node(&mut self, id: ScrollingNodeId) -> Result<(), ScrollingError> {
        if !self.nodes.contains_key(&id) {
            return Err(ScrollingError::UnknownNode(id));
        }

        self.unlink_from_parent(id);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children.iter().copied());
                self.removed_nodes.push(current);
            }
        }

        if self.root == Some(id) {
            self.root = None;
        }
        Ok(())
    }

    fn unlink_from_parent(&mut self, id: ScrollingNodeId) {
        let parent_id = self.nodes.get(&id).and_then(|node| node.parent);
        if let Some(parent) = parent_id.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            parent.children.retain(|child| *child != id);
            parent.mark_children_changed();
        }
    }

    pub fn has_changed_properties(&self) -> bool {
        self.has_new_root_node
            || !self.removed_nodes.is_empty()
            || self.nodes.values().any(|node| node.has_changed_properties())
    }

    /// Produce the snapshot to hand to the scrolling thread
    ///
    /// The returned tree keeps this tree's change flags and removed ids; this tree
    /// starts tracking afresh.
    pub fn commit(&mut self) -> ScrollingStateTree {
        let snapshot = self.clone();

        for node in self.nodes.values_mut() {
            node.clear_changed_properties();
        }
        self.removed_nodes.clear();
        self.has_new_root_node = false;

        snapshot
    }

    /// Node ids in pre-order, parents before children, siblings in insertion order
    pub fn traverse(&self) -> Vec<ScrollingNodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<ScrollingNodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChangedProperties;
    use blitz_traits::geometry::LayoutPoint;

    fn id(value: u64) -> ScrollingNodeId {
        ScrollingNodeId::new(value).unwrap()
    }

    fn tree_with_children() -> ScrollingStateTree {
        let mut tree = ScrollingStateTree::new();
        tree.attach_node(ScrollingNodeKind::FrameScrolling, id(1), None)
            .unwrap();
        tree.attach_node(ScrollingNodeKind::OverflowScrolling, id(2), Some(id(1)))
            .unwrap();
        tree.attach_node(ScrollingNodeKind::OverflowScrolling, id(3), Some(id(2)))
            .unwrap();
        tree.attach_node(ScrollingNodeKind::OverflowScrolling, id(4), Some(id(1)))
            .unwrap();
        tree
    }

    #[test]
    fn test_attach_builds_preorder() {
        let tree = tree_with_children();
        assert_eq!(tree.traverse(), vec![id(1), id(2), id(3), id(4)]);
        assert!(tree.has_new_root_node());
    }

    #[test]
    fn test_attach_to_unknown_parent_fails() {
        let mut tree = ScrollingStateTree::new();
        let result = tree.attach_node(ScrollingNodeKind::OverflowScrolling, id(2), Some(id(9)));
        assert!(matches!(result, Err(ScrollingError::UnknownParentNode(parent)) if parent == id(9)));
    }

    #[test]
    fn test_detach_removes_subtree() {
        let mut tree = tree_with_children();
        tree.commit();
        tree.detach_node(id(2)).unwrap();
        assert_eq!(tree.traverse(), vec![id(1), id(4)]);
        let mut removed = tree.removed_nodes().to_vec();
        removed.sort();
        assert_eq!(removed, vec![id(2), id(3)]);
        assert!(tree.has_changed_properties());
    }

    #[test]
    fn test_reparenting_moves_node() {
        let mut tree = tree_with_children();
        tree.attach_node(ScrollingNodeKind::OverflowScrolling, id(3), Some(id(4)))
            .unwrap();
        assert_eq!(tree.traverse(), vec![id(1), id(2), id(4), id(3)]);
        assert!(tree.node(id(2)).unwrap().children().is_empty());
    }

    #[test]
    fn test_new_root_replaces_tree() {
        let mut tree = tree_with_children();
        tree.commit();
        tree.attach_node(ScrollingNodeKind::FrameScrolling, id(10), None)
            .unwrap();
        assert_eq!(tree.traverse(), vec![id(10)]);
        assert!(tree.has_new_root_node());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_commit_is_incremental() {
        let mut tree = tree_with_children();
        let first = tree.commit();
        assert!(first.has_new_root_node());
        assert!(!tree.has_changed_properties());

        tree.node_mut(id(3))
            .unwrap()
            .set_scroll_position(LayoutPoint::new(0.0, 25.0));
        let second = tree.commit();
        assert!(!second.has_new_root_node());
        assert_eq!(
            second.node(id(3)).unwrap().changed_properties(),
            ChangedProperties::SCROLL_POSITION
        );
        assert!(!second.node(id(2)).unwrap().has_changed_properties());
        assert!(!tree.has_changed_properties());
    }
}
