// Text dumps for logging and tests. The format is not stable.

use std::fmt::Write;

use crate::ScrollingNodeId;
use crate::state::ScrollingStateTree;
use crate::tree::ScrollingTree;

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

impl ScrollingStateTree {
    pub fn as_text(&self) -> String {
        let mut out = String::from("(scrolling state tree");
        if self.has_new_root_node() {
            out.push_str(" new-root");
        }
        out.push('\n');

        let Some(root) = self.root_id() else {
            out.push_str(")\n");
            return out;
        };
        self.write_node(&mut out, root, 1);

        if !self.removed_nodes().is_empty() {
            let removed: Vec<String> = self.removed_nodes().iter().map(|id| id.to_string()).collect();
            let _ = writeln!(out, "  (removed {})", removed.join(" "));
        }
        out.push_str(")\n");
        out
    }

    fn write_node(&self, out: &mut String, id: ScrollingNodeId, depth: usize) {
        let Some(node) = self.node(id) else {
            return;
        };

        indent(out, depth);
        let _ = writeln!(out, "({:?} {}", node.kind(), id);
        indent(out, depth + 1);
        let _ = writeln!(
            out,
            "(viewport {:?}) (content {:?}) (scroll position {:?})",
            node.viewport_rect(),
            node.content_size(),
            node.scroll_position()
        );
        if node.wheel_event_handler_count() > 0 {
            indent(out, depth + 1);
            let _ = writeln!(out, "(wheel handlers {})", node.wheel_event_handler_count());
        }
        if !node.non_fast_scrollable_region().is_empty() {
            indent(out, depth + 1);
            let _ = writeln!(out, "(non-fast region {:?})", node.non_fast_scrollable_region().rects());
        }
        if !node.main_thread_scrolling_reasons().is_empty() {
            indent(out, depth + 1);
            let _ = writeln!(out, "(main thread reasons {})", node.main_thread_scrolling_reasons());
        }
        if let Some(requested) = node.requested_scroll_position() {
            indent(out, depth + 1);
            let _ = writeln!(out, "(requested scroll position {requested:?})");
        }
        if node.has_changed_properties() {
            indent(out, depth + 1);
            let _ = writeln!(out, "(changed {:?})", node.changed_properties());
        }

        for child in node.children() {
            self.write_node(out, *child, depth + 1);
        }
        indent(out, depth);
        out.push_str(")\n");
    }
}

impl ScrollingTree {
    pub fn scrolling_tree_as_text(&self) -> String {
        let state = self.state.lock();
        let mut out = String::from("(scrolling tree");
        if state.invalidated {
            out.push_str(" invalidated");
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "  (main frame scroll position {:?})",
            state.main_frame_scroll_position
        );
        if !state.main_thread_scrolling_reasons.is_empty() {
            let _ = writeln!(out, "  (main thread reasons {})", state.main_thread_scrolling_reasons);
        }
        if let Some(latched) = state.latched_node {
            let _ = writeln!(out, "  (latched node {latched})");
        }

        let mut stack: Vec<(ScrollingNodeId, usize)> =
            state.root.into_iter().map(|id| (id, 1)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = state.nodes.get(&id) else {
                continue;
            };
            indent(&mut out, depth);
            let _ = writeln!(
                out,
                "({:?} {} (viewport {:?}) (scroll position {:?}){})",
                node.kind(),
                id,
                node.viewport_rect(),
                node.scroll_position(),
                if node.is_animating() { " animating" } else { "" }
            );
            stack.extend(node.children().iter().rev().map(|child| (*child, depth + 1)));
        }
        out.push_str(")\n");
        out
    }
}
