//! Flat text projection of a container subtree.
//!
//! Every non-empty text node under the container gets a marker recording
//! the cumulative byte offset of the text that precedes it in document
//! order. The concatenation of the raw node data, whitespace and all, is
//! the string that finders scan and that absolute offsets index into.

use std::collections::HashMap;

use crate::dom::{Dom, NodeId};

/// Pins one text node onto the flat projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMarker {
    /// The text node.
    pub node: NodeId,
    /// Byte offset of this node's first character in the projection.
    pub offset: usize,
}

/// The flat projection: markers in document order plus the full text.
#[derive(Debug, Default)]
pub struct TextContent {
    markers: Vec<TextMarker>,
    text: String,
    by_node: HashMap<NodeId, usize>,
}

impl TextContent {
    /// Walk the container subtree in document order, recording a marker
    /// per non-empty text node. Whitespace is preserved verbatim.
    pub fn build(dom: &Dom, container: NodeId) -> Self {
        let mut content = Self::default();
        for node in dom.text_nodes(container) {
            let data = dom.text(node).unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            content.by_node.insert(node, content.markers.len());
            content.markers.push(TextMarker {
                node,
                offset: content.text.len(),
            });
            content.text.push_str(data);
        }
        content.assert_invariants(dom);
        content
    }

    /// The full flat string.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Marker at `index`. Panics on out-of-range, like slice indexing.
    pub fn at(&self, index: usize) -> &TextMarker {
        &self.markers[index]
    }

    /// Index of the marker owning `node`, if the node is part of the
    /// projection.
    pub fn find(&self, node: NodeId) -> Option<usize> {
        self.by_node.get(&node).copied()
    }

    /// Index of the marker containing the absolute byte offset `abs`:
    /// the last marker whose offset is `<= abs`. `None` when the offset
    /// lies past the end of the projection.
    pub fn marker_at_offset(&self, abs: usize) -> Option<usize> {
        if abs >= self.text.len() {
            return None;
        }
        let idx = self.markers.partition_point(|m| m.offset <= abs);
        idx.checked_sub(1)
    }

    /// Build-time byte length of the marker's node, derived from the
    /// neighbouring offsets so it stays meaningful after the node itself
    /// has been split.
    pub fn marker_len(&self, index: usize) -> usize {
        let end = self
            .markers
            .get(index + 1)
            .map_or(self.text.len(), |m| m.offset);
        end - self.markers[index].offset
    }

    /// Debug invariant check: offsets strictly increase by node length
    /// and the projection length matches the final marker.
    pub fn assert_invariants(&self, dom: &Dom) {
        if cfg!(debug_assertions) {
            let mut expected = 0;
            for marker in &self.markers {
                assert_eq!(marker.offset, expected, "marker offsets must be cumulative");
                let len = dom.text_len(marker.node);
                assert!(len > 0, "empty text nodes must be skipped");
                expected += len;
            }
            assert_eq!(self.text.len(), expected, "projection length mismatch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;

    fn build(html: &str) -> (Dom, TextContent) {
        let dom = parse_document(html);
        let body = dom.find_by_tag("body").unwrap();
        let content = TextContent::build(&dom, body);
        (dom, content)
    }

    #[test]
    fn projection_concatenates_raw_text() {
        let (_, content) = build("<p>one <b>two</b> three</p>");
        assert_eq!(content.text(), "one two three");
        assert_eq!(content.len(), 3);
        assert_eq!(content.at(0).offset, 0);
        assert_eq!(content.at(1).offset, 4);
        assert_eq!(content.at(2).offset, 7);
    }

    #[test]
    fn whitespace_preserved_verbatim() {
        let (_, content) = build("<p>a\n  b</p><p>c</p>");
        assert_eq!(content.text(), "a\n  bc");
    }

    #[test]
    fn find_by_node() {
        let (dom, content) = build("<p>left<b>mid</b>right</p>");
        let b = dom.find_by_tag("b").unwrap();
        let mid = dom.first_child(b).unwrap();
        assert_eq!(content.find(mid), Some(1));

        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(content.find(p), None);
    }

    #[test]
    fn marker_at_offset_binary_search() {
        let (_, content) = build("<p>one <b>two</b> three</p>");
        assert_eq!(content.marker_at_offset(0), Some(0));
        assert_eq!(content.marker_at_offset(3), Some(0));
        assert_eq!(content.marker_at_offset(4), Some(1));
        assert_eq!(content.marker_at_offset(6), Some(1));
        assert_eq!(content.marker_at_offset(7), Some(2));
        assert_eq!(content.marker_at_offset(12), Some(2));
        assert_eq!(content.marker_at_offset(13), None);
    }

    #[test]
    fn marker_len_from_offsets() {
        let (_, content) = build("<p>one <b>two</b> three</p>");
        assert_eq!(content.marker_len(0), 4);
        assert_eq!(content.marker_len(1), 3);
        assert_eq!(content.marker_len(2), 6);
    }
}
