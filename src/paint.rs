//! Realizing highlights in the DOM: wrapping a range's text in marker
//! elements and taking those markers back out.
//!
//! Wrapping splits text nodes at the range boundaries, then wraps every
//! text node the range crosses in its own `span`. All spans of one
//! highlight share a numeric id carried in the [`css::ID_ATTR`]
//! attribute; unwrapping finds them by that id, folds each back into a
//! text node, and re-merges the split siblings.

use log::debug;

use crate::content::TextContent;
use crate::css;
use crate::dom::{Dom, NodeId, html_name};
use crate::range::{Range, char_len_at};
use crate::{Error, Result};

/// The class/id bundle stamped onto every wrapper of one highlight.
#[derive(Debug, Clone)]
pub struct HighlightStyle {
    /// Unique highlight id, shared by all wrappers of the highlight.
    pub id: u32,
    /// Rotating group id selecting the CSS variant class.
    pub id_highlight: u32,
    /// Per-query class, when enabled in the options.
    pub query_class: Option<String>,
    /// Whether the owning query set is currently enabled.
    pub enabled: bool,
}

/// Resolve a position against the current DOM. Markers keep pointing at
/// the head piece after a split, so when the recorded offset no longer
/// fits the node, walk forward through the following text nodes until it
/// does. The flat projection is unchanged by splits, which keeps the
/// arithmetic exact.
fn resolve_position(
    dom: &Dom,
    container: NodeId,
    mut node: NodeId,
    mut offset: usize,
) -> Result<(NodeId, usize)> {
    loop {
        let len = dom.text_len(node);
        if offset < len {
            return Ok((node, offset));
        }
        offset -= len;
        node = dom
            .next_text_node(node, container)
            .ok_or(Error::OffsetOutOfBounds { offset, len })?;
    }
}

/// Wrap the text spanned by `range` in marker elements. Returns the
/// number of wrappers created (one per text node crossed).
pub fn paint_range(
    dom: &mut Dom,
    content: &TextContent,
    container: NodeId,
    range: &Range,
    style: &HighlightStyle,
) -> Result<usize> {
    let (mut start_node, start_offset) = resolve_position(
        dom,
        container,
        content.at(range.start.marker).node,
        range.start.offset,
    )?;
    let (mut end_node, end_offset) = resolve_position(
        dom,
        container,
        content.at(range.end.marker).node,
        range.end.offset,
    )?;

    // Split the end first so a same-node start split cannot shift it.
    let data = dom.text(end_node).ok_or(Error::NotTextNode)?;
    let cut = end_offset + char_len_at(data, end_offset);
    if cut < data.len() {
        dom.split_text(end_node, cut)?;
    }
    if start_offset > 0 {
        let tail = dom.split_text(start_node, start_offset)?;
        if end_node == start_node {
            end_node = tail;
        }
        start_node = tail;
    }

    // Collect before mutating; wrapping reparents the nodes themselves.
    let mut nodes = vec![start_node];
    let mut cur = start_node;
    while cur != end_node {
        cur = dom
            .next_text_node(cur, container)
            .ok_or(Error::InvertedRange)?;
        nodes.push(cur);
    }

    let mut wrapped = 0;
    for node in nodes {
        if dom.text_len(node) == 0 {
            continue;
        }
        let span = dom.create_element(html_name("span"), vec![]);
        dom.add_class(span, css::HIGHLIGHT);
        dom.add_class(span, &css::group_class(style.id_highlight));
        if let Some(class) = &style.query_class {
            dom.add_class(span, class);
        }
        if !style.enabled {
            dom.add_class(span, css::DISABLED);
        }
        dom.set_attr(span, css::ID_ATTR, &style.id.to_string());
        dom.wrap_node(node, span);
        wrapped += 1;
    }
    debug!("highlight {} painted across {wrapped} wrapper(s)", style.id);
    Ok(wrapped)
}

/// Every wrapper element under `container` carrying highlight id `id`,
/// in document order.
pub fn wrapper_elements(dom: &Dom, container: NodeId, id: u32) -> Vec<NodeId> {
    let needle = id.to_string();
    dom.descendants(container)
        .filter(|&n| dom.attr(n, css::ID_ATTR) == Some(needle.as_str()))
        .collect()
}

/// Remove every wrapper of highlight `id`, folding each back into a text
/// node and re-merging split siblings. Safe to call for ids that do not
/// exist. Returns the number of wrappers removed.
pub fn clear_highlight(dom: &mut Dom, container: NodeId, id: u32) -> usize {
    let wrappers = wrapper_elements(dom, container, id);
    let count = wrappers.len();
    for wrapper in wrappers {
        let parent = dom.parent(wrapper);
        dom.unwrap_into_text(wrapper);
        if let Some(parent) = parent {
            dom.normalize(parent);
        }
    }
    count
}

/// Toggle the disabled class on every wrapper whose id falls in `ids`.
pub fn set_highlights_enabled(
    dom: &mut Dom,
    container: NodeId,
    ids: std::ops::Range<u32>,
    enabled: bool,
) {
    let targets: Vec<NodeId> = dom
        .descendants(container)
        .filter(|&n| {
            dom.attr(n, css::ID_ATTR)
                .and_then(|v| v.parse::<u32>().ok())
                .is_some_and(|id| ids.contains(&id))
        })
        .collect();
    for node in targets {
        if enabled {
            dom.remove_class(node, css::DISABLED);
        } else {
            dom.add_class(node, css::DISABLED);
        }
    }
}
