//! Container-relative XPaths of the form `/tag[n]/…/text()[k]`.
//!
//! Highlight wrapper elements are transparent: they are skipped when
//! counting element positions, and text nodes inside them count into the
//! text run they sit in. Wrappers are recognized by the [`css::ID_ATTR`]
//! attribute, never by class name, so document content carrying the
//! highlight classes cannot desynchronize indexing.
//!
//! Text-node indexing is logical: adjacent text nodes (as produced by
//! splitting) merge into one `text()` component, matching what the
//! browser would present after normalization.

use crate::css;
use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

/// A point relative to the container: an xpath naming a logical text
/// run, and a byte offset measured from the start of that run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpathDescriptor {
    pub xpath: String,
    pub offset: usize,
}

/// Whether this element is a highlight wrapper.
pub(crate) fn is_wrapper(dom: &Dom, id: NodeId) -> bool {
    dom.attr(id, css::ID_ATTR).is_some()
}

/// Children of `parent` with wrapper elements spliced out and replaced
/// by their own children, recursively.
fn logical_children(dom: &Dom, parent: NodeId, out: &mut Vec<NodeId>) {
    for child in dom.children(parent) {
        if dom.is_element(child) && is_wrapper(dom, child) {
            logical_children(dom, child, out);
        } else {
            out.push(child);
        }
    }
}

/// The nearest ancestor that is not a wrapper.
fn logical_parent(dom: &Dom, node: NodeId) -> Option<NodeId> {
    let mut parent = dom.parent(node)?;
    while dom.is_element(parent) && is_wrapper(dom, parent) {
        parent = dom.parent(parent)?;
    }
    Some(parent)
}

/// Group a logical child list into maximal runs of adjacent text nodes.
fn text_runs(dom: &Dom, children: &[NodeId]) -> Vec<Vec<NodeId>> {
    let mut runs: Vec<Vec<NodeId>> = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    for &child in children {
        if dom.is_text(child) {
            current.push(child);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Compute the xpath of `node` relative to `container`.
///
/// For text nodes the terminal component is `text()` for the first
/// logical run and `text()[k+1]` for run `k > 0`; element components are
/// always indexed 1-based among same-tag logical siblings.
pub fn xpath_of(dom: &Dom, container: NodeId, node: NodeId) -> Result<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut cur = node;

    if dom.is_text(cur) {
        let parent = logical_parent(dom, cur)
            .ok_or_else(|| Error::XpathUnresolved("text node outside container".into()))?;
        let mut children = Vec::new();
        logical_children(dom, parent, &mut children);
        let runs = text_runs(dom, &children);
        let k = runs
            .iter()
            .position(|run| run.contains(&cur))
            .ok_or_else(|| Error::XpathUnresolved("text node not among siblings".into()))?;
        if k == 0 {
            segments.push("text()".to_string());
        } else {
            segments.push(format!("text()[{}]", k + 1));
        }
        cur = parent;
    }

    while cur != container {
        if !dom.is_element(cur) {
            return Err(Error::XpathUnresolved(
                "node not contained in the container".into(),
            ));
        }
        let tag = dom
            .element_name(cur)
            .map(|n| n.as_ref().to_string())
            .ok_or(Error::NotTextNode)?;
        let parent = logical_parent(dom, cur)
            .ok_or_else(|| Error::XpathUnresolved("node outside container".into()))?;
        let mut children = Vec::new();
        logical_children(dom, parent, &mut children);
        let position = children
            .iter()
            .filter(|&&c| {
                dom.is_element(c) && dom.element_name(c).is_some_and(|n| n.as_ref() == tag)
            })
            .position(|&c| c == cur)
            .ok_or_else(|| Error::XpathUnresolved("element not among siblings".into()))?;
        segments.push(format!("{}[{}]", tag, position + 1));
        cur = parent;
    }

    segments.reverse();
    let mut xpath = String::new();
    for segment in &segments {
        xpath.push('/');
        xpath.push_str(segment);
    }
    Ok(xpath)
}

/// Byte offset of `node`'s first character from the start of its logical
/// text run.
pub fn offset_in_run(dom: &Dom, node: NodeId) -> usize {
    let Some(parent) = logical_parent(dom, node) else {
        return 0;
    };
    let mut children = Vec::new();
    logical_children(dom, parent, &mut children);
    let runs = text_runs(dom, &children);
    let Some(run) = runs.iter().find(|run| run.contains(&node)) else {
        return 0;
    };
    run.iter()
        .take_while(|&&n| n != node)
        .map(|&n| dom.text_len(n))
        .sum()
}

enum Segment<'a> {
    Element { tag: &'a str, index: usize },
    Text { index: usize },
}

fn parse_segment<'a>(raw: &'a str, xpath: &'a str) -> Result<Segment<'a>> {
    let (name, index) = match raw.find('[') {
        Some(open) => {
            let close = raw
                .rfind(']')
                .filter(|&c| c > open)
                .ok_or_else(|| Error::XpathSyntax(xpath.to_string()))?;
            let n: usize = raw[open + 1..close]
                .parse()
                .map_err(|_| Error::XpathSyntax(xpath.to_string()))?;
            if n == 0 {
                return Err(Error::XpathSyntax(xpath.to_string()));
            }
            (&raw[..open], n)
        }
        None => (raw, 1),
    };
    if name == "text()" {
        Ok(Segment::Text { index })
    } else if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(Segment::Element { tag: name, index })
    } else {
        Err(Error::XpathSyntax(xpath.to_string()))
    }
}

/// Resolve an xpath back to a node under `container`.
///
/// A terminal `text()[k]` selects the k-th logical text run and yields
/// the run's first non-empty raw text node; callers carrying a
/// run-relative offset step forward from there. Element xpaths yield the
/// element itself.
pub fn element_at(dom: &Dom, container: NodeId, xpath: &str) -> Result<NodeId> {
    let mut cur = container;
    let mut segments = xpath.split('/').filter(|s| !s.is_empty()).peekable();

    while let Some(raw) = segments.next() {
        let terminal = segments.peek().is_none();
        match parse_segment(raw, xpath)? {
            Segment::Element { tag, index } => {
                let mut children = Vec::new();
                logical_children(dom, cur, &mut children);
                cur = children
                    .iter()
                    .filter(|&&c| {
                        dom.is_element(c)
                            && dom.element_name(c).is_some_and(|n| n.as_ref() == tag)
                    })
                    .nth(index - 1)
                    .copied()
                    .ok_or_else(|| Error::XpathUnresolved(xpath.to_string()))?;
            }
            Segment::Text { index } => {
                if !terminal {
                    return Err(Error::XpathSyntax(xpath.to_string()));
                }
                let mut children = Vec::new();
                logical_children(dom, cur, &mut children);
                let runs = text_runs(dom, &children);
                let run = runs
                    .get(index - 1)
                    .ok_or_else(|| Error::XpathUnresolved(xpath.to_string()))?;
                return run
                    .iter()
                    .find(|&&n| dom.text_len(n) > 0)
                    .copied()
                    .ok_or_else(|| Error::XpathUnresolved(xpath.to_string()));
            }
        }
    }
    Ok(cur)
}
