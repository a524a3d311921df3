//! Arena-based DOM for HTML documents.
//!
//! All nodes live in a contiguous vector; parent/child/sibling links are
//! indices into it. The arena is mutable: highlighting splits text nodes
//! and wraps them in marker elements, unhighlighting reverses both.

mod tree_sink;

use html5ever::{LocalName, QualName, namespace_url, ns};

pub use tree_sink::parse_document;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    fn option(self) -> Option<NodeId> {
        self.is_some().then_some(self)
    }
}

/// Node type in the arena.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name, attributes, and parsed class list.
    ///
    /// The `class` attribute is split into `classes` at creation time and
    /// is not kept in `attrs`; serialization reassembles it.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        classes: Vec<String>,
    },
    /// Text content.
    Text(String),
    /// Comment.
    Comment(String),
    /// Document type declaration.
    Doctype { name: String },
}

/// HTML attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    parent: NodeId,
    first_child: NodeId,
    last_child: NodeId,
    prev_sibling: NodeId,
    next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Build a `QualName` in the HTML namespace.
pub fn html_name(local: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local))
}

/// Arena-based DOM tree.
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Dom {
    /// Create a new empty DOM with a document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.option())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.option())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.option())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.option())
    }

    /// Create a new element node.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let mut classes = Vec::new();
        let attrs = attrs
            .into_iter()
            .filter(|attr| {
                if attr.name.local.as_ref() == "class" {
                    classes = attr
                        .value
                        .split_whitespace()
                        .map(|s| s.to_string())
                        .collect();
                    false
                } else {
                    true
                }
            })
            .collect();

        self.alloc(Node::new(NodeData::Element {
            name,
            attrs,
            classes,
        }))
    }

    /// Create a new text node.
    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    /// Create a new comment node.
    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    /// Create a doctype node.
    pub fn create_doctype(&mut self, name: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype { name }))
    }

    /// Append a child to a parent node.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if last_child.is_some() {
            if let Some(last_node) = self.get_mut(last_child) {
                last_node.next_sibling = child;
            }
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let parent = self
            .get(sibling)
            .map(|n| n.parent)
            .unwrap_or(NodeId::NONE);
        let prev = self
            .get(sibling)
            .map(|n| n.prev_sibling)
            .unwrap_or(NodeId::NONE);

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Insert a node after a sibling.
    pub fn insert_after(&mut self, sibling: NodeId, new_node: NodeId) {
        match self.next_sibling(sibling) {
            Some(next) => self.insert_before(next, new_node),
            None => {
                let parent = self
                    .get(sibling)
                    .map(|n| n.parent)
                    .unwrap_or(NodeId::NONE);
                self.append(parent, new_node);
            }
        }
    }

    /// Unlink a node from its parent. The node itself stays allocated.
    pub fn detach(&mut self, target: NodeId) {
        let (parent, prev, next) = {
            let node = match self.get(target) {
                Some(n) => n,
                None => return,
            };
            (node.parent, node.prev_sibling, node.next_sibling)
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.first_child = next;
            }
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.last_child = prev;
            }
        }

        if let Some(target_node) = self.get_mut(target) {
            target_node.parent = NodeId::NONE;
            target_node.prev_sibling = NodeId::NONE;
            target_node.next_sibling = NodeId::NONE;
        }
    }

    /// Append text to an existing trailing text node, or create a new one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child) {
            if let NodeData::Text(ref mut existing) = last.data {
                existing.push_str(text);
                return;
            }
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    /// Find the first node matching a predicate (DFS).
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut stack = vec![self.document];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if predicate(node) {
                    return Some(id);
                }
                // Push children in reverse order for left-to-right traversal
                let mut children: Vec<_> = self.children(id).collect();
                children.reverse();
                stack.extend(children);
            }
        }
        None
    }

    /// Find element by tag name (first match).
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|node| {
            if let NodeData::Element { name, .. } = &node.data {
                name.local.as_ref() == tag
            } else {
                false
            }
        })
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl<'a> Iterator for ChildrenIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Node-data accessors.
impl Dom {
    /// Get element's local name (tag).
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    /// Get an attribute value.
    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, value: &str) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { attrs, .. } = &mut node.data
        {
            if let Some(attr) = attrs.iter_mut().find(|a| a.name.local.as_ref() == attr_name) {
                attr.value = value.to_string();
            } else {
                attrs.push(Attribute {
                    name: html_name(attr_name),
                    value: value.to_string(),
                });
            }
        }
    }

    /// Get element's classes.
    pub fn classes(&self, id: NodeId) -> &[String] {
        static EMPTY: &[String] = &[];
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(EMPTY)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { classes, .. } = &mut node.data
        {
            classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Element { classes, .. } = &mut node.data
        {
            classes.retain(|c| c != class);
        }
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Check if node is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Get text content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Current length in bytes of a text node's data.
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, str::len)
    }
}

/// Structural mutation used by highlighting.
impl Dom {
    /// Split a text node at a byte offset, producing a right-hand sibling.
    ///
    /// `at` must lie strictly inside the node on a char boundary. Returns
    /// the id of the new node holding the tail.
    pub fn split_text(&mut self, id: NodeId, at: usize) -> crate::Result<NodeId> {
        let tail = {
            let node = self.get_mut(id).ok_or(crate::Error::NotTextNode)?;
            let NodeData::Text(data) = &mut node.data else {
                return Err(crate::Error::NotTextNode);
            };
            if at == 0 || at >= data.len() || !data.is_char_boundary(at) {
                return Err(crate::Error::OffsetOutOfBounds {
                    offset: at,
                    len: data.len(),
                });
            }
            data.split_off(at)
        };
        let tail_id = self.create_text(tail);
        self.insert_after(id, tail_id);
        Ok(tail_id)
    }

    /// Replace a node with `wrapper`, which adopts it as its only child.
    pub fn wrap_node(&mut self, target: NodeId, wrapper: NodeId) {
        debug_assert!(self.parent(target).is_some());
        self.insert_before(target, wrapper);
        self.detach(target);
        self.append(wrapper, target);
    }

    /// Replace an element with a single text node carrying its
    /// concatenated descendant text. Returns the new text node, or `None`
    /// when the element contained no text.
    pub fn unwrap_into_text(&mut self, id: NodeId) -> Option<NodeId> {
        let mut gathered = String::new();
        for text_id in self.text_nodes(id) {
            if let Some(data) = self.text(text_id) {
                gathered.push_str(data);
            }
        }
        if gathered.is_empty() {
            self.detach(id);
            return None;
        }
        let text_id = self.create_text(gathered);
        self.insert_before(id, text_id);
        self.detach(id);
        Some(text_id)
    }

    /// Merge runs of adjacent text children and drop empty text nodes,
    /// recursively, the way `Node.normalize()` does.
    pub fn normalize(&mut self, root: NodeId) {
        let mut cursor = self.first_child(root);
        while let Some(cur) = cursor {
            let next = self.next_sibling(cur);
            if self.is_text(cur) {
                if self.text_len(cur) == 0 {
                    self.detach(cur);
                    cursor = next;
                    continue;
                }
                // Fold the rest of the text run into this node.
                while let Some(sib) = self.next_sibling(cur) {
                    if !self.is_text(sib) {
                        break;
                    }
                    let data = self.text(sib).unwrap_or_default().to_string();
                    self.detach(sib);
                    if let Some(node) = self.get_mut(cur)
                        && let NodeData::Text(existing) = &mut node.data
                    {
                        existing.push_str(&data);
                    }
                }
                cursor = self.next_sibling(cur);
            } else {
                if self.is_element(cur) {
                    self.normalize(cur);
                }
                cursor = next;
            }
        }
    }
}

/// Document-order traversal.
impl Dom {
    /// The document-order successor of `id`, confined to the subtree
    /// rooted at `root`.
    pub fn following(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        if let Some(first) = self.first_child(id) {
            return Some(first);
        }
        let mut cur = id;
        while cur != root {
            if let Some(next) = self.next_sibling(cur) {
                return Some(next);
            }
            cur = self.parent(cur)?;
        }
        None
    }

    /// The next text node at or after `id` in document order within `root`.
    pub fn next_text_node(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        let mut cur = self.following(id, root)?;
        loop {
            if self.is_text(cur) {
                return Some(cur);
            }
            cur = self.following(cur, root)?;
        }
    }

    /// Iterate over every descendant of `root` in document order.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            dom: self,
            root,
            next: self.first_child(root),
        }
    }

    /// Ids of text nodes under `root`, in document order.
    pub fn text_nodes(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(root).filter(|&id| self.is_text(id))
    }
}

/// Iterator over a subtree's descendants in document order.
pub struct Descendants<'a> {
    dom: &'a Dom,
    root: NodeId,
    next: Option<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.dom.following(id, self.root);
        Some(id)
    }
}

/// HTML serialization.
impl Dom {
    /// Serialize a subtree (the node itself; the document serializes its
    /// children) back to HTML.
    pub fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, &mut out);
        out
    }

    fn serialize_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.data {
            NodeData::Document => {
                for child in self.children(id) {
                    self.serialize_into(child, out);
                }
            }
            NodeData::Doctype { name } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Comment(data) => {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str("-->");
            }
            NodeData::Text(data) => escape_text(data, out),
            NodeData::Element {
                name,
                attrs,
                classes,
            } => {
                let tag = name.local.as_ref();
                out.push('<');
                out.push_str(tag);
                if !classes.is_empty() {
                    out.push_str(" class=\"");
                    escape_attr(&classes.join(" "), out);
                    out.push('"');
                }
                for attr in attrs {
                    out.push(' ');
                    out.push_str(attr.name.local.as_ref());
                    out.push_str("=\"");
                    escape_attr(&attr.value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }
                for child in self.children(id) {
                    self.serialize_into(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_elements() {
        let mut dom = Dom::new();

        let div = dom.create_element(
            html_name("div"),
            vec![Attribute {
                name: html_name("id"),
                value: "main".to_string(),
            }],
        );

        dom.append(dom.document(), div);

        assert_eq!(dom.element_name(div).unwrap().as_ref(), "div");
        assert_eq!(dom.attr(div, "id"), Some("main"));
    }

    #[test]
    fn test_append_children() {
        let mut dom = Dom::new();

        let parent = dom.create_element(html_name("div"), vec![]);
        let child1 = dom.create_element(html_name("p"), vec![]);
        let child2 = dom.create_element(html_name("p"), vec![]);

        dom.append(dom.document(), parent);
        dom.append(parent, child1);
        dom.append(parent, child2);

        let children: Vec<_> = dom.children(parent).collect();
        assert_eq!(children, vec![child1, child2]);
    }

    #[test]
    fn test_split_text() {
        let mut dom = Dom::new();
        let p = dom.create_element(html_name("p"), vec![]);
        dom.append(dom.document(), p);
        let text = dom.create_text("Hello, World!".to_string());
        dom.append(p, text);

        let tail = dom.split_text(text, 5).unwrap();
        assert_eq!(dom.text(text), Some("Hello"));
        assert_eq!(dom.text(tail), Some(", World!"));
        assert_eq!(dom.next_sibling(text), Some(tail));

        assert!(dom.split_text(text, 0).is_err());
        assert!(dom.split_text(text, 5).is_err());
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let mut dom = Dom::new();
        let p = dom.create_element(html_name("p"), vec![]);
        dom.append(dom.document(), p);
        let text = dom.create_text("marked".to_string());
        dom.append(p, text);

        let span = dom.create_element(html_name("span"), vec![]);
        dom.wrap_node(text, span);
        assert_eq!(dom.parent(text), Some(span));
        assert_eq!(dom.parent(span), Some(p));

        let restored = dom.unwrap_into_text(span).unwrap();
        assert_eq!(dom.text(restored), Some("marked"));
        assert_eq!(dom.parent(restored), Some(p));
    }

    #[test]
    fn test_normalize_merges_runs() {
        let mut dom = Dom::new();
        let p = dom.create_element(html_name("p"), vec![]);
        dom.append(dom.document(), p);
        for part in ["one ", "two ", "", "three"] {
            let t = dom.create_text(part.to_string());
            dom.append(p, t);
        }

        dom.normalize(p);

        let children: Vec<_> = dom.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(dom.text(children[0]), Some("one two three"));
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut dom = Dom::new();
        let p = dom.create_element(html_name("p"), vec![]);
        dom.append(dom.document(), p);
        dom.add_class(p, "lede");
        let text = dom.create_text("a < b & c".to_string());
        dom.append(p, text);

        assert_eq!(
            dom.serialize(p),
            "<p class=\"lede\">a &lt; b &amp; c</p>"
        );
    }
}
