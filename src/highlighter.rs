//! The query-set registry and its transaction queue.
//!
//! Public operations enqueue commands; [`HtmlHighlighter::apply`] drains
//! the queue in order, logging and skipping individual failures so one
//! bad action cannot block the rest of a batch. Between commands all
//! effects of the previous command are fully committed, so later actions
//! observe earlier ones.

use std::mem;

use log::warn;

use crate::content::TextContent;
use crate::cursor::Cursor;
use crate::css;
use crate::dom::{Dom, NodeId, parse_document};
use crate::finder::{Finder, Subject};
use crate::paint::{self, HighlightStyle};
use crate::range::Range;
use crate::{Error, Result};

/// Construction options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Upper bound on `id_highlight` cycling; at least 1.
    pub max_highlight: u32,
    /// Stamp a per-query class on wrappers.
    pub use_query_as_class: bool,
    /// Normalize the container and rebuild the projection on `remove`.
    pub normalise: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_highlight: 8,
            use_query_as_class: false,
            normalise: true,
        }
    }
}

/// A named bundle of queries whose highlights share a visual group and a
/// contiguous id range `[id, id + length)`.
#[derive(Debug, Clone)]
pub struct QuerySet {
    pub name: String,
    pub enabled: bool,
    /// Rotating CSS group id.
    pub id_highlight: u32,
    /// First highlight id owned by this set.
    pub id: u32,
    /// Current highlight count.
    pub length: u32,
    /// Cap on highlights, reserving id space for later appends.
    pub reserve: Option<u32>,
}

/// One entry of the globally sorted highlight list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightMark {
    /// Name of the owning query set.
    pub query: String,
    /// Ordinal within the set.
    pub index: u32,
    /// Absolute byte offset of the highlight's first character.
    pub offset: usize,
}

/// Registry-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Number of query sets.
    pub queries: u32,
    /// Enabled highlights across all sets.
    pub total: u32,
    /// Next `id_highlight` to assign.
    pub highlight: u32,
}

/// Snapshot of the highlight under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPosition {
    pub query: String,
    pub index: u32,
    pub offset: usize,
    pub id: u32,
}

/// A host text selection: anchor and focus, each a text node plus a byte
/// offset into it. Focus may precede anchor (right-to-left selection).
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub anchor_node: NodeId,
    pub anchor_offset: usize,
    pub focus_node: NodeId,
    pub focus_offset: usize,
}

enum Command {
    Add {
        name: String,
        queries: Vec<Subject>,
        enabled: bool,
        reserve: Option<u32>,
    },
    Append {
        name: String,
        queries: Vec<Subject>,
    },
    Remove {
        name: String,
    },
    Enable {
        name: String,
    },
    Disable {
        name: String,
    },
    Clear {
        reset: bool,
    },
}

/// Registry of query sets over one document.
///
/// Owns the DOM, the flat projection, the sorted highlight list, and the
/// cursor. Finders and ranges are transient views over the projection.
pub struct HtmlHighlighter {
    dom: Dom,
    container: NodeId,
    content: TextContent,
    options: Options,
    queue: Vec<Command>,
    sets: Vec<QuerySet>,
    marks: Vec<HighlightMark>,
    cursor: Cursor,
    last_id: u32,
    next_group: u32,
}

impl HtmlHighlighter {
    /// Parse a document and highlight within its `<body>`.
    pub fn from_html(html: &str, options: Options) -> Result<Self> {
        Self::new(parse_document(html), options)
    }

    /// Highlight within the document's `<body>`.
    pub fn new(dom: Dom, options: Options) -> Result<Self> {
        let container = dom.find_by_tag("body").ok_or(Error::MissingContainer)?;
        Self::with_container(dom, container, options)
    }

    /// Highlight within an explicit container element.
    pub fn with_container(dom: Dom, container: NodeId, mut options: Options) -> Result<Self> {
        if !dom.is_element(container) {
            return Err(Error::MissingContainer);
        }
        options.max_highlight = options.max_highlight.max(1);
        let content = TextContent::build(&dom, container);
        Ok(Self {
            dom,
            container,
            content,
            options,
            queue: Vec::new(),
            sets: Vec::new(),
            marks: Vec::new(),
            cursor: Cursor::default(),
            last_id: 0,
            next_group: 0,
        })
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn content(&self) -> &TextContent {
        &self.content
    }

    /// Serialize the owned document, wrappers included.
    pub fn to_html(&self) -> String {
        self.dom.serialize(self.dom.document())
    }

    /// Enqueue creation of a query set. An existing set with the same
    /// name is removed first when the command runs.
    pub fn add(&mut self, name: &str, queries: Vec<Subject>, enabled: bool, reserve: Option<u32>) {
        self.queue.push(Command::Add {
            name: name.to_string(),
            queries,
            enabled,
            reserve,
        });
    }

    /// Enqueue appending queries to an existing set.
    pub fn append(&mut self, name: &str, queries: Vec<Subject>) {
        self.queue.push(Command::Append {
            name: name.to_string(),
            queries,
        });
    }

    /// Enqueue removal of a query set.
    pub fn remove(&mut self, name: &str) {
        self.queue.push(Command::Remove {
            name: name.to_string(),
        });
    }

    /// Enqueue enabling a query set.
    pub fn enable(&mut self, name: &str) {
        self.queue.push(Command::Enable {
            name: name.to_string(),
        });
    }

    /// Enqueue disabling a query set.
    pub fn disable(&mut self, name: &str) {
        self.queue.push(Command::Disable {
            name: name.to_string(),
        });
    }

    /// Enqueue removal of every query set. `reset` also rewinds id and
    /// group allocation.
    pub fn clear(&mut self, reset: bool) {
        self.queue.push(Command::Clear { reset });
    }

    /// Drain the queue in enqueue order. Each command's failure is
    /// logged and skipped; later commands still run.
    pub fn apply(&mut self) {
        let queue = mem::take(&mut self.queue);
        for command in queue {
            if let Err(e) = self.execute(command) {
                warn!("transaction step failed: {e}");
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Add {
                name,
                queries,
                enabled,
                reserve,
            } => self.do_add(name, &queries, enabled, reserve),
            Command::Append { name, queries } => self.do_append(&name, &queries),
            Command::Remove { name } => self.do_remove(&name),
            Command::Enable { name } => self.do_set_enabled(&name, true),
            Command::Disable { name } => self.do_set_enabled(&name, false),
            Command::Clear { reset } => self.do_clear(reset),
        }
    }

    /// Rebuild the flat projection from the current DOM. Required after
    /// any document mutation the highlighter did not perform itself.
    pub fn refresh(&mut self) {
        self.content = TextContent::build(&self.dom, self.container);
        self.refresh_cursor();
    }

    fn do_add(
        &mut self,
        name: String,
        queries: &[Subject],
        enabled: bool,
        reserve: Option<u32>,
    ) -> Result<()> {
        if queries.is_empty() {
            return Err(Error::EmptyQueries);
        }
        if self.sets.iter().any(|s| s.name == name) {
            self.do_remove(&name)?;
        }

        let id = self.last_id;
        let id_highlight = self.next_group;
        let count = self.run_queries(&name, queries, id, id_highlight, enabled, reserve, 0);

        self.last_id = id + reserve.unwrap_or(count).max(count);
        self.next_group = (id_highlight + 1) % self.options.max_highlight;
        self.sets.push(QuerySet {
            name,
            enabled,
            id_highlight,
            id,
            length: count,
            reserve,
        });
        self.refresh_cursor();
        Ok(())
    }

    fn do_append(&mut self, name: &str, queries: &[Subject]) -> Result<()> {
        if queries.is_empty() {
            return Err(Error::EmptyQueries);
        }
        let pos = self
            .sets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::QuerySetNotFound(name.to_string()))?;
        let (id, id_highlight, enabled, reserve, length) = {
            let set = &self.sets[pos];
            (set.id, set.id_highlight, set.enabled, set.reserve, set.length)
        };
        if let Some(cap) = reserve
            && length >= cap
        {
            return Err(Error::ReserveTooSmall {
                name: name.to_string(),
                reserve: cap,
            });
        }

        let count = self.run_queries(name, queries, id, id_highlight, enabled, reserve, length);

        self.sets[pos].length = length + count;
        self.refresh_cursor();
        Ok(())
    }

    /// Stream every hit of `queries`, painting and recording each one.
    /// Highlight ids and ordinals continue from `base`; `reserve` caps
    /// the set's total length. Returns the number of new highlights.
    #[allow(clippy::too_many_arguments)]
    fn run_queries(
        &mut self,
        name: &str,
        queries: &[Subject],
        id: u32,
        id_highlight: u32,
        enabled: bool,
        reserve: Option<u32>,
        base: u32,
    ) -> u32 {
        let mut count = 0u32;
        let mut suppressed = 0u32;
        for subject in queries {
            let finder = match Finder::new(&self.dom, self.container, &self.content, subject) {
                Ok(finder) => finder,
                Err(e) => {
                    warn!("skipping {}: {e}", subject.describe());
                    continue;
                }
            };
            let hits: Vec<Range> = finder.collect();
            for range in hits {
                let ordinal = base + count;
                if let Some(cap) = reserve
                    && ordinal >= cap
                {
                    suppressed += 1;
                    continue;
                }
                let offset = range.start.absolute(&self.content);
                let style = HighlightStyle {
                    id: id + ordinal,
                    id_highlight,
                    query_class: self
                        .options
                        .use_query_as_class
                        .then(|| css::query_class(name)),
                    enabled,
                };
                match paint::paint_range(
                    &mut self.dom,
                    &self.content,
                    self.container,
                    &range,
                    &style,
                ) {
                    Ok(_) => {
                        let at = self.marks.partition_point(|m| m.offset <= offset);
                        self.marks.insert(
                            at,
                            HighlightMark {
                                query: name.to_string(),
                                index: ordinal,
                                offset,
                            },
                        );
                        count += 1;
                    }
                    Err(e) => warn!("failed to highlight a hit of {}: {e}", subject.describe()),
                }
            }
        }
        if suppressed > 0 {
            warn!("query set {name:?}: reserve reached, {suppressed} hit(s) dropped");
        }
        count
    }

    fn do_remove(&mut self, name: &str) -> Result<()> {
        let pos = self
            .sets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::QuerySetNotFound(name.to_string()))?;
        let set = self.sets.remove(pos);

        for id in set.id..set.id + set.length {
            paint::clear_highlight(&mut self.dom, self.container, id);
        }
        self.marks.retain(|m| m.query != set.name);

        if self.options.normalise {
            self.dom.normalize(self.container);
            // Outstanding ranges over the old projection are now stale.
            self.content = TextContent::build(&self.dom, self.container);
        }
        self.refresh_cursor();
        Ok(())
    }

    fn do_set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let (id, length) = {
            let set = self
                .sets
                .iter_mut()
                .find(|s| s.name == name)
                .ok_or_else(|| Error::QuerySetNotFound(name.to_string()))?;
            if set.enabled == enabled {
                return Ok(());
            }
            set.enabled = enabled;
            (set.id, set.length)
        };
        paint::set_highlights_enabled(&mut self.dom, self.container, id..id + length, enabled);
        self.refresh_cursor();
        Ok(())
    }

    fn do_clear(&mut self, reset: bool) -> Result<()> {
        let names: Vec<String> = self.sets.iter().map(|s| s.name.clone()).collect();
        for name in names {
            self.do_remove(&name)?;
        }
        debug_assert!(self.sets.is_empty(), "registry must drain on clear");
        debug_assert!(self.marks.is_empty(), "marks must drain on clear");
        if reset {
            self.last_id = 0;
            self.next_group = 0;
        }
        Ok(())
    }

    /// Registry-wide counters.
    pub fn stats(&self) -> Stats {
        Stats {
            queries: self.sets.len() as u32,
            total: self
                .sets
                .iter()
                .filter(|s| s.enabled)
                .map(|s| s.length)
                .sum(),
            highlight: self.next_group,
        }
    }

    /// Whether no highlights exist.
    pub fn empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// One past the highest highlight id owned by the set; where an
    /// append would continue.
    pub fn last_id_of(&self, name: &str) -> Result<u32> {
        let set = self
            .sets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::QuerySetNotFound(name.to_string()))?;
        Ok(set.id + set.length)
    }

    pub fn query_set(&self, name: &str) -> Option<&QuerySet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn query_sets(&self) -> &[QuerySet] {
        &self.sets
    }

    /// The globally sorted highlight list.
    pub fn marks(&self) -> &[HighlightMark] {
        &self.marks
    }

    fn is_visible(&self, query: &str) -> bool {
        self.cursor.allows(query)
            && self
                .sets
                .iter()
                .any(|s| s.name == query && s.enabled)
    }

    fn refresh_cursor(&mut self) {
        let total = self
            .marks
            .iter()
            .filter(|m| self.is_visible(&m.query))
            .count();
        self.cursor.clear(total);
    }

    /// Restrict cursor iteration to the named sets, or lift the
    /// restriction. Resets the cursor position.
    pub fn set_iterable_queries(&mut self, names: Option<Vec<String>>) {
        self.cursor.set_iterable(names);
        self.refresh_cursor();
    }

    /// Move the cursor to the next visible highlight, rolling over.
    pub fn next(&mut self) -> Option<CursorPosition> {
        self.cursor.next();
        self.cursor_current()
    }

    /// Move the cursor to the previous visible highlight, rolling over.
    pub fn prev(&mut self) -> Option<CursorPosition> {
        self.cursor.prev();
        self.cursor_current()
    }

    /// The highlight currently under the cursor.
    pub fn cursor_current(&self) -> Option<CursorPosition> {
        let index = self.cursor.index()?;
        let mark = self
            .marks
            .iter()
            .filter(|m| self.is_visible(&m.query))
            .nth(index)?;
        let set = self.sets.iter().find(|s| s.name == mark.query)?;
        Some(CursorPosition {
            query: mark.query.clone(),
            index: mark.index,
            offset: mark.offset,
            id: set.id + mark.index,
        })
    }

    /// Convert a host selection into a range on the projection.
    ///
    /// Both endpoints must be text nodes known to the projection;
    /// zero-length selections are not representable. Returns `None`
    /// rather than an error, matching how hosts probe selections.
    pub fn selected_range(&self, selection: &Selection) -> Option<Range> {
        if !self.dom.is_text(selection.anchor_node) || !self.dom.is_text(selection.focus_node) {
            return None;
        }
        let anchor = match self.content.find(selection.anchor_node) {
            Some(marker) => self.content.at(marker).offset + selection.anchor_offset,
            None => {
                warn!("selection anchor is not part of the projection");
                return None;
            }
        };
        let focus = match self.content.find(selection.focus_node) {
            Some(marker) => self.content.at(marker).offset + selection.focus_offset,
            None => {
                warn!("selection focus is not part of the projection");
                return None;
            }
        };
        if anchor == focus {
            return None;
        }
        let (start, end_exclusive) = if anchor < focus {
            (anchor, focus)
        } else {
            (focus, anchor)
        };
        let text = self.content.text();
        if end_exclusive > text.len()
            || !text.is_char_boundary(start)
            || !text.is_char_boundary(end_exclusive)
        {
            warn!("selection offsets do not lie on char boundaries");
            return None;
        }
        let last = text[start..end_exclusive]
            .char_indices()
            .last()
            .map(|(i, _)| start + i)?;
        Range::from_absolute(&self.content, start, last).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<html><body>\
        <p>The quick brown fox jumps over the lazy dog.</p>\
        <p>The dog did not mind the fox.</p>\
        </body></html>";

    fn highlighter() -> HtmlHighlighter {
        HtmlHighlighter::from_html(DOC, Options::default()).unwrap()
    }

    #[test]
    fn add_counts_hits() {
        let mut hl = highlighter();
        hl.add("the", vec![Subject::Literal("the".into())], true, None);
        hl.apply();

        let set = hl.query_set("the").unwrap();
        assert_eq!(set.length, 4);
        assert_eq!(hl.stats().total, 4);
        assert_eq!(hl.marks().len(), 4);
    }

    #[test]
    fn marks_stay_sorted_across_sets() {
        let mut hl = highlighter();
        hl.add("dog", vec![Subject::Literal("dog".into())], true, None);
        hl.add("fox", vec![Subject::Literal("fox".into())], true, None);
        hl.apply();

        let offsets: Vec<usize> = hl.marks().iter().map(|m| m.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
        assert_eq!(hl.marks().len(), 4);
    }

    #[test]
    fn replacing_a_set_removes_the_old_one() {
        let mut hl = highlighter();
        hl.add("q", vec![Subject::Literal("fox".into())], true, None);
        hl.apply();
        assert_eq!(hl.query_set("q").unwrap().length, 2);

        hl.add("q", vec![Subject::Literal("dog".into())], true, None);
        hl.apply();
        assert_eq!(hl.stats().queries, 1);
        assert_eq!(hl.query_set("q").unwrap().length, 2);
        // Ids moved on: the old range was released before reallocation.
        assert_eq!(hl.query_set("q").unwrap().id, 2);
    }

    #[test]
    fn failed_command_does_not_block_later_ones() {
        let mut hl = highlighter();
        hl.append("missing", vec![Subject::Literal("fox".into())]);
        hl.add("fox", vec![Subject::Literal("fox".into())], true, None);
        hl.apply();

        assert!(hl.query_set("missing").is_none());
        assert_eq!(hl.query_set("fox").unwrap().length, 2);
    }

    #[test]
    fn group_ids_rotate_modulo_max() {
        let mut hl = HtmlHighlighter::from_html(
            DOC,
            Options {
                max_highlight: 2,
                ..Options::default()
            },
        )
        .unwrap();
        hl.add("a", vec![Subject::Literal("fox".into())], true, None);
        hl.add("b", vec![Subject::Literal("dog".into())], true, None);
        hl.add("c", vec![Subject::Literal("quick".into())], true, None);
        hl.apply();

        assert_eq!(hl.query_set("a").unwrap().id_highlight, 0);
        assert_eq!(hl.query_set("b").unwrap().id_highlight, 1);
        assert_eq!(hl.query_set("c").unwrap().id_highlight, 0);
        assert_eq!(hl.stats().highlight, 1);
    }

    #[test]
    fn selection_to_range() {
        let hl = highlighter();
        let p = hl.dom().find_by_tag("p").unwrap();
        let text = hl.dom().first_child(p).unwrap();

        // "quick" spans bytes 4..9 of the first paragraph.
        let range = hl
            .selected_range(&Selection {
                anchor_node: text,
                anchor_offset: 4,
                focus_node: text,
                focus_offset: 9,
            })
            .unwrap();
        assert_eq!(range.text(hl.content()), "quick");

        // Right-to-left selection of the same span.
        let reversed = hl
            .selected_range(&Selection {
                anchor_node: text,
                anchor_offset: 9,
                focus_node: text,
                focus_offset: 4,
            })
            .unwrap();
        assert_eq!(reversed, range);
    }

    #[test]
    fn zero_length_selection_rejected() {
        let hl = highlighter();
        let p = hl.dom().find_by_tag("p").unwrap();
        let text = hl.dom().first_child(p).unwrap();
        assert!(
            hl.selected_range(&Selection {
                anchor_node: text,
                anchor_offset: 4,
                focus_node: text,
                focus_offset: 4,
            })
            .is_none()
        );
        assert!(
            hl.selected_range(&Selection {
                anchor_node: p,
                anchor_offset: 0,
                focus_node: text,
                focus_offset: 4,
            })
            .is_none()
        );
    }
}
