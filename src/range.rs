//! Ranges over the flat text projection.
//!
//! A [`Position`] pins a point to a marker plus an intra-node byte
//! offset; a [`Range`] is an ordered pair of positions with an inclusive
//! end. Ranges convert to and from container-relative xpath descriptors.

use crate::content::TextContent;
use crate::dom::{Dom, NodeId};
use crate::xpath::{self, XpathDescriptor};
use crate::{Error, Result};

/// Byte length of the char starting at `idx`.
pub(crate) fn char_len_at(text: &str, idx: usize) -> usize {
    text[idx..].chars().next().map_or(0, char::len_utf8)
}

/// A point within a single text node of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Index of the containing marker in the [`TextContent`].
    pub marker: usize,
    /// Byte offset within the marker's node, as it was at build time.
    pub offset: usize,
}

impl Position {
    /// Absolute byte offset on the flat projection.
    pub fn absolute(&self, content: &TextContent) -> usize {
        content.at(self.marker).offset + self.offset
    }
}

/// An inclusive span of the projection: `start` and `end` both point at
/// characters, and the character at `end` belongs to the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// The xpath form of a range: start and end descriptors with offsets
/// measured from the beginning of their logical text runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeXpath {
    pub start: XpathDescriptor,
    pub end: XpathDescriptor,
}

impl Range {
    /// Build a range from two positions, checking the ordering invariant.
    pub fn new(content: &TextContent, start: Position, end: Position) -> Result<Self> {
        if end.absolute(content) < start.absolute(content) {
            return Err(Error::InvertedRange);
        }
        Ok(Self { start, end })
    }

    /// Build a range from absolute byte offsets, both pointing at
    /// characters of the projection (`end` at the last included one).
    pub fn from_absolute(content: &TextContent, start: usize, end: usize) -> Result<Self> {
        if end < start {
            return Err(Error::InvertedRange);
        }
        let text = content.text();
        for abs in [start, end] {
            if abs >= text.len() || !text.is_char_boundary(abs) {
                return Err(Error::OffsetOutOfBounds {
                    offset: abs,
                    len: text.len(),
                });
            }
        }
        let position = |abs: usize| -> Result<Position> {
            let marker = content
                .marker_at_offset(abs)
                .ok_or(Error::OffsetOutOfBounds {
                    offset: abs,
                    len: text.len(),
                })?;
            Ok(Position {
                marker,
                offset: abs - content.at(marker).offset,
            })
        };
        Ok(Self {
            start: position(start)?,
            end: position(end)?,
        })
    }

    pub fn start_absolute(&self, content: &TextContent) -> usize {
        self.start.absolute(content)
    }

    pub fn end_absolute(&self, content: &TextContent) -> usize {
        self.end.absolute(content)
    }

    /// One past the last byte of the range.
    pub fn end_exclusive(&self, content: &TextContent) -> usize {
        let end = self.end.absolute(content);
        end + char_len_at(content.text(), end)
    }

    /// Byte length of the spanned text, end inclusive.
    pub fn len(&self, content: &TextContent) -> usize {
        self.end_exclusive(content) - self.start.absolute(content)
    }

    /// The spanned text.
    pub fn text<'a>(&self, content: &'a TextContent) -> &'a str {
        &content.text()[self.start.absolute(content)..self.end_exclusive(content)]
    }

    /// Compute the xpath descriptors of both endpoints. The descriptor
    /// offsets are measured from the start of the logical text run, so a
    /// position in the second node of a split run reports the first
    /// node's length plus its own offset.
    pub fn compute_xpath(
        &self,
        dom: &Dom,
        content: &TextContent,
        container: NodeId,
    ) -> Result<RangeXpath> {
        let describe = |position: &Position| -> Result<XpathDescriptor> {
            let node = content.at(position.marker).node;
            Ok(XpathDescriptor {
                xpath: xpath::xpath_of(dom, container, node)?,
                offset: xpath::offset_in_run(dom, node) + position.offset,
            })
        };
        Ok(RangeXpath {
            start: describe(&self.start)?,
            end: describe(&self.end)?,
        })
    }

    /// Resolve a pair of xpath descriptors into a range on the current
    /// projection. Inverse of [`Range::compute_xpath`].
    pub fn from_xpath(
        dom: &Dom,
        content: &TextContent,
        container: NodeId,
        subject: &RangeXpath,
    ) -> Result<Self> {
        let locate = |descriptor: &XpathDescriptor| -> Result<usize> {
            let node = xpath::element_at(dom, container, &descriptor.xpath)?;
            if !dom.is_text(node) {
                return Err(Error::NotTextNode);
            }
            let marker = content
                .find(node)
                .ok_or_else(|| Error::XpathUnresolved(descriptor.xpath.clone()))?;
            Ok(content.at(marker).offset + descriptor.offset)
        };
        Self::from_absolute(content, locate(&subject.start)?, locate(&subject.end)?)
    }
}
