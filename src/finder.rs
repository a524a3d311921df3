//! Finders: lazy sequences of ranges matching a subject.
//!
//! A [`Subject`] is classified explicitly: literal strings and regex
//! patterns scan the flat projection, an xpath descriptor pair resolves
//! to exactly one range.

use regex_lite::Regex;

use crate::content::TextContent;
use crate::dom::{Dom, NodeId};
use crate::range::{Range, RangeXpath, char_len_at};
use crate::{Error, Result};

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// Case-insensitive literal substring.
    Literal(String),
    /// Regular expression source, compiled as given.
    Pattern(String),
    /// A caller-supplied start/end descriptor pair.
    Xpath(RangeXpath),
}

impl Subject {
    /// Short human-readable form for log messages.
    pub fn describe(&self) -> String {
        match self {
            Subject::Literal(s) => format!("literal {s:?}"),
            Subject::Pattern(s) => format!("pattern {s:?}"),
            Subject::Xpath(x) => format!("xpath {} .. {}", x.start.xpath, x.end.xpath),
        }
    }
}

/// A finder over one subject. Iteration yields matching ranges in
/// document order.
pub enum Finder<'a> {
    Text(TextFinder<'a>),
    Xpath(XpathFinder),
}

impl<'a> Finder<'a> {
    pub fn new(
        dom: &Dom,
        container: NodeId,
        content: &'a TextContent,
        subject: &Subject,
    ) -> Result<Self> {
        match subject {
            Subject::Literal(s) => Ok(Finder::Text(TextFinder::literal(content, s)?)),
            Subject::Pattern(s) => Ok(Finder::Text(TextFinder::pattern(content, s)?)),
            Subject::Xpath(pair) => Ok(Finder::Xpath(XpathFinder::new(
                dom, container, content, pair,
            )?)),
        }
    }
}

impl Iterator for Finder<'_> {
    type Item = Range;

    fn next(&mut self) -> Option<Range> {
        match self {
            Finder::Text(f) => f.next(),
            Finder::Xpath(f) => f.next(),
        }
    }
}

/// Scans the flat projection left to right, yielding non-overlapping
/// matches.
pub struct TextFinder<'a> {
    content: &'a TextContent,
    re: Regex,
    pos: usize,
}

impl<'a> TextFinder<'a> {
    /// Case-insensitive literal search. The needle is escaped and run as
    /// a regex over the original text, so match offsets are native byte
    /// offsets (lowercasing both sides would shift them for multibyte
    /// case pairs).
    pub fn literal(content: &'a TextContent, needle: &str) -> Result<Self> {
        if needle.is_empty() {
            return Err(Error::EmptyQueries);
        }
        let re = Regex::new(&format!("(?i){}", regex_lite::escape(needle)))?;
        Ok(Self {
            content,
            re,
            pos: 0,
        })
    }

    /// Regex search with the pattern compiled as given.
    pub fn pattern(content: &'a TextContent, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)?;
        Ok(Self {
            content,
            re,
            pos: 0,
        })
    }
}

impl Iterator for TextFinder<'_> {
    type Item = Range;

    fn next(&mut self) -> Option<Range> {
        let text = self.content.text();
        loop {
            if self.pos > text.len() {
                return None;
            }
            let m = self.re.find(&text[self.pos..])?;
            let start = self.pos + m.start();
            let end = self.pos + m.end();
            if start == end {
                // Empty match; step one char so the scan terminates.
                self.pos = start + char_len_at(text, start).max(1);
                continue;
            }
            self.pos = end;
            let last = text[start..end]
                .char_indices()
                .last()
                .map(|(i, _)| start + i)?;
            return Range::from_absolute(self.content, start, last).ok();
        }
    }
}

/// Yields the single range described by an xpath pair, then `None`
/// forever. Resolution happens once, at construction.
pub struct XpathFinder {
    slot: Option<Range>,
}

impl XpathFinder {
    pub fn new(
        dom: &Dom,
        container: NodeId,
        content: &TextContent,
        subject: &RangeXpath,
    ) -> Result<Self> {
        let range = Range::from_xpath(dom, content, container, subject)?;
        Ok(Self { slot: Some(range) })
    }
}

impl Iterator for XpathFinder {
    type Item = Range;

    fn next(&mut self) -> Option<Range> {
        self.slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;
    use crate::xpath::XpathDescriptor;

    fn fixture() -> (Dom, NodeId, TextContent) {
        let dom = parse_document(
            "<html><body><p>The cat sat on the mat. THE END.</p></body></html>",
        );
        let body = dom.find_by_tag("body").unwrap();
        let content = TextContent::build(&dom, body);
        (dom, body, content)
    }

    fn texts(content: &TextContent, finder: Finder<'_>) -> Vec<String> {
        finder.map(|r| r.text(content).to_string()).collect()
    }

    #[test]
    fn literal_is_case_insensitive() {
        let (dom, body, content) = fixture();
        let finder = Finder::new(&dom, body, &content, &Subject::Literal("the".into())).unwrap();
        assert_eq!(texts(&content, finder), vec!["The", "the", "THE"]);

        let upper = Finder::new(&dom, body, &content, &Subject::Literal("THE".into())).unwrap();
        assert_eq!(upper.count(), 3);
    }

    #[test]
    fn literal_matches_do_not_overlap() {
        let dom = parse_document("<html><body><p>aaaa</p></body></html>");
        let body = dom.find_by_tag("body").unwrap();
        let content = TextContent::build(&dom, body);
        let finder = Finder::new(&dom, body, &content, &Subject::Literal("aa".into())).unwrap();
        assert_eq!(finder.count(), 2);
    }

    #[test]
    fn literal_with_regex_metacharacters() {
        let dom = parse_document("<html><body><p>1+1 = 2 (obviously)</p></body></html>");
        let body = dom.find_by_tag("body").unwrap();
        let content = TextContent::build(&dom, body);
        let finder = Finder::new(&dom, body, &content, &Subject::Literal("1+1".into())).unwrap();
        assert_eq!(texts(&content, finder), vec!["1+1"]);
    }

    #[test]
    fn empty_literal_rejected() {
        let (dom, body, content) = fixture();
        assert!(matches!(
            Finder::new(&dom, body, &content, &Subject::Literal(String::new())),
            Err(Error::EmptyQueries)
        ));
    }

    #[test]
    fn pattern_search() {
        let (dom, body, content) = fixture();
        let finder =
            Finder::new(&dom, body, &content, &Subject::Pattern(r"[cm]at".into())).unwrap();
        assert_eq!(texts(&content, finder), vec!["cat", "mat"]);
    }

    #[test]
    fn bad_pattern_is_a_construction_error() {
        let (dom, body, content) = fixture();
        assert!(matches!(
            Finder::new(&dom, body, &content, &Subject::Pattern("(".into())),
            Err(Error::Regex(_))
        ));
    }

    #[test]
    fn empty_matches_are_skipped() {
        let (dom, body, content) = fixture();
        let finder = Finder::new(&dom, body, &content, &Subject::Pattern("x*".into())).unwrap();
        // "x*" matches empty everywhere; nothing should be yielded and
        // iteration must terminate.
        assert_eq!(finder.count(), 0);
    }

    #[test]
    fn xpath_finder_yields_once() {
        let (dom, body, content) = fixture();
        let subject = Subject::Xpath(RangeXpath {
            start: XpathDescriptor {
                xpath: "/p[1]/text()".into(),
                offset: 4,
            },
            end: XpathDescriptor {
                xpath: "/p[1]/text()".into(),
                offset: 6,
            },
        });
        let mut finder = Finder::new(&dom, body, &content, &subject).unwrap();
        let range = finder.next().expect("one range");
        assert_eq!(range.text(&content), "cat");
        assert!(finder.next().is_none());
        assert!(finder.next().is_none());
    }

    #[test]
    fn xpath_finder_unresolvable_is_construction_error() {
        let (dom, body, content) = fixture();
        let subject = Subject::Xpath(RangeXpath {
            start: XpathDescriptor {
                xpath: "/div[9]/text()".into(),
                offset: 0,
            },
            end: XpathDescriptor {
                xpath: "/div[9]/text()".into(),
                offset: 1,
            },
        });
        assert!(Finder::new(&dom, body, &content, &subject).is_err());
    }
}
