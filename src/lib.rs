//! # hilite
//!
//! An engine that highlights text queries inside HTML documents while
//! preserving the document's structure and rendering.
//!
//! ## Features
//!
//! - Literal (case-insensitive), regex, and xpath-range queries
//! - Multiple independent query sets with rotating CSS groups, capped
//!   counts, and id-space reservation
//! - A flat text projection mapping between DOM positions, absolute
//!   offsets, and container-relative xpaths
//! - Cursor navigation over the enabled highlights
//! - Clean removal: wrapper elements fold back into the original text
//!
//! ## Quick Start
//!
//! ```
//! use hilite::{HtmlHighlighter, Options, Subject};
//!
//! let html = "<html><body><p>The quick brown fox.</p></body></html>";
//! let mut hl = HtmlHighlighter::from_html(html, Options::default()).unwrap();
//!
//! hl.add("animals", vec![Subject::Literal("fox".into())], true, None);
//! hl.apply();
//!
//! assert_eq!(hl.stats().total, 1);
//! assert!(hl.to_html().contains("hh-highlight"));
//! ```
//!
//! Operations queue until [`HtmlHighlighter::apply`] drains them, so a
//! batch of changes is observed at once; a failing action is logged and
//! skipped without blocking the rest.

pub mod content;
pub mod css;
pub mod cursor;
pub mod dom;
mod error;
pub mod finder;
pub mod highlighter;
pub mod paint;
pub mod range;
pub mod xpath;

pub use error::{Error, Result};
pub use finder::{Finder, Subject, TextFinder, XpathFinder};
pub use highlighter::{
    CursorPosition, HighlightMark, HtmlHighlighter, Options, QuerySet, Selection, Stats,
};
pub use range::{Position, Range, RangeXpath};
pub use xpath::XpathDescriptor;
