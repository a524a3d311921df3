//! Error types for highlighting operations.

use thiserror::Error;

/// Errors that can occur while querying or mutating a highlighted document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no query set named {0:?}")]
    QuerySetNotFound(String),

    #[error("query set has no queries")]
    EmptyQueries,

    #[error("query set {name:?} has exhausted its reservation of {reserve}")]
    ReserveTooSmall { name: String, reserve: u32 },

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex_lite::Error),

    #[error("malformed xpath: {0}")]
    XpathSyntax(String),

    #[error("xpath did not resolve: {0}")]
    XpathUnresolved(String),

    #[error("node is not a text node")]
    NotTextNode,

    #[error("offset {offset} out of bounds (length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("range end precedes range start")]
    InvertedRange,

    #[error("document has no container element")]
    MissingContainer,
}

pub type Result<T> = std::result::Result<T, Error>;
