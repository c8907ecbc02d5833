//! Crate error types.

use thiserror::Error;

use crate::history::{MAX_PRIORITY, MIN_PRIORITY};

/// Errors raised while building per-country structures or parsing inputs.
#[derive(Debug, Error)]
pub enum TzLookupError {
    /// A malformed input file.
    #[error("{file}:{line}: {message}")]
    Parse {
        file: &'static str,
        line: u32,
        message: String,
    },

    /// A zone priority outside the supported range.
    #[error("priority {0} must be >= {MIN_PRIORITY} and <= {MAX_PRIORITY}")]
    InvalidPriority(u8),

    /// A zone id with no rule data behind it.
    #[error("unknown time zone id: {0}")]
    UnknownZone(String),

    /// Zone usage cannot be derived while priority ties are present.
    #[error("cannot calculate zone usage with priority clashes present: {0}")]
    PriorityClash(String),

    /// A tree node split some but not all of its member zones, which implies
    /// inconsistent rule data.
    #[error("zones only partially partitioned under node {0}")]
    PartialPartition(String),

    /// Two links from the same old id in the backward data.
    #[error("duplicate link from {0}")]
    DuplicateLink(String),

    /// A chain of links longer than the collapse limit, which implies a cycle.
    #[error("link chain from {0} exceeds length {1}")]
    AliasCycle(String, usize),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xml write error: {0}")]
    Xml(#[from] quick_xml::Error),
}

pub type TzLookupResult<T> = Result<T, TzLookupError>;
