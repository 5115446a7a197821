//! Error types for vodpoints-scoring.

use thiserror::Error;

/// Errors from the strict duration grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// The input contained no components at all.
    #[error("duration is empty")]
    Empty,

    /// A character that is neither a digit nor a unit.
    #[error("unexpected {found:?} at position {position}")]
    UnexpectedChar { position: usize, found: char },

    /// A unit repeated or appearing after a smaller one (e.g. `20m5h`).
    #[error("unit '{unit}' at position {position} is out of order")]
    OutOfOrder { position: usize, unit: char },

    /// Trailing digits with no `h`, `m` or `s` after them.
    #[error("number at position {position} has no unit")]
    MissingUnit { position: usize },

    /// A component does not fit in a u64.
    #[error("number at position {position} is too large")]
    Overflow { position: usize },
}

/// Errors extracting a video identifier from a reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// Blank input.
    #[error("reference is empty")]
    Empty,

    /// No `videos/` path segment anywhere in the reference.
    #[error("reference has no videos/ segment")]
    MissingVideoSegment,

    /// A `videos/` segment exists but no digits follow it.
    #[error("no numeric video id follows videos/")]
    MissingIdentifier,
}
