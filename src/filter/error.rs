//! Failure taxonomy of the filter parser.
//!
//! The evaluator has no failure channel at all: malformed tag values on an
//! element make the affected predicate false instead of aborting a scan.

use thiserror::Error;

use super::cursor::OutOfRangeError;

/// Why a filter source string failed to compile.
///
/// Positions are byte offsets into the source text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Malformed query text; recoverable by the caller (typically by
    /// refusing to register the rule that declared the filter).
    #[error("syntax error at position {position}: expected {expected}")]
    Syntax { position: usize, expected: String },

    /// Cursor misuse bubbled out of the grammar code. Reaching this from the
    /// public parse entry point is a bug, not a property of the input.
    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeError),
}

impl ParseError {
    /// Byte offset of the failure in the source string.
    pub fn position(&self) -> usize {
        match self {
            ParseError::Syntax { position, .. } => *position,
            ParseError::OutOfRange(inner) => inner.position,
        }
    }
}
