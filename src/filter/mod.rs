//! Compiled tag-filter expressions.
//!
//! A filter selects elements by type and by their tags, written in a
//! compact query syntax:
//!
//! ```text
//! nodes with entrance and !barrier
//! ways, relations with building and building !~ yes|no|service
//! ways with highway ~ path|footway and area != yes
//! nodes with check_date < today - 8 years
//! ```
//!
//! A filter compiles once into an immutable expression tree and then
//! matches any number of elements, from any number of threads. Repeat
//! compiles of the same source go through [`FilterCache`].

mod ast;
mod cache;
mod cursor;
mod error;
mod eval;
mod parser;

pub use ast::{CompareOp, CompareValue, DateUnit, DateValue, ElementTypes, FilterExpr};
pub use cache::{FilterCache, compile_cached};
pub use cursor::{Cursor, OutOfRangeError};
pub use error::ParseError;

use std::fmt;
use std::str::FromStr;

use crate::elements::Element;

/// A compiled element filter: the source it was built from plus the
/// expression tree that does the matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFilter {
    source: String,
    root: FilterExpr,
}

impl ElementFilter {
    /// Compile a filter from its source text.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Whether `element` passes this filter.
    pub fn matches(&self, element: &Element) -> bool {
        self.root.matches(element)
    }

    /// The text this filter was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled expression tree.
    pub fn root(&self) -> &FilterExpr {
        &self.root
    }
}

impl FromStr for ElementFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementFilter::parse(s)
    }
}

impl fmt::Display for ElementFilter {
    /// The canonical spelling of the compiled tree, not the original text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}
