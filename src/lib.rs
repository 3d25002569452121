//! Compiled tag-filter expressions for OpenStreetMap-style element data.
//!
//! The heart of the crate is [`ElementFilter`]: a small query language for
//! selecting elements by type and tags, compiled once into an immutable
//! expression tree and matched against millions of elements after that.
//!
//! ```
//! use tagsieve::{Element, ElementFilter, Node};
//! use std::collections::HashMap;
//!
//! let filter = ElementFilter::parse("nodes with entrance and !barrier")?;
//!
//! let mut tags = HashMap::new();
//! tags.insert("entrance".to_string(), "main".to_string());
//! let node = Element::Node(Node { id: 1, tags });
//!
//! assert!(filter.matches(&node));
//! # Ok::<(), tagsieve::ParseError>(())
//! ```

pub mod elements;
pub mod filter;
pub mod io;

pub use elements::{Element, ElementType, Member, Node, Relation, Way};
pub use filter::{ElementFilter, FilterCache, ParseError, compile_cached};
