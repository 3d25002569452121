//! The map element model filters are evaluated against.
//!
//! Elements are consumed, not produced, by this crate: callers obtain them
//! from whatever storage or download layer they use and hand them to a
//! compiled filter one at a time. The serde derives define the JSON Lines
//! interchange shape used by [`crate::io`] and the CLI.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three kinds of map element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

/// A single point feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// An ordered sequence of nodes, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: i64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub node_ids: Vec<i64>,
}

/// A grouping of other elements, each with a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// One member entry of a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    #[serde(rename = "type")]
    pub member_type: ElementType,
    pub role: String,
}

/// A map element: a node, way or relation.
///
/// Tag keys are unique per element and tag values are never empty; a missing
/// attribute is modeled by the absence of its key, not by an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Element {
    pub fn id(&self) -> i64 {
        match self {
            Element::Node(node) => node.id,
            Element::Way(way) => way.id,
            Element::Relation(relation) => relation.id,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Element::Node(_) => ElementType::Node,
            Element::Way(_) => ElementType::Way,
            Element::Relation(_) => ElementType::Relation,
        }
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        match self {
            Element::Node(node) => &node.tags,
            Element::Way(way) => &way.tags,
            Element::Relation(relation) => &relation.tags,
        }
    }
}
