//! AST types for compiled filter expressions.
//!
//! The node kinds form a closed set with exhaustive matching in the
//! evaluator, so adding a predicate kind is a compile-time-checked change.
//! Trees are immutable once built and safe to share across threads.

use std::fmt;
use time::{Date, Duration, OffsetDateTime};

use crate::elements::ElementType;

bitflags::bitflags! {
    /// The element types a filter applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ElementTypes: u8 {
        const NODES = 1 << 0;
        const WAYS = 1 << 1;
        const RELATIONS = 1 << 2;
    }
}

impl From<ElementType> for ElementTypes {
    fn from(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Node => ElementTypes::NODES,
            ElementType::Way => ElementTypes::WAYS,
            ElementType::Relation => ElementTypes::RELATIONS,
        }
    }
}

impl ElementTypes {
    /// Selector spellings of the contained types, in canonical order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        [
            (ElementTypes::NODES, "nodes"),
            (ElementTypes::WAYS, "ways"),
            (ElementTypes::RELATIONS, "relations"),
        ]
        .into_iter()
        .filter_map(move |(flag, name)| self.contains(flag).then_some(name))
    }
}

/// Ordering operator of a value comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareOp {
    /// Whether `left op right` holds.
    pub fn holds<T: PartialOrd>(self, left: T, right: T) -> bool {
        match self {
            CompareOp::Less => left < right,
            CompareOp::LessOrEqual => left <= right,
            CompareOp::Greater => left > right,
            CompareOp::GreaterOrEqual => left >= right,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Less => write!(f, "<"),
            CompareOp::LessOrEqual => write!(f, "<="),
            CompareOp::Greater => write!(f, ">"),
            CompareOp::GreaterOrEqual => write!(f, ">="),
        }
    }
}

/// Calendar unit of a relative date offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Years,
    Months,
    Weeks,
    Days,
}

impl DateUnit {
    /// Mean length in days, matching check-date conventions.
    pub fn days(self) -> f64 {
        match self {
            DateUnit::Years => 365.25,
            DateUnit::Months => 30.5,
            DateUnit::Weeks => 7.0,
            DateUnit::Days => 1.0,
        }
    }
}

impl fmt::Display for DateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateUnit::Years => write!(f, "years"),
            DateUnit::Months => write!(f, "months"),
            DateUnit::Weeks => write!(f, "weeks"),
            DateUnit::Days => write!(f, "days"),
        }
    }
}

/// A date operand: fixed, or an offset from whatever day it is evaluated on.
#[derive(Debug, Clone, PartialEq)]
pub enum DateValue {
    Fixed(Date),
    RelativeToday { quantity: f64, unit: DateUnit },
}

impl DateValue {
    /// The concrete calendar date this operand denotes right now.
    pub fn resolve(&self) -> Date {
        match self {
            DateValue::Fixed(date) => *date,
            DateValue::RelativeToday { quantity, unit } => {
                // clamped so a pathological offset cannot leave the calendar range
                let days = (quantity * unit.days()).clamp(-1_000_000.0, 1_000_000.0) as i64;
                OffsetDateTime::now_utc().date() + Duration::days(days)
            }
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Fixed(date) => write!(
                f,
                "{:04}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            ),
            DateValue::RelativeToday { quantity, unit } => {
                if *quantity == 0.0 {
                    write!(f, "today")
                } else if *quantity > 0.0 {
                    write!(f, "today + ")?;
                    write_number(f, *quantity)?;
                    write!(f, " {unit}")
                } else {
                    write!(f, "today - ")?;
                    write_number(f, -quantity)?;
                    write!(f, " {unit}")
                }
            }
        }
    }
}

/// Right-hand operand of a comparison predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareValue {
    Number(f64),
    Date(DateValue),
}

impl fmt::Display for CompareValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareValue::Number(n) => write_number(f, *n),
            CompareValue::Date(date) => date.fmt(f),
        }
    }
}

/// One node of a compiled filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `key`: the tag is present.
    TagExists { key: String },
    /// `!key`: the tag is absent.
    TagNotExists { key: String },
    /// `key = value`
    TagEquals { key: String, value: String },
    /// `key != value`: also matches elements without the tag.
    TagNotEquals { key: String, value: String },
    /// `key ~ a|b|c`: the tag value is one of the alternatives.
    TagOneOf { key: String, values: Vec<String> },
    /// `key !~ a|b|c`: also matches elements without the tag.
    TagNoneOf { key: String, values: Vec<String> },
    /// `key < 3.5`, `key >= 2020-01-01`, `key < today - 8 years`
    TagCompare {
        key: String,
        op: CompareOp,
        value: CompareValue,
    },
    /// All children hold; short-circuits left to right.
    And(Vec<FilterExpr>),
    /// Any child holds; short-circuits left to right.
    Or(Vec<FilterExpr>),
    /// `!( ... )`
    Not(Box<FilterExpr>),
    /// Element-type gate around the tag expression of a whole filter.
    TypeRestrict {
        types: ElementTypes,
        expr: Box<FilterExpr>,
    },
    /// Vacuously true; the body of a filter with no `with` clause.
    True,
}

/// Characters allowed in bare (unquoted) keys and values.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-')
}

fn write_word(f: &mut fmt::Formatter<'_>, word: &str) -> fmt::Result {
    if !word.is_empty() && word.chars().all(is_word_char) {
        return f.write_str(word);
    }
    f.write_str("\"")?;
    for ch in word.chars() {
        if ch == '"' || ch == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{ch}")?;
    }
    f.write_str("\"")
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n == n.trunc() && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

fn write_alternatives(f: &mut fmt::Formatter<'_>, values: &[String]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str("|")?;
        }
        write_word(f, value)?;
    }
    Ok(())
}

impl fmt::Display for FilterExpr {
    /// Canonical spelling; parses back to an equal tree for any tree the
    /// parser produced.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::TagExists { key } => write_word(f, key),
            FilterExpr::TagNotExists { key } => {
                f.write_str("!")?;
                write_word(f, key)
            }
            FilterExpr::TagEquals { key, value } => {
                write_word(f, key)?;
                f.write_str(" = ")?;
                write_word(f, value)
            }
            FilterExpr::TagNotEquals { key, value } => {
                write_word(f, key)?;
                f.write_str(" != ")?;
                write_word(f, value)
            }
            FilterExpr::TagOneOf { key, values } => {
                write_word(f, key)?;
                f.write_str(" ~ ")?;
                write_alternatives(f, values)
            }
            FilterExpr::TagNoneOf { key, values } => {
                write_word(f, key)?;
                f.write_str(" !~ ")?;
                write_alternatives(f, values)
            }
            FilterExpr::TagCompare { key, op, value } => {
                write_word(f, key)?;
                write!(f, " {op} {value}")
            }
            FilterExpr::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" and ")?;
                    }
                    // or-expressions bind looser and need brackets back
                    if matches!(child, FilterExpr::Or(_)) {
                        write!(f, "({child})")?;
                    } else {
                        write!(f, "{child}")?;
                    }
                }
                Ok(())
            }
            FilterExpr::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            FilterExpr::Not(inner) => write!(f, "!({inner})"),
            FilterExpr::TypeRestrict { types, expr } => {
                for (i, name) in types.names().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(name)?;
                }
                if !matches!(**expr, FilterExpr::True) {
                    write!(f, " with {expr}")?;
                }
                Ok(())
            }
            // only ever rendered as the absent body of a bare type selector
            FilterExpr::True => Ok(()),
        }
    }
}
