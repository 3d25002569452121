//! Evaluation of compiled filter expressions against elements.
//!
//! Matching is total: a tag value that cannot be read as the number or date
//! an operand asks for fails that comparison instead of raising an error.

use once_cell::sync::Lazy;
use regex::Regex;
use time::{Date, Month};

use super::ast::{CompareOp, CompareValue, FilterExpr};
use crate::elements::Element;

static CHECK_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})(?:-([0-9]{2}))?$").unwrap());

impl FilterExpr {
    /// Whether `element` satisfies this expression.
    pub fn matches(&self, element: &Element) -> bool {
        let tags = element.tags();
        match self {
            FilterExpr::TagExists { key } => tags.contains_key(key),
            FilterExpr::TagNotExists { key } => !tags.contains_key(key),
            FilterExpr::TagEquals { key, value } => tags.get(key).is_some_and(|v| v == value),
            FilterExpr::TagNotEquals { key, value } => tags.get(key).is_none_or(|v| v != value),
            FilterExpr::TagOneOf { key, values } => tags
                .get(key)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            FilterExpr::TagNoneOf { key, values } => tags
                .get(key)
                .is_none_or(|v| values.iter().all(|candidate| candidate != v)),
            FilterExpr::TagCompare { key, op, value } => tags
                .get(key)
                .is_some_and(|raw| compare_tag_value(raw, *op, value)),
            FilterExpr::And(children) => children.iter().all(|child| child.matches(element)),
            FilterExpr::Or(children) => children.iter().any(|child| child.matches(element)),
            FilterExpr::Not(inner) => !inner.matches(element),
            FilterExpr::TypeRestrict { types, expr } => {
                types.contains(element.element_type().into()) && expr.matches(element)
            }
            FilterExpr::True => true,
        }
    }
}

fn compare_tag_value(raw: &str, op: CompareOp, value: &CompareValue) -> bool {
    match value {
        CompareValue::Number(operand) => {
            parse_numeric(raw).is_some_and(|n| op.holds(n, *operand))
        }
        CompareValue::Date(operand) => {
            parse_check_date(raw).is_some_and(|d| op.holds(d, operand.resolve()))
        }
    }
}

/// Read a tag value as a number, tolerating a trailing unit ("50 mph" is 50).
pub(crate) fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Ok(number) = trimmed.parse::<f64>() {
        return Some(number);
    }
    let prefix: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if prefix.is_empty() {
        return None;
    }
    prefix.parse().ok()
}

/// Read a tag value as a check date: `YYYY-MM-DD`, or `YYYY-MM` meaning the
/// first day of that month.
pub(crate) fn parse_check_date(raw: &str) -> Option<Date> {
    let caps = CHECK_DATE_RE.captures(raw.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u8 = caps[2].parse().ok()?;
    let day: u8 = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 1,
    };
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}
