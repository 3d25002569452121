//! Recursive-descent parser for the filter language.
//!
//! Grammar (in rough EBNF, precedence low to high):
//!
//! ```text
//! filter     = types ("with" or_expr)?
//! types      = type_name ("," type_name)*
//! type_name  = "nodes" | "ways" | "relations"
//! or_expr    = and_expr ("or" and_expr)*
//! and_expr   = not_expr ("and" not_expr)*
//! not_expr   = "!" "(" or_expr ")" | "!" KEY | primary
//! primary    = "(" or_expr ")" | predicate
//! predicate  = KEY (op operand)?
//! op         = "!~" | "~" | "!=" | "<=" | ">=" | "<" | ">" | "="
//! ```
//!
//! Operators are probed longest first so `!~` and `<=` win over their
//! one-character prefixes. `~` and `!~` take pipe-delimited alternation
//! lists of literal values; the ordering operators take a number, an ISO
//! date, or a `today`-relative date. Keys and values may be quoted to
//! carry characters outside the bare word class. Whitespace and `#`
//! line comments are skipped between all tokens.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::{
    CompareOp, CompareValue, DateUnit, DateValue, ElementTypes, FilterExpr, is_word_char,
};
use super::cursor::Cursor;
use super::error::ParseError;
use super::eval::parse_check_date;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z0-9_:-]+").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[+-]?[0-9]+(?:\.[0-9]+)?").unwrap());
static UNSIGNED_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{4}-[0-9]{2}(?:-[0-9]{2})?").unwrap());

/// Parse one filter source string into its expression tree.
pub(crate) fn parse(source: &str) -> Result<FilterExpr, ParseError> {
    let mut parser = Parser {
        cursor: Cursor::new(source),
    };
    parser.parse_root()
}

struct Parser<'a> {
    cursor: Cursor<'a>,
}

impl Parser<'_> {
    fn parse_root(&mut self) -> Result<FilterExpr, ParseError> {
        let types = self.parse_element_types()?;
        self.skip_space();
        if self.cursor.is_at_end(0) {
            // a bare selector matches every element of those types
            return Ok(FilterExpr::TypeRestrict {
                types,
                expr: Box::new(FilterExpr::True),
            });
        }
        if !self.consume_keyword("with") {
            return Err(self.syntax("'with'"));
        }
        let expr = self.parse_or()?;
        self.skip_space();
        if !self.cursor.is_at_end(0) {
            return Err(self.syntax("'and', 'or' or the end of the filter"));
        }
        Ok(FilterExpr::TypeRestrict {
            types,
            expr: Box::new(expr),
        })
    }

    fn parse_element_types(&mut self) -> Result<ElementTypes, ParseError> {
        let mut types = ElementTypes::empty();
        loop {
            self.skip_space();
            let start = self.cursor.pos();
            let name = self
                .cursor
                .next_matches_and_advance(&WORD_RE)
                .map(|m| m.as_str())
                .ok_or_else(|| unknown_element_type(start))?;
            types |= match name {
                "nodes" => ElementTypes::NODES,
                "ways" => ElementTypes::WAYS,
                "relations" => ElementTypes::RELATIONS,
                _ => return Err(unknown_element_type(start)),
            };
            self.skip_space();
            if !self.cursor.next_is_char_and_advance(',') {
                break;
            }
        }
        Ok(types)
    }

    fn parse_or(&mut self) -> Result<FilterExpr, ParseError> {
        let mut children = Vec::new();
        push_or_child(&mut children, self.parse_and()?);
        loop {
            self.skip_space();
            if !self.consume_keyword("or") {
                break;
            }
            push_or_child(&mut children, self.parse_and()?);
        }
        if children.len() == 1 {
            Ok(children.pop().unwrap())
        } else {
            Ok(FilterExpr::Or(children))
        }
    }

    fn parse_and(&mut self) -> Result<FilterExpr, ParseError> {
        let mut children = Vec::new();
        push_and_child(&mut children, self.parse_not()?);
        loop {
            self.skip_space();
            if !self.consume_keyword("and") {
                break;
            }
            push_and_child(&mut children, self.parse_not()?);
        }
        if children.len() == 1 {
            Ok(children.pop().unwrap())
        } else {
            Ok(FilterExpr::And(children))
        }
    }

    fn parse_not(&mut self) -> Result<FilterExpr, ParseError> {
        self.skip_space();
        if !self.cursor.next_is_char_and_advance('!') {
            return self.parse_primary();
        }
        // a lone '!' negates a bracket group or a key's existence; "!=" and
        // "!~" never arrive here since those follow an already-parsed key
        self.skip_space();
        if self.cursor.next_is_char('(') {
            let inner = self.parse_primary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        let key = self.parse_word("a tag key")?;
        Ok(FilterExpr::TagNotExists { key })
    }

    fn parse_primary(&mut self) -> Result<FilterExpr, ParseError> {
        self.skip_space();
        if self.cursor.next_is_char_and_advance('(') {
            let inner = self.parse_or()?;
            self.skip_space();
            if !self.cursor.next_is_char_and_advance(')') {
                return Err(self.syntax("')'"));
            }
            return Ok(inner);
        }
        self.parse_tag_predicate()
    }

    fn parse_tag_predicate(&mut self) -> Result<FilterExpr, ParseError> {
        let key = self.parse_word("a tag key")?;
        self.skip_space();

        // longer operators before their prefixes
        if self.cursor.next_is_and_advance("!~") {
            let values = self.parse_alternatives()?;
            return Ok(FilterExpr::TagNoneOf { key, values });
        }
        if self.cursor.next_is_char_and_advance('~') {
            let values = self.parse_alternatives()?;
            return Ok(FilterExpr::TagOneOf { key, values });
        }
        if self.cursor.next_is_and_advance("!=") {
            let value = self.parse_word("a tag value")?;
            return Ok(FilterExpr::TagNotEquals { key, value });
        }
        if self.cursor.next_is_and_advance("<=") {
            return self.finish_comparison(key, CompareOp::LessOrEqual);
        }
        if self.cursor.next_is_and_advance(">=") {
            return self.finish_comparison(key, CompareOp::GreaterOrEqual);
        }
        if self.cursor.next_is_char_and_advance('<') {
            return self.finish_comparison(key, CompareOp::Less);
        }
        if self.cursor.next_is_char_and_advance('>') {
            return self.finish_comparison(key, CompareOp::Greater);
        }
        if self.cursor.next_is_char_and_advance('=') {
            let value = self.parse_word("a tag value")?;
            return Ok(FilterExpr::TagEquals { key, value });
        }
        Ok(FilterExpr::TagExists { key })
    }

    fn parse_alternatives(&mut self) -> Result<Vec<String>, ParseError> {
        let mut values = vec![self.parse_word("a tag value")?];
        loop {
            self.skip_space();
            if !self.cursor.next_is_char_and_advance('|') {
                break;
            }
            values.push(self.parse_word("a tag value")?);
        }
        Ok(values)
    }

    fn finish_comparison(&mut self, key: String, op: CompareOp) -> Result<FilterExpr, ParseError> {
        let value = self.parse_comparison_operand()?;
        Ok(FilterExpr::TagCompare { key, op, value })
    }

    fn parse_comparison_operand(&mut self) -> Result<CompareValue, ParseError> {
        self.skip_space();
        let start = self.cursor.pos();

        // dates before numbers, or "2020-10-01" would lex as 2020 minus ...
        if let Some(found) = self.cursor.next_matches(&DATE_RE) {
            let text = found.as_str();
            self.cursor.advance_by(text.len());
            if !self.value_boundary() {
                return Err(expected_number_or_date(start));
            }
            let date = parse_check_date(text).ok_or_else(|| ParseError::Syntax {
                position: start,
                expected: "a valid calendar date".to_string(),
            })?;
            return Ok(CompareValue::Date(DateValue::Fixed(date)));
        }

        if self.consume_keyword("today") {
            return self.parse_relative_date();
        }

        if let Some(found) = self.cursor.next_matches(&NUMBER_RE) {
            let text = found.as_str();
            self.cursor.advance_by(text.len());
            if !self.value_boundary() {
                return Err(expected_number_or_date(start));
            }
            let number = text.parse().map_err(|_| expected_number_or_date(start))?;
            return Ok(CompareValue::Number(number));
        }

        Err(expected_number_or_date(start))
    }

    fn parse_relative_date(&mut self) -> Result<CompareValue, ParseError> {
        self.skip_space();
        let sign = if self.cursor.next_is_char_and_advance('+') {
            1.0
        } else if self.cursor.next_is_char_and_advance('-') {
            -1.0
        } else {
            return Ok(CompareValue::Date(DateValue::RelativeToday {
                quantity: 0.0,
                unit: DateUnit::Days,
            }));
        };

        self.skip_space();
        let quantity: f64 = match self.cursor.next_matches_and_advance(&UNSIGNED_NUMBER_RE) {
            Some(found) => found
                .as_str()
                .parse()
                .map_err(|_| self.syntax("a number"))?,
            None => return Err(self.syntax("a number")),
        };

        self.skip_space();
        let unit_start = self.cursor.pos();
        let unit = match self
            .cursor
            .next_matches_and_advance(&WORD_RE)
            .map(|m| m.as_str())
        {
            Some("year" | "years") => DateUnit::Years,
            Some("month" | "months") => DateUnit::Months,
            Some("week" | "weeks") => DateUnit::Weeks,
            Some("day" | "days") => DateUnit::Days,
            _ => {
                return Err(ParseError::Syntax {
                    position: unit_start,
                    expected: "a date unit (years, months, weeks or days)".to_string(),
                });
            }
        };

        Ok(CompareValue::Date(DateValue::RelativeToday {
            quantity: sign * quantity,
            unit,
        }))
    }

    fn parse_word(&mut self, expected: &'static str) -> Result<String, ParseError> {
        self.skip_space();
        if self.cursor.next_is_char('"') || self.cursor.next_is_char('\'') {
            return self.parse_quoted();
        }
        match self.cursor.next_matches_and_advance(&WORD_RE) {
            Some(word) => Ok(word.as_str().to_string()),
            None => Err(self.syntax(expected)),
        }
    }

    fn parse_quoted(&mut self) -> Result<String, ParseError> {
        let opening = self.cursor.pos();
        let quote = self.cursor.advance()?;
        let unterminated = || ParseError::Syntax {
            position: opening,
            expected: format!("a closing {quote}"),
        };
        let mut word = String::new();
        loop {
            match self.cursor.peek() {
                None => return Err(unterminated()),
                Some('\\') => {
                    // backslash takes the next character literally
                    self.cursor.advance()?;
                    word.push(self.cursor.advance().map_err(|_| unterminated())?);
                }
                Some(c) if c == quote => {
                    self.cursor.advance()?;
                    return Ok(word);
                }
                Some(c) => {
                    word.push(c);
                    self.cursor.advance()?;
                }
            }
        }
    }

    /// Consume `kw` only when it ends at a word boundary, so that a key such
    /// as `android` is never split into the keyword `and` plus a remainder.
    fn consume_keyword(&mut self, kw: &str) -> bool {
        if !self.cursor.next_is(kw) {
            return false;
        }
        let mut probe = self.cursor.clone();
        probe.advance_by(kw.len());
        if probe.peek().is_some_and(is_word_char) {
            return false;
        }
        self.cursor = probe;
        true
    }

    /// A number or date token must end cleanly, not run into further word
    /// characters ("30mph" is not a number 30).
    fn value_boundary(&self) -> bool {
        match self.cursor.peek() {
            Some(c) => !is_word_char(c) && c != '.',
            None => true,
        }
    }

    fn skip_space(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_whitespace() => {
                    self.cursor.advance_by(c.len_utf8());
                }
                Some('#') => {
                    let line_end = self.cursor.find_next_char('\n', 0);
                    self.cursor.advance_by(line_end);
                }
                _ => break,
            }
        }
    }

    fn syntax(&self, expected: &str) -> ParseError {
        ParseError::Syntax {
            position: self.cursor.pos(),
            expected: expected.to_string(),
        }
    }
}

/// Nested groups of the same operator fold into one n-ary node.
fn push_or_child(children: &mut Vec<FilterExpr>, child: FilterExpr) {
    match child {
        FilterExpr::Or(inner) => children.extend(inner),
        other => children.push(other),
    }
}

fn push_and_child(children: &mut Vec<FilterExpr>, child: FilterExpr) {
    match child {
        FilterExpr::And(inner) => children.extend(inner),
        other => children.push(other),
    }
}

fn unknown_element_type(position: usize) -> ParseError {
    ParseError::Syntax {
        position,
        expected: "an element type (nodes, ways or relations)".to_string(),
    }
}

fn expected_number_or_date(position: usize) -> ParseError {
    ParseError::Syntax {
        position,
        expected: "a number or date".to_string(),
    }
}
