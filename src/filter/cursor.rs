//! A forward-only scanner over an immutable source string.
//!
//! Every lexical rule of the filter language is expressed as a probe on this
//! cursor: look at what comes next, and either consume it or leave the
//! position untouched. Positions are byte offsets into the source and always
//! sit on a UTF-8 character boundary, so extracted tokens are plain slices of
//! the original string.

use regex::{Match, Regex};
use thiserror::Error;

/// The cursor was asked to read outside the source string.
///
/// This signals a defect in the parsing code itself, not bad query text: no
/// input reachable through the public parse entry point triggers it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cursor out of range at position {position}")]
pub struct OutOfRangeError {
    pub position: usize,
}

/// Scanner state: the source text plus a single mutable position.
///
/// Cloning is cheap and yields an independent probe, which is how the parser
/// performs bounded lookahead without committing to a consumption.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Cursor { source, pos: 0 }
    }

    /// Current byte offset into the source.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Character at the cursor, or `None` at the end. Never advances.
    pub fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    /// Whether `pos + offset` is at or past the end of the source.
    pub fn is_at_end(&self, offset: usize) -> bool {
        self.pos.saturating_add(offset) >= self.source.len()
    }

    /// Consume and return the character at the cursor.
    pub fn advance(&mut self) -> Result<char, OutOfRangeError> {
        let ch = self.peek().ok_or(OutOfRangeError { position: self.pos })?;
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    /// Consume up to `n` bytes and return them as a slice.
    ///
    /// Overrunning the end is not an error; the slice is clamped to the end
    /// of the source. If the clamped end would split a multi-byte character
    /// it moves back to the previous character boundary.
    pub fn advance_by(&mut self, n: usize) -> &'a str {
        let mut end = usize::min(self.pos.saturating_add(n), self.source.len());
        while !self.source.is_char_boundary(end) {
            end -= 1;
        }
        let consumed = &self.source[self.pos..end];
        self.pos = end;
        consumed
    }

    /// Whether the source continues with `s` exactly at the cursor.
    pub fn next_is(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }

    /// Whether the character at the cursor is `c`.
    pub fn next_is_char(&self, c: char) -> bool {
        self.peek() == Some(c)
    }

    /// ASCII-case-insensitive variant of [`Cursor::next_is`].
    pub fn next_is_ignoring_case(&self, s: &str) -> bool {
        match self.source.get(self.pos..self.pos + s.len()) {
            Some(next) => next.eq_ignore_ascii_case(s),
            None => false,
        }
    }

    /// Consume `s` if it is the next thing at the cursor.
    pub fn next_is_and_advance(&mut self, s: &str) -> bool {
        if !self.next_is(s) {
            return false;
        }
        self.pos += s.len();
        true
    }

    /// Consume `c` if it is the next character.
    pub fn next_is_char_and_advance(&mut self, c: char) -> bool {
        if !self.next_is_char(c) {
            return false;
        }
        self.pos += c.len_utf8();
        true
    }

    /// ASCII-case-insensitive variant of [`Cursor::next_is_and_advance`].
    pub fn next_is_and_advance_ignoring_case(&mut self, s: &str) -> bool {
        if !self.next_is_ignoring_case(s) {
            return false;
        }
        self.pos += s.len();
        true
    }

    /// Match `re` anchored at the cursor: a match that starts any later does
    /// not count. Never advances.
    pub fn next_matches(&self, re: &Regex) -> Option<Match<'a>> {
        let found = re.find_at(self.source, self.pos)?;
        if found.start() != self.pos {
            return None;
        }
        Some(found)
    }

    /// As [`Cursor::next_matches`], consuming the full matched span.
    pub fn next_matches_and_advance(&mut self, re: &Regex) -> Option<Match<'a>> {
        let found = self.next_matches(re)?;
        self.pos = found.end();
        Some(found)
    }

    /// Byte distance from the cursor to the next occurrence of `needle` at
    /// or after `pos + offset`, or to the end of the source if it does not
    /// occur again. The distance is always measured from the cursor.
    pub fn find_next(&self, needle: &str, offset: usize) -> usize {
        let from = self.search_start(offset);
        self.to_distance(self.source[from..].find(needle).map(|i| from + i))
    }

    /// As [`Cursor::find_next`], for a single character.
    pub fn find_next_char(&self, needle: char, offset: usize) -> usize {
        let from = self.search_start(offset);
        self.to_distance(self.source[from..].find(needle).map(|i| from + i))
    }

    fn search_start(&self, offset: usize) -> usize {
        let mut from = usize::min(self.pos.saturating_add(offset), self.source.len());
        while !self.source.is_char_boundary(from) {
            from += 1;
        }
        from
    }

    /// Whether the character just before the cursor is `c`.
    pub fn preceding_is(&self, c: char) -> Result<bool, OutOfRangeError> {
        let before = self.source[..self.pos]
            .chars()
            .next_back()
            .ok_or(OutOfRangeError { position: self.pos })?;
        Ok(before == c)
    }

    fn to_distance(&self, absolute: Option<usize>) -> usize {
        match absolute {
            Some(index) => index - self.pos,
            None => self.source.len() - self.pos,
        }
    }
}
