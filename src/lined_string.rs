//! Embellished String which keeps track of line starts, for converting the
//! byte offsets in a [`Span`] into line/column positions for diagnostics.

use crate::util::{Position, Range, Span};
use memchr::memchr_iter;
use std::ops::{Deref, Index};

/// Wrapper around std's String which stores data about the positions of any newline characters.
///
/// Also contains a boolean indicating whether the string has any unicode characters,
/// so that the common all-ASCII case can convert offsets to columns by subtraction.
/// The indices stored in `lines` are the successors of any newline characters.
#[derive(Default, Clone, Debug)]
pub struct LinedString {
  s: String,
  unicode: bool,
  lines: Vec<usize>,
}

/// Allows [`LinedString`] to be indexed with a [`Span`], since [`Span`] is essentially a range.
impl Index<Span> for LinedString {
  type Output = [u8];
  fn index(&self, s: Span) -> &[u8] { &self.as_bytes()[s.start..s.end] }
}

impl LinedString {
  /// Index a [`LinedString`] with a [`Span`], returning a `str`.
  #[must_use]
  pub fn str_at(&self, s: Span) -> &str {
    // Safety: spans produced by the parser lie on character boundaries
    unsafe { std::str::from_utf8_unchecked(&self[s]) }
  }

  /// Calculate and store the positions of the characters immediately after
  /// any line break (so `\n` position + 1).
  #[must_use]
  fn get_lines(s: &str) -> Vec<usize> {
    memchr_iter(b'\n', s.as_bytes()).map(|b| b + 1).collect()
  }

  /// Turn a byte index into a [`Position`].
  #[must_use]
  pub fn to_pos(&self, idx: usize) -> Position {
    let (pos, line) = match self.lines.binary_search(&idx) {
      Ok(n) => (idx, n + 1),
      Err(n) => (n.checked_sub(1).map_or(0, |i| self.lines[i]), n),
    };
    Position {
      line: line.try_into().expect("too many lines"),
      character: if self.unicode {
        // Safety: we know that `pos` is a valid index, and `idx` comes from the parser
        unsafe { self.s.get_unchecked(pos..idx) }.chars().map(char::len_utf16).sum()
      } else {
        idx - pos
      }
      .try_into()
      .expect("too many characters"),
    }
  }

  /// Turn a [`Span`] into a [`Range`].
  #[must_use]
  pub fn to_range(&self, s: Span) -> Range {
    Range { start: self.to_pos(s.start), end: self.to_pos(s.end) }
  }

  /// Turn a [`Position`] into a byte index, or `None` if the line is out of
  /// range. The character offset is counted in bytes here, so this is mainly
  /// useful for finding the start of a line.
  #[must_use]
  pub fn to_idx(&self, pos: Position) -> Option<usize> {
    match pos.line.checked_sub(1) {
      None => Some(pos.character as usize),
      Some(n) => self.lines.get(n as usize).map(|&idx| idx + pos.character as usize),
    }
  }
}

impl Deref for LinedString {
  type Target = str;
  fn deref(&self) -> &str { &self.s }
}

impl From<String> for LinedString {
  fn from(s: String) -> LinedString {
    let lines = LinedString::get_lines(&s);
    LinedString { unicode: !s.is_ascii(), lines, s }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn line_positions() {
    let s: LinedString = "ab\ncd\n\ne".to_owned().into();
    assert_eq!(s.to_pos(0), Position { line: 0, character: 0 });
    assert_eq!(s.to_pos(2), Position { line: 0, character: 2 });
    assert_eq!(s.to_pos(3), Position { line: 1, character: 0 });
    assert_eq!(s.to_pos(6), Position { line: 2, character: 0 });
    assert_eq!(s.to_pos(7), Position { line: 3, character: 0 });
    assert_eq!(s.to_idx(Position { line: 0, character: 0 }), Some(0));
    assert_eq!(s.to_idx(Position { line: 2, character: 0 }), Some(6));
    assert_eq!(s.to_idx(Position { line: 9, character: 0 }), None);
  }

  #[test]
  fn unicode_columns() {
    let s: LinedString = "∀ x,\nP".to_owned().into();
    assert_eq!(s.to_pos("∀ x".len()), Position { line: 0, character: 3 });
    assert_eq!(s.to_pos(s.len()), Position { line: 1, character: 1 });
  }
}
