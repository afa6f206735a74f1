//! Source text, line-break discovery and line views
//!
//! Line breaks are `\r\n`, `\r` and `\n`. Files with mixed line endings are
//! supported: every break is recorded with its own text, and the first one
//! found decides the style used when new breaks are synthesized.

use std::ops::Range;

use serde::Serialize;

/// Line break used when the source has none
pub const DEFAULT_LINE_BREAK: &str = "\n";

/// A line/column position. Lines are 1-based, columns are 0-based and
/// counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 0 }
    }
}

/// Running line/column counter
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    position: Position,
    pending_cr: bool,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Move the cursor past `text`
    pub fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '\r' => {
                    self.position.line += 1;
                    self.position.column = 0;
                    self.pending_cr = true;
                }
                '\n' if self.pending_cr => {
                    // second half of \r\n
                    self.pending_cr = false;
                }
                '\n' => {
                    self.position.line += 1;
                    self.position.column = 0;
                }
                _ => {
                    self.position.column += 1;
                    self.pending_cr = false;
                }
            }
        }
    }
}

/// A single line break occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBreak {
    pub offset: usize,
    pub text: &'static str,
}

impl LineBreak {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Find every line break in `text`
pub fn line_breaks(text: &str) -> Vec<LineBreak> {
    let bytes = text.as_bytes();
    let mut breaks = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                breaks.push(LineBreak {
                    offset: i,
                    text: "\r\n",
                });
                i += 2;
            }
            b'\r' => {
                breaks.push(LineBreak {
                    offset: i,
                    text: "\r",
                });
                i += 1;
            }
            b'\n' => {
                breaks.push(LineBreak {
                    offset: i,
                    text: "\n",
                });
                i += 1;
            }
            _ => i += 1,
        }
    }
    breaks
}

/// First line break style used in `text`, or `\n`
pub fn dominant_line_break(text: &str) -> &'static str {
    line_breaks(text)
        .first()
        .map(|lb| lb.text)
        .unwrap_or(DEFAULT_LINE_BREAK)
}

pub fn contains_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

pub fn count_line_breaks(text: &str) -> usize {
    line_breaks(text).len()
}

/// Split on any line break, dropping the breaks
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    for lb in line_breaks(text) {
        lines.push(&text[start..lb.offset]);
        start = lb.end();
    }
    lines.push(&text[start..]);
    lines
}

/// Split on any line break, keeping each break attached to the line it ends
pub fn split_lines_inclusive(text: &str) -> Vec<(&str, &'static str)> {
    let mut lines = Vec::new();
    let mut start = 0;
    for lb in line_breaks(text) {
        lines.push((&text[start..lb.offset], lb.text));
        start = lb.end();
    }
    lines.push((&text[start..], ""));
    lines
}

/// Raw source text with its line structure
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    text: String,
    breaks: Vec<LineBreak>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let breaks = line_breaks(&text);
        Self { text, breaks }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_breaks(&self) -> &[LineBreak] {
        &self.breaks
    }

    pub fn dominant_line_break(&self) -> &'static str {
        self.breaks
            .first()
            .map(|lb| lb.text)
            .unwrap_or(DEFAULT_LINE_BREAK)
    }

    pub fn line_count(&self) -> usize {
        self.breaks.len() + 1
    }

    pub fn lines(&self) -> Vec<&str> {
        split_lines(&self.text)
    }

    /// Line `number` (1-based) without its line break
    pub fn line(&self, number: usize) -> Option<&str> {
        if number == 0 || number > self.line_count() {
            return None;
        }
        let start = if number == 1 {
            0
        } else {
            self.breaks[number - 2].end()
        };
        let end = self
            .breaks
            .get(number - 1)
            .map(|lb| lb.offset)
            .unwrap_or(self.text.len());
        Some(&self.text[start..end])
    }

    /// Position of a byte offset, `None` past the end of the text
    pub fn position_at(&self, offset: usize) -> Option<Position> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return None;
        }
        let line_index = self.breaks.partition_point(|lb| lb.end() <= offset);
        let line_start = if line_index == 0 {
            0
        } else {
            self.breaks[line_index - 1].end()
        };
        let column = self.text[line_start..offset].chars().count();
        Some(Position::new(line_index + 1, column))
    }

    /// Lines with the text of the given comment ranges removed. Line breaks
    /// inside block comments are kept so line numbers stay aligned.
    pub fn lines_with_comments_removed(&self, comments: &[Range<usize>]) -> Vec<String> {
        let mut stripped = String::with_capacity(self.text.len());
        let mut ranges = comments.iter().peekable();
        for (offset, ch) in self.text.char_indices() {
            while ranges.peek().is_some_and(|r| r.end <= offset) {
                ranges.next();
            }
            let in_comment = ranges.peek().is_some_and(|r| r.start <= offset);
            if !in_comment || ch == '\n' || ch == '\r' {
                stripped.push(ch);
            }
        }
        split_lines(&stripped)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks_mixed() {
        let breaks = line_breaks("a\r\nb\rc\nd");
        let texts: Vec<_> = breaks.iter().map(|lb| lb.text).collect();
        assert_eq!(texts, vec!["\r\n", "\r", "\n"]);
        assert_eq!(breaks[0].offset, 1);
        assert_eq!(breaks[1].offset, 4);
    }

    #[test]
    fn test_dominant_line_break() {
        assert_eq!(dominant_line_break("a\r\nb\nc"), "\r\n");
        assert_eq!(dominant_line_break("single line"), "\n");
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\r\nb\rc\n"), vec!["a", "b", "c", ""]);
        assert_eq!(
            split_lines_inclusive("  \n\t"),
            vec![("  ", "\n"), ("\t", "")]
        );
    }

    #[test]
    fn test_cursor_handles_crlf_split_across_calls() {
        let mut cursor = Cursor::new();
        cursor.advance("ab\r");
        cursor.advance("\ncd");
        assert_eq!(cursor.position(), Position::new(2, 2));
    }

    #[test]
    fn test_position_at() {
        let buffer = SourceBuffer::new("ab\ncd\r\nef");
        assert_eq!(buffer.position_at(0), Some(Position::new(1, 0)));
        assert_eq!(buffer.position_at(4), Some(Position::new(2, 1)));
        assert_eq!(buffer.position_at(7), Some(Position::new(3, 0)));
        assert_eq!(buffer.position_at(100), None);
    }

    #[test]
    fn test_line_lookup() {
        let buffer = SourceBuffer::new("one\ntwo\n");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line(1), Some("one"));
        assert_eq!(buffer.line(2), Some("two"));
        assert_eq!(buffer.line(3), Some(""));
        assert_eq!(buffer.line(4), None);
        assert_eq!(buffer.line(0), None);
    }

    #[test]
    fn test_lines_with_comments_removed() {
        let source = "a = 1; // note\n/* one\ntwo */ b";
        let buffer = SourceBuffer::new(source);
        let line_comment = 7..14;
        let block_comment = 15..28;
        let lines = buffer.lines_with_comments_removed(&[line_comment, block_comment]);
        assert_eq!(lines, vec!["a = 1; ", "", " b"]);
    }
}
