//! Source locations attached to syntax nodes and diagnostics.
//!
//! The front-end fills these in; the compiler only copies them into errors.

use std::fmt;

/// Position of a syntax node in the original source text.
///
/// Lines and columns are 1-based. A default span (`0:0`) marks nodes that
/// were synthesized rather than parsed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether the span was synthesized (has no real source position).
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Extend `self` so it also covers `other`.
    ///
    /// Only same-line spans are merged precisely; across lines the start of
    /// `self` is kept and the lengths are summed.
    pub fn to(self, other: Span) -> Span {
        if self.line != other.line {
            return Span::new(self.line, self.col, self.len + other.len);
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_line_and_column() {
        assert_eq!(Span::new(12, 4, 3).to_string(), "12:4");
        assert_eq!(format!("{:?}", Span::point(1, 1)), "1:1");
    }

    #[test]
    fn default_span_is_synthetic() {
        assert!(Span::default().is_synthetic());
        assert!(!Span::point(1, 1).is_synthetic());
    }

    #[test]
    fn to_covers_both_spans_on_one_line() {
        let merged = Span::new(2, 10, 3).to(Span::new(2, 4, 2));
        assert_eq!(merged, Span::new(2, 4, 9));
    }

    #[test]
    fn to_across_lines_keeps_start() {
        let merged = Span::new(2, 10, 3).to(Span::new(5, 1, 4));
        assert_eq!(merged, Span::new(2, 10, 7));
    }
}
