//! Source position tracking for qweb templates and the code generated from them.
//!
//! Templates are addressed by byte [`Span`]s. Generated code is built line by
//! line with a [`CodeBuilder`]; every line may remember the template span it
//! was emitted for, so a failure on generated line `n` can be reported at the
//! template location that produced it.

use std::ops::Range;

/// A span in the source code, representing a half-open range [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// Start offset (inclusive)
    pub start: u32,
    /// End offset (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span from start and end offsets.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create an empty span at the given offset.
    #[inline]
    pub const fn empty(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Create a span from a range.
    #[inline]
    pub fn from_range(range: Range<usize>) -> Self {
        Self {
            start: range.start as u32,
            end: range.end as u32,
        }
    }

    /// Get the length of the span.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Convert to a Range<usize>.
    #[inline]
    pub fn to_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// A line index for converting between byte offsets and line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of the start of each line.
    line_starts: Vec<u32>,
    /// Total length of the source.
    len: u32,
}

impl LineIndex {
    /// Create a new line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self {
            line_starts,
            len: text.len() as u32,
        }
    }

    /// Get the line and column for a byte offset.
    /// Line and column are 0-indexed.
    pub fn line_col(&self, offset: u32) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        LineCol {
            line: line as u32,
            col: offset - line_start,
        }
    }
}

/// A line and column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed column (byte offset within line).
    pub col: u32,
}

impl LineCol {
    /// Create a new line/column position.
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Convert to 1-indexed for display.
    #[inline]
    pub const fn to_display(self) -> (u32, u32) {
        (self.line + 1, self.col + 1)
    }
}

/// One line of generated code, before indentation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    /// Indentation depth in levels.
    pub indent: u32,
    /// Line text without leading indentation.
    pub text: String,
    /// Template span this line was generated for.
    pub origin: Option<Span>,
}

impl CodeLine {
    /// Create an unmapped line.
    pub fn new(indent: u32, text: impl Into<String>) -> Self {
        Self {
            indent,
            text: text.into(),
            origin: None,
        }
    }

    /// Attach a template span to this line.
    pub fn with_origin(mut self, origin: Option<Span>) -> Self {
        self.origin = origin;
        self
    }
}

/// Maps 1-based generated line numbers to template spans.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceMap {
    origins: Vec<Option<Span>>,
}

impl SourceMap {
    /// Create a new empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the origin of the next generated line.
    pub fn push(&mut self, origin: Option<Span>) {
        self.origins.push(origin);
    }

    /// Origin recorded for exactly this line.
    pub fn origin(&self, line: u32) -> Option<Span> {
        let index = (line as usize).checked_sub(1)?;
        self.origins.get(index).copied().flatten()
    }

    /// Origin of this line, or of the closest mapped line above it.
    ///
    /// Control lines such as `else:` carry no origin of their own; the
    /// enclosing node's span is the useful answer for them.
    pub fn nearest_origin(&self, line: u32) -> Option<Span> {
        let end = (line as usize).min(self.origins.len());
        self.origins[..end].iter().rev().find_map(|origin| *origin)
    }

    /// Check if the source map is empty.
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Get the number of generated lines.
    pub fn len(&self) -> usize {
        self.origins.len()
    }
}

/// Builder for generated code with a per-line source map.
#[derive(Debug)]
pub struct CodeBuilder {
    /// The generated code.
    code: String,
    /// The source map.
    source_map: SourceMap,
    /// Text of one indentation level.
    indent_unit: &'static str,
}

impl Default for CodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBuilder {
    /// Create a new code builder indenting with four spaces.
    pub fn new() -> Self {
        Self {
            code: String::new(),
            source_map: SourceMap::new(),
            indent_unit: "    ",
        }
    }

    /// Append one line.
    pub fn push_line(&mut self, line: &CodeLine) {
        for _ in 0..line.indent {
            self.code.push_str(self.indent_unit);
        }
        self.code.push_str(&line.text);
        self.code.push('\n');
        self.source_map.push(line.origin);
    }

    /// Append every line in order.
    pub fn extend<'a>(&mut self, lines: impl IntoIterator<Item = &'a CodeLine>) {
        for line in lines {
            self.push_line(line);
        }
    }

    /// Consume the builder and return the code and source map.
    pub fn finish(self) -> (String, SourceMap) {
        (self.code, self.source_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_span() {
        let span = Span::new(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::empty(4).is_empty());
        assert_eq!(Span::from_range(3..7).to_range(), 3..7);
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(10, 20).merge(Span::new(15, 30));
        assert_eq!(merged, Span::new(10, 30));
    }

    #[test]
    fn test_line_index() {
        let text = "hello\nworld\nfoo";
        let index = LineIndex::new(text);

        assert_eq!(index.line_col(0), LineCol::new(0, 0));
        assert_eq!(index.line_col(5), LineCol::new(0, 5));
        assert_eq!(index.line_col(6), LineCol::new(1, 0));
        assert_eq!(index.line_col(12), LineCol::new(2, 0));
        assert_eq!(index.line_col(99), LineCol::new(2, 3));
        assert_eq!(LineCol::new(1, 0).to_display(), (2, 1));
    }

    #[test]
    fn test_code_builder() {
        let mut builder = CodeBuilder::new();
        builder.push_line(&CodeLine::new(0, "def f(self, values, log):"));
        builder.push_line(&CodeLine::new(1, "yield 'a'").with_origin(Some(Span::new(3, 9))));
        builder.push_line(&CodeLine::new(1, "if x:"));
        builder.push_line(&CodeLine::new(2, "pass"));

        let (code, map) = builder.finish();
        assert_eq!(
            code,
            "def f(self, values, log):\n    yield 'a'\n    if x:\n        pass\n"
        );
        assert_eq!(map.len(), 4);
        assert_eq!(map.origin(1), None);
        assert_eq!(map.origin(2), Some(Span::new(3, 9)));
        assert_eq!(map.origin(4), None);
        assert_eq!(map.nearest_origin(4), Some(Span::new(3, 9)));
        assert_eq!(map.nearest_origin(1), None);
        assert_eq!(map.origin(0), None);
    }
}
