// change.rs: Raw host edits, attribution ranges and offset→position mapping.
//
// Offsets are measured in characters (Unicode scalar values) of the
// document text. Hosts that count in other units must convert before
// handing changes to the engine.

use serde::{Deserialize, Serialize};

/// One atomic edit reported by the host for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChange {
    /// Text inserted at `start_offset` (empty for pure deletions).
    pub inserted_text: String,
    /// Number of characters replaced by the insertion (0 for pure inserts).
    #[serde(default)]
    pub replaced_length: usize,
    /// Offset in the pre-change document where the edit starts.
    pub start_offset: usize,
}

impl RawChange {
    pub fn new(inserted_text: impl Into<String>, replaced_length: usize, start_offset: usize) -> Self {
        Self {
            inserted_text: inserted_text.into(),
            replaced_length,
            start_offset,
        }
    }

    /// Length of the inserted text in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// The span the inserted text occupies after the edit.
    pub fn inserted_range(&self) -> AttributionRange {
        AttributionRange::new(self.start_offset, self.start_offset + self.inserted_len())
    }
}

/// Half-open span `[start_offset, end_offset)` within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributionRange {
    pub start_offset: usize,
    pub end_offset: usize,
}

impl AttributionRange {
    /// Build a range; a reversed pair is normalized so `start <= end`.
    pub fn new(start_offset: usize, end_offset: usize) -> Self {
        if end_offset < start_offset {
            Self {
                start_offset: end_offset,
                end_offset: start_offset,
            }
        } else {
            Self {
                start_offset,
                end_offset,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

/// Zero-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A range expressed as start/end positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: Position,
    pub end: Position,
}

impl LineSpan {
    /// Number of lines touched, counting partial first and last lines.
    pub fn line_count(&self) -> usize {
        self.end.line.abs_diff(self.start.line) + 1
    }
}

/// Character offsets of every line start in a document.
///
/// Built once per evaluation from the document text; lookups are a
/// binary search.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut len = 0;
        for (i, c) in text.chars().enumerate() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
            len = i + 1;
        }
        Self { line_starts, len }
    }

    /// Position of `offset`, clamped to the end of the document.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position {
            line,
            column: offset - self.line_starts[line],
        }
    }

    pub fn span(&self, range: AttributionRange) -> LineSpan {
        LineSpan {
            start: self.position(range.start_offset),
            end: self.position(range.end_offset),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_range_counts_characters_not_bytes() {
        let change = RawChange::new("héllo→", 0, 10);
        assert_eq!(change.inserted_len(), 6);
        assert_eq!(change.inserted_range(), AttributionRange::new(10, 16));
    }

    #[test]
    fn reversed_range_is_normalized() {
        let r = AttributionRange::new(9, 3);
        assert_eq!(r.start_offset, 3);
        assert_eq!(r.end_offset, 9);
        assert_eq!(r.len(), 6);
        assert!(!r.is_empty());
        assert!(AttributionRange::new(4, 4).is_empty());
    }

    #[test]
    fn line_index_positions() {
        let index = LineIndex::new("ab\ncd\n\nefg");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.position(0), Position { line: 0, column: 0 });
        assert_eq!(index.position(2), Position { line: 0, column: 2 });
        assert_eq!(index.position(3), Position { line: 1, column: 0 });
        assert_eq!(index.position(6), Position { line: 2, column: 0 });
        assert_eq!(index.position(8), Position { line: 3, column: 1 });
    }

    #[test]
    fn line_index_clamps_past_end() {
        let index = LineIndex::new("abc");
        assert_eq!(index.position(99), Position { line: 0, column: 3 });
    }

    #[test]
    fn span_line_count() {
        let text = "function foo() {\n  return 1;\n}";
        let index = LineIndex::new(text);
        let span = index.span(AttributionRange::new(0, text.chars().count()));
        assert_eq!(span.start, Position { line: 0, column: 0 });
        assert_eq!(span.end, Position { line: 2, column: 1 });
        assert_eq!(span.line_count(), 3);
    }

    #[test]
    fn raw_change_deserializes_without_replaced_length() {
        let change: RawChange =
            serde_json::from_str(r#"{"inserted_text":"x;","start_offset":4}"#).unwrap();
        assert_eq!(change, RawChange::new("x;", 0, 4));
    }
}
