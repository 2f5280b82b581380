// src/lexer/position.rs
//! Line/column/offset bookkeeping.
//!
//! Positions are not maintained per byte. The tracker remembers how far it
//! has looked (`tracked`) and catches up over the bytes of a token when
//! that token is accepted, or right before buffered bytes are discarded.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line.
    pub line: u32,
    /// 1-based column, with tabs expanded.
    pub column: u32,
    /// 0-based byte offset from the start of the source.
    pub offset: u64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Buffer-relative line bookkeeping for one input source.
#[derive(Debug, Clone)]
pub struct LineTracker {
    pub line: u32,
    /// Index of the byte just before the first column of the current line.
    /// Signed: tab expansion and relocation may move it before index 0.
    pub line_start: isize,
    /// Bytes before this index have been accounted for.
    pub tracked: usize,
    tab_width: u32,
}

impl LineTracker {
    pub fn new(first_byte: usize, tab_width: u32) -> Self {
        Self {
            line: 1,
            line_start: first_byte as isize - 1,
            tracked: first_byte,
            tab_width: tab_width.max(1),
        }
    }

    #[inline]
    pub fn column_of(&self, index: usize) -> u32 {
        (index as isize - self.line_start).max(1) as u32
    }

    #[inline]
    pub fn position_of(&self, index: usize, offset: u64) -> Position {
        Position {
            line: self.line,
            column: self.column_of(index),
            offset,
        }
    }

    /// Account for `data[self.tracked..to]`.
    pub fn track(&mut self, data: &[u8], to: usize) {
        if to <= self.tracked {
            return;
        }
        let from = self.tracked;
        let chunk = &data[from..to];
        // Only the last line of the chunk matters for line_start.
        let tail_from = match memchr::memrchr(b'\n', chunk) {
            Some(nl) => {
                self.line += memchr::memchr_iter(b'\n', chunk).count() as u32;
                self.line_start = (from + nl) as isize;
                from + nl + 1
            }
            None => from,
        };
        for i in memchr::memchr_iter(b'\t', &data[tail_from..to]) {
            self.expand_tab(tail_from + i);
        }
        self.tracked = to;
    }

    fn expand_tab(&mut self, at: usize) {
        let width = self.tab_width as isize;
        let col0 = at as isize - self.line_start - 1;
        let next_stop = (col0 / width + 1) * width;
        self.line_start -= next_stop - (col0 + 1);
    }

    /// Re-base after the buffer contents moved by `delta` bytes.
    pub fn shift(&mut self, delta: isize) {
        self.line_start += delta;
        self.tracked = (self.tracked as isize + delta).max(0) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_all(src: &[u8], tab: u32) -> LineTracker {
        let mut t = LineTracker::new(0, tab);
        t.track(src, src.len());
        t
    }

    #[test]
    fn first_byte_is_column_one() {
        let t = LineTracker::new(8, 8);
        assert_eq!(t.position_of(8, 0), Position { line: 1, column: 1, offset: 0 });
        assert_eq!(t.column_of(11), 4);
    }

    #[test]
    fn newlines_bump_line_and_reset_column() {
        let t = track_all(b"ab\ncd\nef", 8);
        assert_eq!(t.line, 3);
        assert_eq!(t.column_of(6), 1);
        assert_eq!(t.column_of(7), 2);
    }

    #[test]
    fn tabs_advance_to_next_stop() {
        let src = b"\tx";
        let t = track_all(&src[..1], 8);
        assert_eq!(t.column_of(1), 9);

        let src = b"ab\tx";
        let t = track_all(&src[..3], 4);
        assert_eq!(t.column_of(3), 5);

        // a tab sitting exactly on a stop still moves a full width
        let src = b"abcd\tx";
        let t = track_all(&src[..5], 4);
        assert_eq!(t.column_of(5), 9);
    }

    #[test]
    fn tabs_before_a_newline_are_forgotten() {
        let t = track_all(b"\t\t\nab", 8);
        assert_eq!(t.line, 2);
        assert_eq!(t.column_of(4), 2);
    }

    #[test]
    fn non_power_of_two_tab_width() {
        let t = track_all(b"a\t", 3);
        assert_eq!(t.column_of(2), 4);
    }

    #[test]
    fn shift_moves_marks_together() {
        let mut t = track_all(b"xx\nyy", 8);
        let col = t.column_of(4);
        t.shift(-3);
        assert_eq!(t.column_of(1), col);
        assert_eq!(t.tracked, 2);
    }
}
