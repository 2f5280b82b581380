// src/lexer/buffer.rs
//! Sliding input window with sentinel bytes.
//!
//! Layout of the owned allocation:
//!
//! ```text
//! [ .. prefix .. | ctx | token bytes .. | fresh bytes .. | EOB | 0 | free .. ]
//!                  ^     ^                ^                ^
//!         start - 1 (or  token_start      start            fill_end()
//!         token_start-1)
//! ```
//!
//! The scanner never bounds-checks while walking: reaching `fill_end()`
//! reads the `EOB_BYTE` sentinel, which the table routes to the
//! end-of-buffer state. Only then is the window refilled. All positions are
//! indices into the allocation, so growing it never invalidates them; a
//! relocation reports the index delta so callers can shift their marks.

use std::io;

use super::{error::ScanError, source::ByteSource, tables::EOB_BYTE};

/// Alignment of the window start, and size of the prefix before it.
pub const MAX_ALIGN: usize = 8;

/// Smallest window that still leaves room for the prefix, both sentinels
/// and a useful read.
pub const MIN_BUFFER_SIZE: usize = 32;

/// Result of one refill.
#[derive(Debug)]
pub struct Refill {
    /// Every index at or after the old token start moved by this much.
    pub delta: isize,
    pub bytes_read: usize,
    /// Set when the source failed; the source is then treated as exhausted.
    pub error: Option<io::Error>,
}

#[derive(Debug, Clone)]
pub struct InputBuffer {
    data: Vec<u8>,
    start: usize,
    bytes_read: usize,
    file_offset: u64,
    eof: bool,
    /// Next unread byte.
    pub cursor: usize,
    /// First byte of the token being matched.
    pub token_start: usize,
}

#[inline]
fn pow2_floor(x: usize) -> usize {
    if x == 0 { 0 } else { 1 << (usize::BITS - 1 - x.leading_zeros()) }
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Result<Self, ScanError> {
        let capacity = capacity.max(MIN_BUFFER_SIZE);
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ScanError::OutOfMemory { requested: capacity })?;
        data.resize(capacity, 0);
        let start = MAX_ALIGN;
        // Begin-of-line indicator, then an empty window.
        data[start - 1] = b'\n';
        data[start] = EOB_BYTE;
        data[start + 1] = 0;
        Ok(Self {
            data,
            start,
            bytes_read: 0,
            file_offset: 0,
            eof: false,
            cursor: start,
            token_start: start,
        })
    }

    #[inline]
    pub fn byte(&self, i: usize) -> u8 {
        self.data[i]
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Index of the end-of-buffer sentinel.
    #[inline]
    pub fn fill_end(&self) -> usize {
        self.start + self.bytes_read
    }

    pub fn window_start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    #[inline]
    pub fn token_len(&self) -> usize {
        self.cursor - self.token_start
    }

    #[inline]
    pub fn text(&self) -> &[u8] {
        &self.data[self.token_start..self.cursor]
    }

    /// Source byte offset of index `i`.
    #[inline]
    pub fn offset_of(&self, i: usize) -> u64 {
        (self.file_offset as i64 + i as i64 - self.start as i64).max(0) as u64
    }

    /// The byte right before index `i` (the line-start indicator for `i == start`).
    #[inline]
    pub fn preceding(&self, i: usize) -> u8 {
        self.data[i.saturating_sub(1)]
    }

    fn grow(&mut self) -> Result<(), ScanError> {
        let old = self.data.len();
        let new = old
            .checked_mul(2)
            .ok_or(ScanError::OutOfMemory { requested: usize::MAX })?;
        self.data
            .try_reserve_exact(new - old)
            .map_err(|_| ScanError::OutOfMemory { requested: new })?;
        self.data.resize(new, 0);
        log::debug!("input buffer grown {old} -> {new} bytes");
        Ok(())
    }

    fn read_into(&mut self, source: &mut dyn ByteSource, free: usize) -> (usize, Option<io::Error>) {
        let window = &mut self.data[self.start..self.start + free];
        let (n, err) = match source.read_bytes(window) {
            Ok(n) => (n.min(free), None),
            Err(e) => (0, Some(e)),
        };
        self.bytes_read = n;
        if n == 0 {
            self.eof = true;
        }
        self.data[self.start + n] = EOB_BYTE;
        self.data[self.start + n + 1] = 0;
        (n, err)
    }

    /// Load more input while keeping the in-flight token (and the byte before
    /// it) contiguous. Must be called with `cursor == fill_end()`.
    pub fn refill(&mut self, source: &mut dyn ByteSource) -> Result<Refill, ScanError> {
        debug_assert_eq!(self.cursor, self.fill_end());
        let token_len = self.cursor - self.token_start;
        let old_cursor = self.cursor;
        let from = self.token_start - 1;
        // Chosen so the new window start lands on a MAX_ALIGN boundary.
        let target = (MAX_ALIGN - 1).wrapping_sub(token_len) & (MAX_ALIGN - 1);

        let delta = if from > target {
            self.data.copy_within(from..old_cursor, target);
            self.token_start = target + 1;
            self.start = target + (old_cursor - from);
            self.start as isize - old_cursor as isize
        } else {
            self.start = old_cursor;
            0
        };

        let reserve = 4 + MAX_ALIGN + token_len;
        let mut free = pow2_floor(self.data.len().saturating_sub(reserve));
        while free == 0 || free < self.data.len() >> 3 {
            self.grow()?;
            free = pow2_floor(self.data.len().saturating_sub(reserve));
        }

        self.file_offset += self.bytes_read as u64;
        self.cursor = self.start;
        let (bytes_read, error) = self.read_into(source, free);
        log::trace!(
            "refill: kept {token_len} token bytes, read {bytes_read}, window {}..{}",
            self.start,
            self.fill_end()
        );
        Ok(Refill {
            delta,
            bytes_read,
            error,
        })
    }

    /// Discard the whole window and load fresh input at the front of the
    /// allocation. Used by single-byte reads that run past the window; the
    /// current token's text does not survive.
    pub fn restart_window(&mut self, source: &mut dyn ByteSource) -> Refill {
        let old_end = self.fill_end();
        let last = self.preceding(old_end);
        self.start = MAX_ALIGN;
        self.data[self.start - 1] = last;
        self.file_offset += self.bytes_read as u64;
        self.cursor = self.start;
        self.token_start = self.start;
        let free = pow2_floor(self.data.len() - MAX_ALIGN - 4);
        let (bytes_read, error) = self.read_into(source, free);
        Refill {
            delta: self.start as isize - old_end as isize,
            bytes_read,
            error,
        }
    }

    /// Push one byte back in front of the cursor. Index 0 stays free: a
    /// refill needs the byte before the token as line-start context.
    pub fn unread(&mut self, byte: u8) -> Result<(), ScanError> {
        if self.cursor <= 1 {
            return Err(ScanError::Internal {
                state: 0,
                detail: "pushback overflow",
            });
        }
        self.cursor -= 1;
        self.data[self.cursor] = byte;
        self.token_start = self.token_start.min(self.cursor);
        Ok(())
    }

    /// Shrink the current token to its first `n` bytes.
    pub fn give_back(&mut self, n: usize) {
        let keep = n.min(self.token_len());
        self.cursor = self.token_start + keep;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::source::MemorySource;

    #[test]
    fn fresh_buffer_is_an_empty_window_at_line_start() {
        let b = InputBuffer::new(64).unwrap();
        assert_eq!(b.fill_end(), MAX_ALIGN);
        assert_eq!(b.byte(b.cursor), EOB_BYTE);
        assert_eq!(b.preceding(b.cursor), b'\n');
        assert!(!b.is_eof());
    }

    #[test]
    fn refill_writes_both_sentinels() {
        let mut b = InputBuffer::new(64).unwrap();
        let mut src = MemorySource::new("abc");
        let r = b.refill(&mut src).unwrap();
        assert_eq!(r.bytes_read, 3);
        assert_eq!(&b.data()[b.cursor..b.cursor + 3], b"abc");
        assert_eq!(b.byte(b.fill_end()), EOB_BYTE);
        assert_eq!(b.byte(b.fill_end() + 1), 0);
    }

    #[test]
    fn refill_keeps_partial_token_contiguous() {
        let mut b = InputBuffer::new(MIN_BUFFER_SIZE).unwrap();
        let mut src = MemorySource::new("xhello world");
        b.refill(&mut src).unwrap();
        let first = b.fill_end() - b.cursor;
        // pretend "x" was a finished token and the rest of the window is a
        // token still being matched
        b.token_start = b.cursor + 1;
        b.cursor = b.fill_end();
        let partial = b.text().to_vec();
        let before = b.offset_of(b.token_start);
        let r = b.refill(&mut src).unwrap();
        assert!(r.bytes_read > 0);
        let text = &b.data()[b.token_start..b.fill_end()];
        assert!(text.starts_with(&partial));
        assert_eq!(&text[..partial.len() + 1], &b"xhello world"[1..first + 1]);
        assert_eq!(b.offset_of(b.token_start), before);
        assert_eq!(b.preceding(b.token_start), b'x');
    }

    #[test]
    fn growth_when_token_fills_most_of_the_window() {
        let mut b = InputBuffer::new(MIN_BUFFER_SIZE).unwrap();
        let long = "a".repeat(200);
        let mut src = MemorySource::new(long.clone());
        b.refill(&mut src).unwrap();
        while !b.is_eof() {
            b.cursor = b.fill_end();
            b.refill(&mut src).unwrap();
        }
        assert!(b.capacity() > MIN_BUFFER_SIZE);
        assert_eq!(&b.data()[b.token_start..b.fill_end()], long.as_bytes());
    }

    #[test]
    fn give_back_and_unread() {
        let mut b = InputBuffer::new(64).unwrap();
        let mut src = MemorySource::new("aaab");
        b.refill(&mut src).unwrap();
        b.cursor += 3;
        b.give_back(1);
        assert_eq!(b.text(), b"a");
        b.unread(b'z').unwrap();
        assert_eq!(b.byte(b.cursor), b'z');
        assert_eq!(b.token_len(), 0);
    }

    #[test]
    fn unread_stops_short_of_the_first_slot() {
        let mut b = InputBuffer::new(64).unwrap();
        let mut src = MemorySource::new("xy");
        b.refill(&mut src).unwrap();
        b.cursor += 1;
        let mut pushed = 0;
        while b.unread(b'u').is_ok() {
            pushed += 1;
        }
        assert_eq!(pushed, MAX_ALIGN);
        assert_eq!((b.cursor, b.token_start), (1, 1));
        assert!(matches!(
            b.unread(b'u'),
            Err(ScanError::Internal { detail: "pushback overflow", .. })
        ));

        // the buffer still refills without losing the pushed bytes
        b.cursor = b.fill_end();
        b.refill(&mut src).unwrap();
        assert_eq!(b.text(), b"uuuuuuuuy");
    }

    #[test]
    fn restart_window_discards_and_reads() {
        let mut b = InputBuffer::new(64).unwrap();
        let mut src = MemorySource::new("abc\n");
        b.refill(&mut src).unwrap();
        b.cursor = b.fill_end();
        let r = b.restart_window(&mut src);
        assert_eq!(r.bytes_read, 0);
        assert!(b.is_eof());
        assert_eq!(b.preceding(b.cursor), b'\n');
        assert_eq!(b.offset_of(b.cursor), 4);
    }

    #[test]
    fn pow2_floor_values() {
        assert_eq!(pow2_floor(0), 0);
        assert_eq!(pow2_floor(1), 1);
        assert_eq!(pow2_floor(20), 16);
        assert_eq!(pow2_floor(8192), 8192);
    }
}
