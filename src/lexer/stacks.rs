// src/lexer/stacks.rs
//! Mode stack (nested lexical modes) and file stack (nested input sources).

use std::io;

use super::{
    buffer::{InputBuffer, Refill},
    config::ScannerConfig,
    error::ScanError,
    position::{LineTracker, Position},
    source::ByteSource,
    tables::Mode,
};

/// Current lexical mode plus the modes saved by `push`.
#[derive(Debug, Clone)]
pub struct ModeStack {
    current: Mode,
    previous: Mode,
    saved: Vec<Mode>,
}

impl ModeStack {
    pub fn new(initial: Mode, capacity: usize) -> Self {
        Self {
            current: initial,
            previous: initial,
            saved: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn current(&self) -> Mode {
        self.current
    }

    pub fn previous(&self) -> Mode {
        self.previous
    }

    /// Switch modes without saving; the old mode becomes `previous`.
    pub fn set(&mut self, mode: Mode) {
        self.previous = self.current;
        self.current = mode;
    }

    /// Toggle back to the mode active before the last switch.
    pub fn swap_previous(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    pub fn push(&mut self, mode: Mode) -> Result<(), ScanError> {
        self.saved.try_reserve(1)?;
        self.saved.push(self.current);
        self.set(mode);
        log::trace!("mode push {:?} (depth {})", mode, self.saved.len());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Mode, ScanError> {
        let restored = self.saved.pop().ok_or(ScanError::ModeStackUnderflow)?;
        self.set(restored);
        log::trace!("mode pop -> {:?} (depth {})", restored, self.saved.len());
        Ok(restored)
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn reset(&mut self, initial: Mode) {
        self.current = initial;
        self.previous = initial;
        self.saved.clear();
    }
}

/// Suspended sources, innermost last.
#[derive(Debug)]
pub struct FileStack<T> {
    frames: Vec<T>,
}

impl<T> FileStack<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, frame: T) -> Result<(), ScanError> {
        self.frames.try_reserve(1)?;
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<T, ScanError> {
        self.frames.pop().ok_or(ScanError::FileStackUnderflow)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Everything that belongs to one open input source. Suspending a source
/// moves its frame onto the file stack unchanged; resuming moves it back.
pub struct Frame {
    pub source: Box<dyn ByteSource>,
    pub name: String,
    pub buffer: InputBuffer,
    pub lines: LineTracker,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("name", &self.name)
            .field("cursor", &self.buffer.cursor)
            .field("line", &self.lines.line)
            .finish_non_exhaustive()
    }
}

impl Frame {
    pub fn new(source: Box<dyn ByteSource>, config: &ScannerConfig) -> Result<Self, ScanError> {
        let buffer = InputBuffer::new(config.buffer_size)?;
        let lines = LineTracker::new(buffer.window_start(), config.tab_width);
        let name = source.name().to_string();
        Ok(Self {
            source,
            name,
            buffer,
            lines,
        })
    }

    /// Position of buffer index `i`, counting lines up to it first.
    pub fn position_at(&mut self, i: usize) -> Position {
        self.lines.track(self.buffer.data(), i);
        self.lines.position_of(i, self.buffer.offset_of(i))
    }

    /// Refill keeping the current token; every mark follows the relocation.
    pub fn refill(&mut self) -> Result<Refill, ScanError> {
        // bytes before the token are about to be dropped
        self.lines.track(self.buffer.data(), self.buffer.token_start);
        let r = self.buffer.refill(&mut self.source)?;
        self.lines.shift(r.delta);
        Ok(r)
    }

    /// Consume one raw byte, loading a fresh window if needed. `None` at end
    /// of input. A read failure ends the input and is handed back.
    pub fn read_byte(&mut self) -> (Option<u8>, Option<io::Error>) {
        let mut error = None;
        if self.buffer.cursor >= self.buffer.fill_end() {
            if self.buffer.is_eof() {
                return (None, None);
            }
            let end = self.buffer.fill_end();
            self.lines.track(self.buffer.data(), end);
            let r = self.buffer.restart_window(&mut self.source);
            self.lines.shift(r.delta);
            error = r.error;
            if r.bytes_read == 0 {
                return (None, error);
            }
        }
        let b = self.buffer.byte(self.buffer.cursor);
        self.buffer.cursor += 1;
        (Some(b), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::source::MemorySource;

    #[test]
    fn mode_push_pop_restores() {
        let mut m = ModeStack::new(Mode(1), 4);
        m.push(Mode(3)).unwrap();
        m.push(Mode(5)).unwrap();
        assert_eq!(m.current(), Mode(5));
        assert_eq!(m.depth(), 2);
        assert_eq!(m.pop().unwrap(), Mode(3));
        assert_eq!(m.pop().unwrap(), Mode(1));
        assert!(matches!(m.pop(), Err(ScanError::ModeStackUnderflow)));
    }

    #[test]
    fn set_and_swap_previous() {
        let mut m = ModeStack::new(Mode(1), 0);
        m.set(Mode(3));
        assert_eq!(m.previous(), Mode(1));
        m.swap_previous();
        assert_eq!(m.current(), Mode(1));
        assert_eq!(m.previous(), Mode(3));
        assert_eq!(m.depth(), 0);
    }

    #[test]
    fn file_stack_underflow() {
        let mut s: FileStack<u8> = FileStack::new(1);
        s.push(7).unwrap();
        assert_eq!(s.pop().unwrap(), 7);
        assert!(matches!(s.pop(), Err(ScanError::FileStackUnderflow)));
    }

    #[test]
    fn read_byte_walks_through_windows() {
        let cfg = ScannerConfig::default().with_buffer_size(32);
        let text: Vec<u8> = (0..100u8).map(|i| b'a' + i % 26).collect();
        let mut f = Frame::new(Box::new(MemorySource::new(text.clone())), &cfg).unwrap();
        let mut got = Vec::new();
        while let (Some(b), None) = f.read_byte() {
            got.push(b);
        }
        assert_eq!(got, text);
        assert_eq!(f.buffer.offset_of(f.buffer.cursor), 100);
    }
}
