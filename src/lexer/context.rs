// src/lexer/context.rs
//! The view of the engine a rule action gets while it runs.

use serde::{Deserialize, Serialize};

use super::{
    diagnostics::{Diagnostic, ErrorCode, Reporter, Severity},
    error::ScanError,
    fold::CaseFold,
    position::Position,
    source::ByteSource,
    stacks::{Frame, ModeStack},
    tables::{Mode, StateId, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Where the match began.
    pub pos: Position,
    /// Length of the match in source bytes.
    pub len: usize,
    /// Token text; the matched bytes unless the action supplied its own.
    pub text: Vec<u8>,
}

impl Token {
    pub fn eof(pos: Position) -> Self {
        Self {
            kind: TokenKind::EOF,
            pos,
            len: 0,
            text: Vec::new(),
        }
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.kind.is_eof()
    }

    pub fn text_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }
}

pub struct ScanContext<'a> {
    pub(crate) frame: &'a mut Frame,
    pub(crate) modes: &'a mut ModeStack,
    pub(crate) reporter: &'a mut dyn Reporter,
    pub(crate) fold: CaseFold,
    pub(crate) pos: Position,
    pub(crate) state: StateId,
    pub(crate) pushed: Option<Box<dyn ByteSource>>,
    pub(crate) file_depth: usize,
}

impl<'a> ScanContext<'a> {
    /// Bytes of the current match.
    #[inline]
    pub fn text(&self) -> &[u8] {
        self.frame.buffer.text()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frame.buffer.token_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the first byte of the match.
    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    /// The accepting automaton state.
    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn source_name(&self) -> &str {
        &self.frame.name
    }

    /// Number of suspended sources below the current one.
    pub fn file_depth(&self) -> usize {
        self.file_depth
    }

    pub fn token(&self, kind: impl Into<TokenKind>) -> Token {
        Token {
            kind: kind.into(),
            pos: self.pos,
            len: self.len(),
            text: self.text().to_vec(),
        }
    }

    pub fn token_with_text(&self, kind: impl Into<TokenKind>, text: impl Into<Vec<u8>>) -> Token {
        Token {
            kind: kind.into(),
            pos: self.pos,
            len: self.len(),
            text: text.into(),
        }
    }

    pub fn word(&self) -> Vec<u8> {
        self.text().to_vec()
    }

    pub fn lower(&self) -> Vec<u8> {
        self.fold.to_lower(self.text())
    }

    pub fn upper(&self) -> Vec<u8> {
        self.fold.to_upper(self.text())
    }

    pub fn mode(&self) -> Mode {
        self.modes.current()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.modes.set(mode);
    }

    /// Return to the mode that was active before the last switch.
    pub fn previous_mode(&mut self) {
        self.modes.swap_previous();
    }

    pub fn push_mode(&mut self, mode: Mode) -> Result<(), ScanError> {
        self.modes.push(mode)
    }

    pub fn pop_mode(&mut self) -> Result<Mode, ScanError> {
        self.modes.pop()
    }

    pub fn mode_depth(&self) -> usize {
        self.modes.depth()
    }

    /// Keep only the first `n` bytes of the match; the rest is scanned again.
    pub fn less(&mut self, n: usize) {
        self.frame.buffer.give_back(n);
    }

    /// Put `byte` in front of the remaining input. Bytes pushed back in
    /// front of the match start are not line-counted. Fails with an internal
    /// error once the buffer has no room left in front of the cursor.
    pub fn unput(&mut self, byte: u8) -> Result<(), ScanError> {
        self.frame.buffer.unread(byte)
    }

    /// Consume the next raw input byte, bypassing the automaton. The match
    /// text is not guaranteed to survive a call that reaches the end of the
    /// buffered window.
    pub fn input(&mut self) -> Option<u8> {
        let (b, err) = self.frame.read_byte();
        if let Some(e) = err {
            self.report(ErrorCode::ReadFailure, e.to_string());
        }
        b
    }

    /// Start scanning `source` once this action returns. The current source
    /// resumes after it is exhausted.
    pub fn push_source(&mut self, source: impl ByteSource + 'static) {
        self.pushed = Some(Box::new(source));
    }

    /// Report a recoverable problem at the match position.
    pub fn report(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.reporter.report(Diagnostic {
            code,
            severity: Severity::Error,
            pos: self.pos,
            source: self.frame.name.clone(),
            message: message.into(),
        });
    }

    /// Build the error an action returns to end the session. The scanner
    /// reports it.
    pub fn fatal(&self, code: ErrorCode, message: impl Into<String>) -> ScanError {
        ScanError::Fatal {
            code,
            pos: self.pos,
            message: message.into(),
        }
    }

    pub fn unterminated(&self, construct: impl Into<String>) -> ScanError {
        ScanError::Unterminated {
            construct: construct.into(),
            pos: self.pos,
        }
    }
}
