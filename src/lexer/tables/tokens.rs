// src/lexer/tables/tokens.rs

use serde::{Deserialize, Serialize};

/// Automaton state id. `NO_STATE` (0) means "no transition".
pub type StateId = u16;

pub const NO_STATE: StateId = 0;

/// Identifies the action attached to a final state.
pub type RuleId = u16;

// used in the packed tables for non-final states
pub const NO_RULE: u16 = u16::MAX;

/// Token kind as returned by the scanner. The meaning of every kind except
/// [`TokenKind::EOF`] is owned by the grammar that produced the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenKind(pub u16);

impl TokenKind {
    /// Kind 0 is reserved for end-of-input.
    pub const EOF: TokenKind = TokenKind(0);

    #[inline]
    pub fn is_eof(self) -> bool {
        self == Self::EOF
    }
}

impl From<u16> for TokenKind {
    fn from(v: u16) -> Self {
        TokenKind(v)
    }
}

/// A lexical mode (start state). Modes are ordinary automaton states that
/// the interpreter begins a token scan in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mode(pub StateId);

impl Mode {
    #[inline]
    pub fn state(self) -> StateId {
        self.0
    }

    /// The start-of-line twin of this mode (only meaningful when the table
    /// was built with start-of-line modes).
    #[inline]
    pub fn line_start(self) -> Mode {
        Mode(self.0 + 1)
    }
}
