// src/lexer/error.rs
use std::{io, path::PathBuf};

use thiserror::Error;

use super::{diagnostics::ErrorCode, position::Position, tables::StateId};

/// Conditions that end a scanning session. Recoverable problems (illegal
/// characters, read failures) never surface here; they go to the reporter.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{pos}: unterminated {construct} at end of input")]
    Unterminated { construct: String, pos: Position },

    #[error("scanner out of memory (requested {requested} bytes)")]
    OutOfMemory { requested: usize },

    #[error("start-stack underflow")]
    ModeStackUnderflow,

    #[error("file-stack underflow")]
    FileStackUnderflow,

    #[error("internal scanner error: {detail} (state {state})")]
    Internal { state: StateId, detail: &'static str },

    #[error("cannot open input file {}", path.display())]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{pos}: {message}")]
    Fatal {
        code: ErrorCode,
        pos: Position,
        message: String,
    },
}

impl ScanError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ScanError::Unterminated { .. } => ErrorCode::UnterminatedConstruct,
            ScanError::OutOfMemory { .. } => ErrorCode::OutOfMemory,
            ScanError::ModeStackUnderflow => ErrorCode::ModeStackUnderflow,
            ScanError::FileStackUnderflow => ErrorCode::FileStackUnderflow,
            ScanError::Internal { .. } => ErrorCode::InternalError,
            ScanError::CannotOpen { .. } => ErrorCode::CannotOpenInput,
            ScanError::Fatal { code, .. } => *code,
        }
    }

    /// Position carried by the error, if it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            ScanError::Unterminated { pos, .. } | ScanError::Fatal { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

impl From<std::collections::TryReserveError> for ScanError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ScanError::OutOfMemory { requested: 0 }
    }
}
