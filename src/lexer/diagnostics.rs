// src/lexer/diagnostics.rs
//! Diagnostic sink used by the scanner for both recoverable and fatal
//! conditions.

use std::fmt;

use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Scanning continues.
    Error,
    /// The scanning session ends.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    IllegalCharacter,
    UnterminatedConstruct,
    OutOfMemory,
    ModeStackUnderflow,
    FileStackUnderflow,
    InternalError,
    CannotOpenInput,
    ReadFailure,
    /// Raised by a rule action.
    Action,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::IllegalCharacter => "illegal character",
            ErrorCode::UnterminatedConstruct => "unterminated construct",
            ErrorCode::OutOfMemory => "scanner out of memory",
            ErrorCode::ModeStackUnderflow => "start-stack underflow",
            ErrorCode::FileStackUnderflow => "file-stack underflow",
            ErrorCode::InternalError => "internal scanner error",
            ErrorCode::CannotOpenInput => "cannot open input file",
            ErrorCode::ReadFailure => "read failure",
            ErrorCode::Action => "scanner action error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub pos: Position,
    /// Name of the input source the position refers to.
    pub source: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        write!(f, "{}:{}: {sev}: {}", self.source, self.pos, self.code)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

pub trait Reporter: Send {
    fn report(&mut self, diag: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => log::warn!("{diag}"),
            Severity::Fatal => log::error!("{diag}"),
        }
    }
}

/// Keeps every diagnostic; handy for drivers that print a summary and for tests.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingReporter {
    pub fn count(&self, code: ErrorCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    pub fn fatal_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Fatal)
            .count()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }
}
