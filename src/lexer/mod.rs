// src/lexer/mod.rs
pub mod actions;
pub mod buffer;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod fold;
pub mod grammars;
pub mod position;
pub mod scanner;
pub mod source;
pub mod stacks;
pub mod tables;

pub use actions::{ActionTable, Actions, Step};
pub use config::ScannerConfig;
pub use context::{ScanContext, Token};
pub use diagnostics::{CollectingReporter, Diagnostic, ErrorCode, LogReporter, Reporter, Severity};
pub use error::ScanError;
pub use fold::CaseFold;
pub use position::Position;
pub use scanner::{Scanner, Tokens};
pub use source::{ByteSource, ChunkedSource, MemorySource, ReaderSource, open_file};
pub use tables::{DfaBuilder, Mode, Tables, TokenKind};
