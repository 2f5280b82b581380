// src/lexer/grammars/mod.rs
//! Lexers bundled with the crate, each one a table plus an action set.

pub mod calc;
pub mod expr;

use anyhow::{Result, bail};

use super::tables::{Tables, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Expr,
    Calc,
}

impl Grammar {
    pub const ALL: [Grammar; 2] = [Grammar::Expr, Grammar::Calc];

    pub fn name(self) -> &'static str {
        match self {
            Grammar::Expr => "expr",
            Grammar::Calc => "calc",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "expr" => Ok(Grammar::Expr),
            "calc" => Ok(Grammar::Calc),
            other => bail!("unknown grammar {other:?} (expected expr or calc)"),
        }
    }

    pub fn tables(self) -> Result<Tables> {
        match self {
            Grammar::Expr => expr::tables(),
            Grammar::Calc => calc::tables().map(|(t, _)| t),
        }
    }

    pub fn kind_name(self, kind: TokenKind) -> &'static str {
        match self {
            Grammar::Expr => expr::kind_name(kind),
            Grammar::Calc => calc::kind_name(kind),
        }
    }
}
