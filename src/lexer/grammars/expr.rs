// src/lexer/grammars/expr.rs
//! Identifiers and single-character operators; blanks are skipped.

use anyhow::Result;

use crate::lexer::{
    actions::{ActionTable, Step},
    scanner::Scanner,
    tables::{DfaBuilder, Tables, TokenKind},
};

pub const IDENT: TokenKind = TokenKind(1);
pub const OPERATOR: TokenKind = TokenKind(2);

pub const OPERATORS: &[u8] = b"+-*/()=;";

mod rule {
    pub const IDENT: u16 = 0;
    pub const OPERATOR: u16 = 1;
    pub const BLANK: u16 = 2;
}

pub fn tables() -> Result<Tables> {
    let mut b = DfaBuilder::new();
    let std = b.mode("STD").state();

    let ident = b.state();
    for s in [std, ident] {
        b.on_range(s, b'a'..=b'z', ident);
        b.on_range(s, b'A'..=b'Z', ident);
    }
    b.accept(ident, rule::IDENT);

    let op = b.state();
    b.on(std, OPERATORS, op);
    b.accept(op, rule::OPERATOR);

    let blank = b.state();
    b.on(std, b" \t\n", blank);
    b.on(blank, b" \t\n", blank);
    b.accept(blank, rule::BLANK);

    b.build()
}

pub fn actions() -> ActionTable<()> {
    ActionTable::new(())
        .on(rule::IDENT, |_, ctx| Ok(Step::Emit(ctx.token(IDENT))))
        .on(rule::OPERATOR, |_, ctx| Ok(Step::Emit(ctx.token(OPERATOR))))
        .on(rule::BLANK, |_, _| Ok(Step::Skip))
}

pub fn scanner() -> Result<Scanner<ActionTable<()>>> {
    Ok(Scanner::new(tables()?, actions()))
}

pub fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::EOF => "EOF",
        IDENT => "IDENT",
        OPERATOR => "OPERATOR",
        _ => "?",
    }
}
