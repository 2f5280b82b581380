// src/lexer/grammars/calc.rs
//! A small calculator language with three modes:
//!
//! * `STD`: numbers (`12`, `12.5`, `1.5e-3`), the keyword `BEGIN`,
//!   identifiers, single-character operators, `//` comments, and `#`
//!   comments that start in column 1.
//! * `STR`: the body of a `"..."` literal. `\\` and `\"` are escapes; a
//!   line break inside a literal ends the session.
//! * `COM`: the body of a `/* ... */` comment. Comments nest.

use std::mem;

use anyhow::{Result, anyhow};

use crate::lexer::{
    actions::{ActionTable, Step},
    context::{ScanContext, Token},
    diagnostics::ErrorCode,
    error::ScanError,
    position::Position,
    scanner::Scanner,
    tables::{DfaBuilder, Mode, StateId, Tables, TokenKind},
};

pub const INT: TokenKind = TokenKind(1);
pub const FLOAT: TokenKind = TokenKind(2);
pub const BEGIN: TokenKind = TokenKind(3);
pub const IDENT: TokenKind = TokenKind(4);
pub const OPERATOR: TokenKind = TokenKind(5);
pub const STRING: TokenKind = TokenKind(6);

pub const OPERATORS: &[u8] = b"+-*/()=;<>,{}[]!&|";

/// Longest string literal body kept; longer ones are reported and dropped.
pub const MAX_STRING_LEN: usize = 2048;

mod rule {
    pub const INT: u16 = 0;
    pub const FLOAT: u16 = 1;
    pub const BEGIN: u16 = 2;
    pub const IDENT: u16 = 3;
    pub const OPERATOR: u16 = 4;
    pub const BLANK: u16 = 5;
    pub const LINE_COMMENT: u16 = 6;
    pub const COMMENT_OPEN: u16 = 7;
    pub const COMMENT_CLOSE: u16 = 8;
    pub const COMMENT_BODY: u16 = 9;
    pub const STRING_OPEN: u16 = 10;
    pub const STRING_BODY: u16 = 11;
    pub const STRING_ESCAPE: u16 = 12;
    pub const STRING_CLOSE: u16 = 13;
    pub const STRING_NEWLINE: u16 = 14;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalcModes {
    pub std: Mode,
    pub string: Mode,
    pub comment: Mode,
}

/// Action state carried between tokens.
#[derive(Debug, Clone)]
pub struct CalcState {
    pub modes: CalcModes,
    /// Open `/*` count.
    pub depth: u32,
    pub string: Vec<u8>,
    pub string_pos: Position,
    pub comment_pos: Position,
}

impl CalcState {
    fn new(modes: CalcModes) -> Self {
        Self {
            modes,
            depth: 0,
            string: Vec::new(),
            string_pos: Position::default(),
            comment_pos: Position::default(),
        }
    }
}

fn ident_bytes(b: &mut DfaBuilder, from: StateId, to: StateId) {
    b.on_range(from, b'a'..=b'z', to);
    b.on_range(from, b'A'..=b'Z', to);
    b.on(from, b"_", to);
}

fn keyword(b: &mut DfaBuilder, start: StateId, ident: StateId, word: &[u8], rule_id: u16) {
    let mut cur = start;
    for (i, &c) in word.iter().enumerate() {
        let next = b.state();
        ident_bytes(b, next, ident);
        b.on_range(next, b'0'..=b'9', ident);
        b.on(cur, &[c], next);
        let last = i + 1 == word.len();
        b.accept(next, if last { rule_id } else { rule::IDENT });
        cur = next;
    }
}

pub fn tables() -> Result<(Tables, CalcModes)> {
    let mut b = DfaBuilder::with_line_start_modes();
    let modes = CalcModes {
        std: b.mode("STD"),
        string: b.mode("STR"),
        comment: b.mode("COM"),
    };
    let std = modes.std.state();

    // numbers
    let int = b.state();
    let dot = b.state();
    let frac = b.state();
    let e = b.state();
    let sign = b.state();
    let exp = b.state();
    b.on_range(std, b'0'..=b'9', int);
    b.on_range(int, b'0'..=b'9', int);
    b.on(int, b".", dot);
    b.on_range(dot, b'0'..=b'9', frac);
    b.on_range(frac, b'0'..=b'9', frac);
    b.on(int, b"eE", e);
    b.on(frac, b"eE", e);
    b.on(e, b"+-", sign);
    b.on_range(e, b'0'..=b'9', exp);
    b.on_range(sign, b'0'..=b'9', exp);
    b.on_range(exp, b'0'..=b'9', exp);
    b.accept(int, rule::INT);
    b.accept(frac, rule::FLOAT);
    b.accept(exp, rule::FLOAT);

    // identifiers and the keyword
    let ident = b.state();
    ident_bytes(&mut b, std, ident);
    ident_bytes(&mut b, ident, ident);
    b.on_range(ident, b'0'..=b'9', ident);
    b.accept(ident, rule::IDENT);
    keyword(&mut b, std, ident, b"BEGIN", rule::BEGIN);

    // operators; '/' also opens comments
    let op = b.state();
    b.on(std, OPERATORS, op);
    b.accept(op, rule::OPERATOR);
    let slash = b.state();
    b.on(std, b"/", slash);
    b.accept(slash, rule::OPERATOR);
    let line = b.state();
    b.on(slash, b"/", line);
    b.on_except(line, b"\n", line);
    b.accept(line, rule::LINE_COMMENT);
    let open = b.state();
    b.on(slash, b"*", open);
    b.accept(open, rule::COMMENT_OPEN);

    let blank = b.state();
    b.on(std, b" \t\r\n", blank);
    b.on(blank, b" \t\r\n", blank);
    b.accept(blank, rule::BLANK);

    // '#' comments only at the start of a line
    let hash = b.state();
    b.on(modes.std.line_start().state(), b"#", hash);
    b.on_except(hash, b"\n", hash);
    b.accept(hash, rule::LINE_COMMENT);

    let quote = b.state();
    b.on(std, b"\"", quote);
    b.accept(quote, rule::STRING_OPEN);

    // string bodies
    let s = modes.string.state();
    let body = b.state();
    b.on_except(s, b"\"\\\n", body);
    b.on_except(body, b"\"\\\n", body);
    b.accept(body, rule::STRING_BODY);
    let esc = b.state();
    let esc2 = b.state();
    b.on(s, b"\\", esc);
    b.on_except(esc, b"\n", esc2);
    b.accept(esc, rule::STRING_ESCAPE);
    b.accept(esc2, rule::STRING_ESCAPE);
    let close = b.state();
    b.on(s, b"\"", close);
    b.accept(close, rule::STRING_CLOSE);
    let nl = b.state();
    b.on(s, b"\n", nl);
    b.accept(nl, rule::STRING_NEWLINE);

    // comment bodies
    let c = modes.comment.state();
    let cbody = b.state();
    b.on_except(c, b"*/", cbody);
    b.on_except(cbody, b"*/", cbody);
    b.accept(cbody, rule::COMMENT_BODY);
    let star = b.state();
    b.on(c, b"*", star);
    b.accept(star, rule::COMMENT_BODY);
    let cclose = b.state();
    b.on(star, b"/", cclose);
    b.accept(cclose, rule::COMMENT_CLOSE);
    let cslash = b.state();
    b.on(c, b"/", cslash);
    b.accept(cslash, rule::COMMENT_BODY);
    let copen = b.state();
    b.on(cslash, b"*", copen);
    b.accept(copen, rule::COMMENT_OPEN);

    Ok((b.build()?, modes))
}

/// Recovers the mode ids from a loaded table.
pub fn modes_of(tables: &Tables) -> Result<CalcModes> {
    let get = |name: &str| {
        tables
            .mode(name)
            .ok_or_else(|| anyhow!("table has no {name} mode"))
    };
    Ok(CalcModes {
        std: get("STD")?,
        string: get("STR")?,
        comment: get("COM")?,
    })
}

fn comment_open(st: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
    if st.depth == 0 {
        st.comment_pos = ctx.position();
        ctx.set_mode(st.modes.comment);
    }
    st.depth += 1;
    Ok(Step::Skip)
}

fn comment_close(st: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
    st.depth = st.depth.saturating_sub(1);
    if st.depth == 0 {
        ctx.set_mode(st.modes.std);
    }
    Ok(Step::Skip)
}

fn append(st: &mut CalcState, ctx: &mut ScanContext<'_>, bytes: &[u8]) {
    if st.string.len() + bytes.len() > MAX_STRING_LEN {
        ctx.report(ErrorCode::Action, "string literal too long");
        st.string.clear();
    } else {
        st.string.extend_from_slice(bytes);
    }
}

fn string_open(st: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
    st.string.clear();
    st.string_pos = ctx.position();
    ctx.set_mode(st.modes.string);
    Ok(Step::Skip)
}

fn string_body(st: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
    let text = ctx.word();
    append(st, ctx, &text);
    Ok(Step::Skip)
}

fn string_escape(st: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
    let text = ctx.word();
    match text.as_slice() {
        [b'\\', c @ (b'\\' | b'"')] => append(st, ctx, &[*c]),
        _ => append(st, ctx, &text),
    }
    Ok(Step::Skip)
}

fn string_close(st: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
    ctx.set_mode(st.modes.std);
    let end = ctx.position().offset + ctx.len() as u64;
    Ok(Step::Emit(Token {
        kind: STRING,
        pos: st.string_pos,
        len: (end - st.string_pos.offset) as usize,
        text: mem::take(&mut st.string),
    }))
}

fn string_newline(_: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
    Err(ctx.fatal(
        ErrorCode::UnterminatedConstruct,
        "line break inside a string literal",
    ))
}

fn end_of_input(st: &mut CalcState, ctx: &mut ScanContext<'_>) -> Result<(), ScanError> {
    let mode = ctx.mode();
    if mode == st.modes.string {
        Err(ScanError::Unterminated {
            construct: "string".into(),
            pos: st.string_pos,
        })
    } else if mode == st.modes.comment {
        Err(ScanError::Unterminated {
            construct: "comment".into(),
            pos: st.comment_pos,
        })
    } else {
        Ok(())
    }
}

pub fn actions(modes: CalcModes) -> ActionTable<CalcState> {
    ActionTable::new(CalcState::new(modes))
        .on(rule::INT, |_, ctx| Ok(Step::Emit(ctx.token(INT))))
        .on(rule::FLOAT, |_, ctx| Ok(Step::Emit(ctx.token(FLOAT))))
        .on(rule::BEGIN, |_, ctx| Ok(Step::Emit(ctx.token(BEGIN))))
        .on(rule::IDENT, |_, ctx| Ok(Step::Emit(ctx.token(IDENT))))
        .on(rule::OPERATOR, |_, ctx| Ok(Step::Emit(ctx.token(OPERATOR))))
        .on(rule::BLANK, |_, _| Ok(Step::Skip))
        .on(rule::LINE_COMMENT, |_, _| Ok(Step::Skip))
        .on(rule::COMMENT_OPEN, comment_open)
        .on(rule::COMMENT_CLOSE, comment_close)
        .on(rule::COMMENT_BODY, |_, _| Ok(Step::Skip))
        .on(rule::STRING_OPEN, string_open)
        .on(rule::STRING_BODY, string_body)
        .on(rule::STRING_ESCAPE, string_escape)
        .on(rule::STRING_CLOSE, string_close)
        .on(rule::STRING_NEWLINE, string_newline)
        .on_end_of_input(end_of_input)
        .on_reset(|st| {
            st.depth = 0;
            st.string.clear();
        })
}

pub fn scanner() -> Result<Scanner<ActionTable<CalcState>>> {
    let (tables, modes) = tables()?;
    Ok(Scanner::new(tables, actions(modes)))
}

pub fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::EOF => "EOF",
        INT => "INT",
        FLOAT => "FLOAT",
        BEGIN => "BEGIN",
        IDENT => "IDENT",
        OPERATOR => "OPERATOR",
        STRING => "STRING",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::diagnostics::CollectingReporter;

    fn kinds(src: &str) -> Vec<(&'static str, String)> {
        let mut s = scanner().unwrap();
        s.begin_memory(src).unwrap();
        s.tokens()
            .map(|t| {
                let t = t.unwrap();
                (kind_name(t.kind), t.text_lossy().into_owned())
            })
            .collect()
    }

    #[test]
    fn numbers_back_off_to_the_longest_valid_prefix() {
        assert_eq!(
            kinds("12 12.5 1.5e-3 7e 3."),
            vec![
                ("INT", "12".into()),
                ("FLOAT", "12.5".into()),
                ("FLOAT", "1.5e-3".into()),
                ("INT", "7".into()),
                ("IDENT", "e".into()),
                ("INT", "3".into()),
            ]
        );
    }

    #[test]
    fn keyword_versus_identifier() {
        assert_eq!(
            kinds("BEGIN BEGINS BEG"),
            vec![
                ("BEGIN", "BEGIN".into()),
                ("IDENT", "BEGINS".into()),
                ("IDENT", "BEG".into()),
            ]
        );
    }

    #[test]
    fn comments_nest_and_are_skipped() {
        assert_eq!(
            kinds("a /* x /* y */ z */ b // tail\nc"),
            vec![
                ("IDENT", "a".into()),
                ("IDENT", "b".into()),
                ("IDENT", "c".into())
            ]
        );
    }

    #[test]
    fn hash_comment_only_at_line_start() {
        let mut s = scanner().unwrap().with_reporter(CollectingReporter::default());
        s.begin_memory("#top\nx #no\n# yes\ny").unwrap();
        let toks: Vec<_> = s.tokens().map(|t| t.unwrap().text).collect();
        assert_eq!(toks, vec![b"x".to_vec(), b"no".to_vec(), b"y".to_vec()]);
        assert_eq!(s.reporter().count(ErrorCode::IllegalCharacter), 1);
    }

    #[test]
    fn string_escapes_and_position() {
        let mut s = scanner().unwrap();
        s.begin_memory(r#"x = "a\"b\\c\q";"#).unwrap();
        s.next_token().unwrap();
        s.next_token().unwrap();
        let t = s.next_token().unwrap();
        assert_eq!(t.kind, STRING);
        assert_eq!(t.text, br#"a"b\c\q"#.to_vec());
        assert_eq!(t.pos.column, 5);
        assert_eq!(t.len, 11);
        assert_eq!(s.next_token().unwrap().kind, OPERATOR);
    }

    #[test]
    fn unterminated_string_is_fatal_at_its_opening_quote() {
        let mut s = scanner().unwrap().with_reporter(CollectingReporter::default());
        s.begin_memory("a \"open").unwrap();
        assert_eq!(s.next_token().unwrap().kind, IDENT);
        let err = s.next_token().unwrap_err();
        assert!(matches!(err, ScanError::Unterminated { .. }));
        assert_eq!(err.position().map(|p| p.column), Some(3));
        assert_eq!(s.reporter().fatal_count(), 1);
        // the session ended; the scanner starts over cleanly
        assert!(s.next_token().unwrap().is_eof());
        s.begin_memory("b").unwrap();
        assert_eq!(s.next_token().unwrap().kind, IDENT);
    }

    #[test]
    fn long_strings_are_reported_and_dropped() {
        let body = "x".repeat(MAX_STRING_LEN + 10);
        let mut s = scanner().unwrap().with_reporter(CollectingReporter::default());
        s.begin_memory(format!("\"{body}\"")).unwrap();
        let t = s.next_token().unwrap();
        assert_eq!(t.kind, STRING);
        assert!(t.text.len() < body.len());
        assert_eq!(s.reporter().count(ErrorCode::Action), 1);
    }
}
