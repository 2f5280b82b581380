//! Mode stack and source stack behaviour through the public scanner API.

use pretty_assertions::assert_eq;
use tablescan::lexer::{
    Actions, CollectingReporter, DfaBuilder, ErrorCode, MemorySource, Mode, Position,
    ScanContext, ScanError, Scanner, Step, Tables, TokenKind,
    tables::RuleId,
};

const WORD: TokenKind = TokenKind(1);
const OPEN: TokenKind = TokenKind(2);
const CLOSE: TokenKind = TokenKind(3);

mod rule {
    pub const WORD: u16 = 0;
    pub const OPEN: u16 = 1;
    pub const CLOSE: u16 = 2;
    pub const BLANK: u16 = 3;
    pub const INCLUDE: u16 = 4;
    pub const INCLUDE_EMIT: u16 = 5;
}

/// Words and parentheses; every '(' enters a nested IN mode, '@' includes a
/// fixed snippet and '%' does the same but is also returned as a token.
fn paren_tables() -> (Tables, Mode) {
    let mut b = DfaBuilder::new();
    let std = b.mode("STD");
    let inner = b.mode("IN");
    let word = b.state();
    let open = b.state();
    let close = b.state();
    let blank = b.state();
    for m in [std, inner] {
        b.on_range(m.state(), b'a'..=b'z', word);
        b.on(m.state(), b"(", open);
        b.on(m.state(), b")", close);
        b.on(m.state(), b" \n", blank);
    }
    b.on_range(word, b'a'..=b'z', word);
    b.on(blank, b" \n", blank);
    let at = b.state();
    b.on(std.state(), b"@", at);
    let pct = b.state();
    b.on(std.state(), b"%", pct);
    b.accept(word, rule::WORD);
    b.accept(open, rule::OPEN);
    b.accept(close, rule::CLOSE);
    b.accept(blank, rule::BLANK);
    b.accept(at, rule::INCLUDE);
    b.accept(pct, rule::INCLUDE_EMIT);
    (b.build().unwrap(), inner)
}

struct Parens {
    inner: Mode,
    end_of_source: usize,
    end_of_input: usize,
}

impl Actions for Parens {
    fn action(&mut self, rule: RuleId, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
        match rule {
            rule::WORD => Ok(Step::Emit(ctx.token(WORD))),
            rule::OPEN => {
                ctx.push_mode(self.inner)?;
                Ok(Step::Emit(ctx.token(OPEN)))
            }
            rule::CLOSE => {
                ctx.pop_mode()?;
                Ok(Step::Emit(ctx.token(CLOSE)))
            }
            rule::BLANK => Ok(Step::Skip),
            rule::INCLUDE => {
                ctx.push_source(MemorySource::new("x\ny").named("snippet"));
                Ok(Step::Skip)
            }
            rule::INCLUDE_EMIT => {
                ctx.push_source(MemorySource::new("q").named("snippet"));
                Ok(Step::Emit(ctx.token(WORD)))
            }
            _ => Err(ScanError::Internal {
                state: ctx.state(),
                detail: "unknown rule",
            }),
        }
    }

    fn end_of_input(&mut self, ctx: &mut ScanContext<'_>) -> Result<(), ScanError> {
        self.end_of_input += 1;
        if ctx.mode_depth() > 0 {
            return Err(ctx.unterminated("parenthesis"));
        }
        Ok(())
    }

    fn end_of_source(&mut self, _ctx: &mut ScanContext<'_>) -> Result<(), ScanError> {
        self.end_of_source += 1;
        Ok(())
    }
}

fn scanner() -> Scanner<Parens, CollectingReporter> {
    let (tables, inner) = paren_tables();
    Scanner::new(
        tables,
        Parens {
            inner,
            end_of_source: 0,
            end_of_input: 0,
        },
    )
    .with_reporter(CollectingReporter::default())
}

fn texts(s: &mut Scanner<Parens, CollectingReporter>) -> Vec<String> {
    s.tokens()
        .map(|t| t.unwrap().text_lossy().into_owned())
        .collect()
}

#[test]
fn balanced_parentheses_nest_modes() {
    let mut s = scanner();
    s.begin_memory("a (b (c)) d").unwrap();
    assert_eq!(texts(&mut s), ["a", "(", "b", "(", "c", ")", ")", "d"]);
    assert_eq!(s.mode_depth(), 0);
    assert_eq!(s.actions().end_of_input, 1);
    assert!(s.reporter().diagnostics.is_empty());
}

#[test]
fn mode_tracks_the_open_parentheses() {
    let mut s = scanner();
    let inner = s.actions().inner;
    let std = s.mode();
    s.begin_memory("((a)").unwrap();
    s.next_token().unwrap();
    assert_eq!((s.mode(), s.mode_depth()), (inner, 1));
    s.next_token().unwrap();
    assert_eq!(s.mode_depth(), 2);
    s.next_token().unwrap();
    s.next_token().unwrap();
    assert_eq!(s.mode_depth(), 1);
    assert_ne!(s.mode(), std);
}

#[test]
fn unmatched_close_underflows_the_mode_stack() {
    let mut s = scanner();
    s.begin_memory("a ) b").unwrap();
    assert_eq!(s.next_token().unwrap().kind, WORD);
    let err = s.next_token().unwrap_err();
    assert!(matches!(err, ScanError::ModeStackUnderflow));
    assert_eq!(s.reporter().fatal_count(), 1);
    assert_eq!(s.reporter().count(ErrorCode::ModeStackUnderflow), 1);
    // reset: nothing left to scan
    assert!(s.next_token().unwrap().is_eof());
}

#[test]
fn open_parenthesis_at_end_of_input_is_unterminated() {
    let mut s = scanner();
    s.begin_memory("(a").unwrap();
    assert_eq!(s.next_token().unwrap().kind, OPEN);
    assert_eq!(s.next_token().unwrap().kind, WORD);
    let err = s.next_token().unwrap_err();
    match err {
        ScanError::Unterminated { construct, pos } => {
            assert_eq!(construct, "parenthesis");
            assert_eq!(pos.offset, 2);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.mode_depth(), 0);
}

#[test]
fn popping_an_empty_mode_stack_from_outside_is_fatal() {
    let mut s = scanner();
    assert!(matches!(s.pop_mode(), Err(ScanError::ModeStackUnderflow)));
    assert_eq!(s.reporter().fatal_count(), 1);

    let inner = s.actions().inner;
    s.push_mode(inner).unwrap();
    assert_eq!(s.pop_mode().unwrap(), inner);
}

#[test]
fn action_can_include_another_source() {
    let mut s = scanner();
    s.begin_memory("a @ b").unwrap();

    let a = s.next_token().unwrap();
    assert_eq!(s.file_depth(), 1);
    let x = s.next_token().unwrap();
    assert_eq!(s.source_name(), Some("snippet"));
    assert_eq!(s.file_depth(), 2);
    let y = s.next_token().unwrap();
    let b = s.next_token().unwrap();
    assert_eq!(s.source_name(), Some("<memory>"));

    assert_eq!(a.pos, Position { line: 1, column: 1, offset: 0 });
    assert_eq!(x.pos, Position { line: 1, column: 1, offset: 0 });
    assert_eq!(y.pos, Position { line: 2, column: 1, offset: 2 });
    assert_eq!(b.pos, Position { line: 1, column: 5, offset: 4 });
    assert!(s.next_token().unwrap().is_eof());
    assert_eq!(s.actions().end_of_source, 1);
    assert_eq!(s.actions().end_of_input, 1);
}

#[test]
fn begin_source_while_active_suspends_the_outer_source() {
    let mut s = scanner();
    s.begin_memory("a b").unwrap();
    assert_eq!(s.next_token().unwrap().text, b"a".to_vec());
    s.begin_source(MemorySource::new("x y").named("inner")).unwrap();
    assert_eq!(s.file_depth(), 2);
    let rest: Vec<_> = s.tokens().map(Result::unwrap).collect();
    let words: Vec<_> = rest.iter().map(|t| t.text_lossy().into_owned()).collect();
    assert_eq!(words, ["x", "y", "b"]);
    assert_eq!(rest[2].pos, Position { line: 1, column: 3, offset: 2 });
}

#[test]
fn closing_the_current_file_resumes_the_outer_one() {
    let mut s = scanner();
    s.begin_memory("a b c").unwrap();
    s.next_token().unwrap();
    s.begin_memory("x y z").unwrap();
    assert_eq!(s.next_token().unwrap().text, b"x".to_vec());
    s.close_current_file().unwrap();
    assert_eq!(s.file_depth(), 1);
    assert_eq!(texts(&mut s), ["b", "c"]);
    assert_eq!(s.actions().end_of_source, 1);
    assert_eq!(s.actions().end_of_input, 1);
}

#[test]
fn closing_the_last_file_runs_the_end_of_input_hook() {
    let mut s = scanner();
    s.begin_memory("a b").unwrap();
    s.next_token().unwrap();
    s.close_current_file().unwrap();
    assert_eq!(s.actions().end_of_input, 1);
    assert!(!s.is_active());
    let end = s.next_token().unwrap();
    assert!(end.is_eof());
    assert_eq!(end.pos, Position { line: 1, column: 2, offset: 1 });
}

#[test]
fn closing_the_last_file_inside_a_mode_is_unterminated() {
    let mut s = scanner();
    s.begin_memory("(a").unwrap();
    assert_eq!(s.next_token().unwrap().kind, OPEN);
    let err = s.close_current_file().unwrap_err();
    match err {
        ScanError::Unterminated { construct, .. } => assert_eq!(construct, "parenthesis"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.reporter().fatal_count(), 1);
    assert_eq!(s.mode_depth(), 0);
    assert!(!s.is_active());
}

#[test]
fn word_survives_an_action_that_switches_sources() {
    let mut s = scanner();
    s.begin_memory("a % b").unwrap();
    assert_eq!(s.next_token().unwrap().text, b"a".to_vec());
    let pct = s.next_token().unwrap();
    assert_eq!(pct.text, b"%".to_vec());
    assert_eq!(s.source_name(), Some("snippet"));
    assert_eq!(s.word(), b"%");
    assert_eq!(s.next_token().unwrap().text, b"q".to_vec());
    assert_eq!(s.word(), b"q");
    assert_eq!(texts(&mut s), ["b"]);
}

#[test]
fn pop_source_needs_a_suspended_source() {
    let mut s = scanner();
    s.begin_memory("a b").unwrap();
    s.begin_memory("x").unwrap();
    s.pop_source().unwrap();
    assert_eq!(texts(&mut s), ["a", "b"]);

    s.begin_memory("a b").unwrap();
    let err = s.pop_source().unwrap_err();
    assert!(matches!(err, ScanError::FileStackUnderflow));
    assert_eq!(s.reporter().count(ErrorCode::FileStackUnderflow), 1);
    assert!(!s.is_active());
}
