// src/lexer/scanner.rs
//! The automaton interpreter: longest match with backtracking over the comb
//! table, sentinel-driven refills, nested sources and modes.

use std::{path::Path, sync::Arc};

use super::{
    actions::{Actions, Step},
    config::ScannerConfig,
    context::{ScanContext, Token},
    diagnostics::{Diagnostic, ErrorCode, LogReporter, Reporter, Severity},
    error::ScanError,
    position::Position,
    source::{ByteSource, MemorySource, open_file, stdin_source},
    stacks::{FileStack, Frame, ModeStack},
    tables::{Mode, NO_STATE, StateId, Tables},
};

const INITIAL_STATE_STACK: usize = 256;

enum Scanned {
    Token(Token),
    /// The last open source is exhausted.
    End(Position),
}

/// One scanning session over a table and an action set. All state lives in
/// the instance; independent scanners can run on separate threads.
pub struct Scanner<A: Actions, R: Reporter = LogReporter> {
    tables: Arc<Tables>,
    actions: A,
    reporter: R,
    config: ScannerConfig,
    current: Option<Frame>,
    files: FileStack<Frame>,
    modes: ModeStack,
    /// States entered since the token start; the bottom entry is the error
    /// sink.
    states: Vec<StateId>,
    last_pos: Position,
    /// Match text of a token emitted by an action that also opened a source.
    held_word: Option<Vec<u8>>,
}

impl<A: Actions> Scanner<A, LogReporter> {
    pub fn new(tables: impl Into<Arc<Tables>>, actions: A) -> Self {
        let tables = tables.into();
        let config = ScannerConfig::default();
        let modes = ModeStack::new(tables.initial_mode(), config.mode_stack_capacity);
        Self {
            tables,
            actions,
            reporter: LogReporter,
            files: FileStack::new(config.file_stack_capacity),
            config,
            current: None,
            modes,
            states: Vec::with_capacity(INITIAL_STATE_STACK),
            last_pos: Position::default(),
            held_word: None,
        }
    }
}

#[inline]
fn push_state(states: &mut Vec<StateId>, s: StateId) -> Result<(), ScanError> {
    if states.len() == states.capacity() {
        states.try_reserve(states.len().max(64))?;
    }
    states.push(s);
    Ok(())
}

fn open_frame(
    current: &mut Option<Frame>,
    files: &mut FileStack<Frame>,
    config: &ScannerConfig,
    source: Box<dyn ByteSource>,
) -> Result<(), ScanError> {
    let frame = Frame::new(source, config)?;
    if let Some(outer) = current.take() {
        log::debug!("suspending {} (line {})", outer.name, outer.lines.line);
        files.push(outer)?;
    }
    log::debug!("scanning {} (depth {})", frame.name, files.depth() + 1);
    *current = Some(frame);
    Ok(())
}

/// Run the hook for a source that is done: `end_of_source` when other
/// sources are suspended, `end_of_input` for the outermost one.
fn end_of_frame<A: Actions>(
    actions: &mut A,
    frame: &mut Frame,
    modes: &mut ModeStack,
    reporter: &mut dyn Reporter,
    config: &ScannerConfig,
    state: StateId,
    suspended: usize,
) -> Result<(Position, Option<Box<dyn ByteSource>>), ScanError> {
    let at = frame.buffer.cursor;
    let pos = frame.position_at(at);
    let mut ctx = ScanContext {
        frame,
        modes,
        reporter,
        fold: config.case_fold,
        pos,
        state,
        pushed: None,
        file_depth: suspended,
    };
    if suspended > 0 {
        actions.end_of_source(&mut ctx)?;
    } else {
        actions.end_of_input(&mut ctx)?;
    }
    Ok((pos, ctx.pushed.take()))
}

impl<A: Actions, R: Reporter> Scanner<A, R> {
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        let config = config.normalized();
        self.modes = ModeStack::new(self.tables.initial_mode(), config.mode_stack_capacity);
        self.files = FileStack::new(config.file_stack_capacity);
        self.config = config;
        self
    }

    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> Scanner<A, R2> {
        Scanner {
            tables: self.tables,
            actions: self.actions,
            reporter,
            config: self.config,
            current: self.current,
            files: self.files,
            modes: self.modes,
            states: self.states,
            last_pos: self.last_pos,
            held_word: self.held_word,
        }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut A {
        &mut self.actions
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    /// Scan `source`. If a source is already active it is suspended and
    /// resumes once `source` is exhausted.
    pub fn begin_source(&mut self, source: impl ByteSource + 'static) -> Result<(), ScanError> {
        open_frame(&mut self.current, &mut self.files, &self.config, Box::new(source))
            .map_err(|e| self.abort(e))
    }

    pub fn begin_file(&mut self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        match open_file(path.as_ref()) {
            Ok(src) => self.begin_source(src),
            Err(e) => Err(self.abort(e)),
        }
    }

    pub fn begin_stdin(&mut self) -> Result<(), ScanError> {
        self.begin_source(stdin_source())
    }

    pub fn begin_memory(&mut self, bytes: impl Into<Vec<u8>>) -> Result<(), ScanError> {
        self.begin_source(MemorySource::new(bytes))
    }

    /// Open sources, the active one included.
    pub fn file_depth(&self) -> usize {
        self.files.depth() + usize::from(self.current.is_some())
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Name of the source being scanned.
    pub fn source_name(&self) -> Option<&str> {
        self.current.as_ref().map(|f| f.name.as_str())
    }

    /// Close the active source as if it had run out: the end-of-source hook
    /// runs (end-of-input for the outermost source) and a suspended source,
    /// if any, resumes.
    pub fn close_current_file(&mut self) -> Result<(), ScanError> {
        let Some(mut frame) = self.current.take() else {
            return Err(self.abort(ScanError::FileStackUnderflow));
        };
        log::debug!("closing {}", frame.name);
        let state = self.modes.current().state();
        let hook = end_of_frame(
            &mut self.actions,
            &mut frame,
            &mut self.modes,
            &mut self.reporter,
            &self.config,
            state,
            self.files.depth(),
        );
        self.current = self.files.pop().ok();
        let (pos, pushed) = hook.map_err(|e| self.abort(e))?;
        if self.current.is_none() {
            self.last_pos = pos;
        }
        if let Some(src) = pushed {
            open_frame(&mut self.current, &mut self.files, &self.config, src)
                .map_err(|e| self.abort(e))?;
        }
        Ok(())
    }

    /// Close the active source and resume the one it interrupted. Fails when
    /// nothing is suspended.
    pub fn pop_source(&mut self) -> Result<(), ScanError> {
        match self.files.pop() {
            Ok(outer) => {
                if let Some(inner) = self.current.replace(outer) {
                    log::debug!("closing {}", inner.name);
                }
                Ok(())
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    pub fn mode(&self) -> Mode {
        self.modes.current()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.modes.set(mode);
    }

    pub fn push_mode(&mut self, mode: Mode) -> Result<(), ScanError> {
        self.modes.push(mode).map_err(|e| self.abort(e))
    }

    pub fn pop_mode(&mut self) -> Result<Mode, ScanError> {
        self.modes.pop().map_err(|e| self.abort(e))
    }

    pub fn mode_depth(&self) -> usize {
        self.modes.depth()
    }

    /// Position of the last token returned.
    pub fn position(&self) -> Position {
        self.last_pos
    }

    /// Text of the last accepted match, also when its action switched to
    /// another source.
    pub fn word(&self) -> &[u8] {
        if let Some(w) = &self.held_word {
            return w;
        }
        self.current.as_ref().map_or(&[][..], |f| f.buffer.text())
    }

    pub fn lower(&self) -> Vec<u8> {
        self.config.case_fold.to_lower(self.word())
    }

    pub fn upper(&self) -> Vec<u8> {
        self.config.case_fold.to_upper(self.word())
    }

    /// Drop every source and stack; back to the initial mode.
    pub fn reset(&mut self) {
        self.current = None;
        self.files.clear();
        self.modes.reset(self.tables.initial_mode());
        self.states.clear();
        self.last_pos = Position::default();
        self.held_word = None;
        self.actions.reset();
        log::debug!("scanner reset");
    }

    fn abort(&mut self, err: ScanError) -> ScanError {
        let (pos, source) = match self.current.as_mut() {
            Some(f) => {
                let at = f.buffer.token_start;
                (f.position_at(at), f.name.clone())
            }
            None => (self.last_pos, String::new()),
        };
        self.reporter.report(Diagnostic {
            code: err.code(),
            severity: Severity::Fatal,
            pos: err.position().unwrap_or(pos),
            source,
            message: err.to_string(),
        });
        self.reset();
        err
    }

    /// Next token. Returns a token of kind [`TokenKind::EOF`] once all
    /// sources are exhausted (and on every call after that). An `Err` ends
    /// the session: it has been reported and the scanner was reset.
    ///
    /// [`TokenKind::EOF`]: super::tables::TokenKind::EOF
    pub fn next_token(&mut self) -> Result<Token, ScanError> {
        match self.scan() {
            Ok(Scanned::Token(t)) => {
                self.last_pos = t.pos;
                Ok(t)
            }
            Ok(Scanned::End(pos)) => {
                self.reset();
                self.last_pos = pos;
                Ok(Token::eof(pos))
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    /// Tokens up to (not including) end of input. Stops after the first error.
    pub fn tokens(&mut self) -> Tokens<'_, A, R> {
        Tokens {
            scanner: self,
            done: false,
        }
    }

    fn scan(&mut self) -> Result<Scanned, ScanError> {
        let Self {
            tables,
            actions,
            reporter,
            config,
            current,
            files,
            modes,
            states,
            last_pos,
            held_word,
        } = self;
        let tables: &Tables = tables;
        *held_word = None;

        'begin: loop {
            let Some(frame) = current.as_mut() else {
                return Ok(Scanned::End(*last_pos));
            };
            frame.buffer.token_start = frame.buffer.cursor;
            let mut mode = modes.current();
            if tables.line_start_modes && frame.buffer.preceding(frame.buffer.cursor) == b'\n' {
                mode = mode.line_start();
            }
            let start_state = mode.state();
            let mut state = start_state;
            states.clear();
            states.push(tables.default_state);
            let mut idx = frame.buffer.cursor;

            'walk: loop {
                let mut hops = 0;
                loop {
                    if let Some(next) = tables.step(state, frame.buffer.byte(idx)) {
                        state = next;
                        push_state(states, state)?;
                        idx += 1;
                        hops = 0;
                        continue;
                    }
                    let from = state;
                    state = tables.fallback(state);
                    if state == NO_STATE {
                        break;
                    }
                    hops += 1;
                    if hops > tables.n_states() {
                        return Err(ScanError::Internal {
                            state: from,
                            detail: "default transitions loop",
                        });
                    }
                }

                // Back up to the last final state.
                loop {
                    frame.buffer.cursor = idx;
                    let top = states.pop().ok_or(ScanError::Internal {
                        state,
                        detail: "state stack exhausted",
                    })?;

                    if tables.is_eob(top) {
                        idx -= 1;
                        let token_len = idx - frame.buffer.token_start;
                        state = match states.last() {
                            Some(&s) if token_len > 0 => s,
                            _ => start_state,
                        };

                        if idx != frame.buffer.fill_end() {
                            // A literal sentinel byte inside the input.
                            let t = tables.eob_transition(state);
                            if t == NO_STATE {
                                continue;
                            }
                            state = t;
                            push_state(states, state)?;
                            idx += 1;
                            continue 'walk;
                        }

                        if !frame.buffer.is_eof() {
                            frame.buffer.cursor = idx;
                            let r = frame.refill()?;
                            if let Some(e) = r.error {
                                let at = frame.buffer.cursor;
                                let pos = frame.position_at(at);
                                reporter.report(Diagnostic {
                                    code: ErrorCode::ReadFailure,
                                    severity: Severity::Error,
                                    pos,
                                    source: frame.name.clone(),
                                    message: e.to_string(),
                                });
                            }
                            idx = frame.buffer.cursor;
                            continue 'walk;
                        }

                        if token_len > 0 {
                            continue;
                        }

                        // This source is exhausted.
                        frame.buffer.cursor = idx;
                        let (pos, pushed) = end_of_frame(
                            actions,
                            frame,
                            modes,
                            reporter,
                            config,
                            start_state,
                            files.depth(),
                        )?;
                        log::debug!("end of {}", frame.name);
                        *current = files.pop().ok();
                        if let Some(src) = pushed {
                            open_frame(current, files, config, src)?;
                        }
                        if current.is_none() {
                            return Ok(Scanned::End(pos));
                        }
                        continue 'begin;
                    }

                    if tables.is_error_sink(top) {
                        let at = frame.buffer.token_start;
                        let byte = frame.buffer.byte(at);
                        frame.buffer.cursor = at + 1;
                        let pos = frame.position_at(at);
                        reporter.report(Diagnostic {
                            code: ErrorCode::IllegalCharacter,
                            severity: Severity::Error,
                            pos,
                            source: frame.name.clone(),
                            message: format!("'{}'", byte.escape_ascii()),
                        });
                        continue 'begin;
                    }

                    if let Some(rule) = tables.rule(top) {
                        debug_assert!(frame.buffer.token_start <= frame.buffer.cursor);
                        debug_assert!(frame.buffer.cursor <= frame.buffer.fill_end() + 2);
                        let at = frame.buffer.token_start;
                        let pos = frame.position_at(at);
                        let (step, pushed) = {
                            let mut ctx = ScanContext {
                                frame: &mut *frame,
                                modes: &mut *modes,
                                reporter: &mut *reporter,
                                fold: config.case_fold,
                                pos,
                                state: top,
                                pushed: None,
                                file_depth: files.depth(),
                            };
                            let step = actions.action(rule, &mut ctx)?;
                            (step, ctx.pushed.take())
                        };
                        if let Some(src) = pushed {
                            if matches!(step, Step::Emit(_)) {
                                *held_word = Some(frame.buffer.text().to_vec());
                            }
                            open_frame(current, files, config, src)?;
                        }
                        match step {
                            Step::Emit(token) => return Ok(Scanned::Token(token)),
                            Step::Skip => continue 'begin,
                        }
                    }

                    // non-final: give the byte back
                    idx -= 1;
                }
            }
        }
    }
}

pub struct Tokens<'s, A: Actions, R: Reporter> {
    scanner: &'s mut Scanner<A, R>,
    done: bool,
}

impl<A: Actions, R: Reporter> Iterator for Tokens<'_, A, R> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.next_token() {
            Ok(t) if t.is_eof() => {
                self.done = true;
                None
            }
            Ok(t) => Some(Ok(t)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
