// src/lexer/actions.rs
//! Rule actions: what happens when the automaton accepts a token.

use super::{
    context::{ScanContext, Token},
    error::ScanError,
    tables::RuleId,
};

/// Outcome of a rule action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Hand this token to the caller.
    Emit(Token),
    /// Drop the match and keep scanning (blanks, comments, mode switches).
    Skip,
}

/// The grammar-specific half of a scanner.
pub trait Actions: Send {
    fn action(&mut self, rule: RuleId, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError>;

    /// Called once when the last open source is exhausted, before the
    /// end-of-input token is returned.
    fn end_of_input(&mut self, _ctx: &mut ScanContext<'_>) -> Result<(), ScanError> {
        Ok(())
    }

    /// Called when a nested source is exhausted and the enclosing one resumes.
    fn end_of_source(&mut self, _ctx: &mut ScanContext<'_>) -> Result<(), ScanError> {
        Ok(())
    }

    /// Clear per-session state. Runs whenever the engine resets.
    fn reset(&mut self) {}
}

pub type ActionFn<U> = fn(&mut U, &mut ScanContext<'_>) -> Result<Step, ScanError>;
pub type HookFn<U> = fn(&mut U, &mut ScanContext<'_>) -> Result<(), ScanError>;

/// A lexer described as data: one function per rule id plus user state.
pub struct ActionTable<U> {
    pub state: U,
    rules: Vec<Option<ActionFn<U>>>,
    eof_hook: Option<HookFn<U>>,
    reset_hook: Option<fn(&mut U)>,
}

impl<U: Default> Default for ActionTable<U> {
    fn default() -> Self {
        Self::new(U::default())
    }
}

impl<U> ActionTable<U> {
    pub fn new(state: U) -> Self {
        Self {
            state,
            rules: Vec::new(),
            eof_hook: None,
            reset_hook: None,
        }
    }

    pub fn on(mut self, rule: RuleId, f: ActionFn<U>) -> Self {
        let i = rule as usize;
        if self.rules.len() <= i {
            self.rules.resize(i + 1, None);
        }
        self.rules[i] = Some(f);
        self
    }

    pub fn on_end_of_input(mut self, f: HookFn<U>) -> Self {
        self.eof_hook = Some(f);
        self
    }

    pub fn on_reset(mut self, f: fn(&mut U)) -> Self {
        self.reset_hook = Some(f);
        self
    }

    pub fn has_rule(&self, rule: RuleId) -> bool {
        matches!(self.rules.get(rule as usize), Some(Some(_)))
    }
}

impl<U: Send> Actions for ActionTable<U> {
    fn action(&mut self, rule: RuleId, ctx: &mut ScanContext<'_>) -> Result<Step, ScanError> {
        match self.rules.get(rule as usize).copied().flatten() {
            Some(f) => f(&mut self.state, ctx),
            None => Err(ScanError::Internal {
                state: ctx.state(),
                detail: "accepting state has no action",
            }),
        }
    }

    fn end_of_input(&mut self, ctx: &mut ScanContext<'_>) -> Result<(), ScanError> {
        match self.eof_hook {
            Some(f) => f(&mut self.state, ctx),
            None => Ok(()),
        }
    }

    fn reset(&mut self) {
        if let Some(f) = self.reset_hook {
            f(&mut self.state);
        }
    }
}
