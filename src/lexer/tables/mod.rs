// src/lexer/tables/mod.rs
pub mod build;
pub mod io;
pub mod tokens;

use anyhow::{Result, bail};

pub use build::DfaBuilder;
pub use io::{load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin, save_tables_json};
pub use tokens::{Mode, NO_RULE, NO_STATE, RuleId, StateId, TokenKind};

/// Out-of-alphabet marker written right after the last buffered byte.
pub const EOB_BYTE: u8 = 0x7F;

/// One cell of the comb vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Comb {
    pub check: StateId,
    pub next: StateId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeInfo {
    pub name: String,
    pub state: StateId,
}

/// Compressed transition table consumed read-only by the scanner.
///
/// A transition for `(state, byte)` lives at `comb[base[state] + class]`
/// and only counts if that cell's `check` equals `state`; otherwise the
/// lookup falls through `default[state]`. All per-state arrays are indexed
/// by state id and have slot 0 reserved for `NO_STATE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub char_class: [u16; 256],
    pub n_classes: u16,
    pub comb: Vec<Comb>,
    pub base: Vec<u32>,
    pub default: Vec<StateId>,
    pub eob_trans: Vec<StateId>,
    pub rule_of: Vec<u16>,
    pub eob_state: StateId,
    pub default_state: StateId,
    pub modes: Vec<ModeInfo>,
    pub line_start_modes: bool,
}

impl Tables {
    /// Number of states including the reserved slot 0.
    #[inline]
    pub fn n_states(&self) -> usize {
        self.base.len()
    }

    #[inline]
    pub fn class_of(&self, byte: u8) -> u16 {
        self.char_class[byte as usize]
    }

    /// Direct transition from `state` on `byte`, without default fallback.
    #[inline]
    pub fn step(&self, state: StateId, byte: u8) -> Option<StateId> {
        let slot = self.base[state as usize] as usize + self.class_of(byte) as usize;
        let cell = self.comb[slot];
        (cell.check == state).then_some(cell.next)
    }

    #[inline]
    pub fn fallback(&self, state: StateId) -> StateId {
        self.default[state as usize]
    }

    #[inline]
    pub fn eob_transition(&self, state: StateId) -> StateId {
        self.eob_trans[state as usize]
    }

    #[inline]
    pub fn rule(&self, state: StateId) -> Option<RuleId> {
        match self.rule_of.get(state as usize) {
            Some(&r) if r != NO_RULE => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn is_eob(&self, state: StateId) -> bool {
        state == self.eob_state
    }

    #[inline]
    pub fn is_error_sink(&self, state: StateId) -> bool {
        state == self.default_state
    }

    pub fn mode(&self, name: &str) -> Option<Mode> {
        self.modes
            .iter()
            .find(|m| m.name == name)
            .map(|m| Mode(m.state))
    }

    pub fn mode_name(&self, mode: Mode) -> Option<&str> {
        self.modes
            .iter()
            .find(|m| m.state == mode.0)
            .map(|m| m.name.as_str())
    }

    /// The mode a fresh scanner starts in (the first registered one).
    pub fn initial_mode(&self) -> Mode {
        self.modes.first().map(|m| Mode(m.state)).unwrap_or(Mode(1))
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.n_states();
        if n < 2 {
            bail!("table has no states");
        }
        if self.default.len() != n || self.eob_trans.len() != n || self.rule_of.len() != n {
            bail!(
                "per-state arrays disagree: base={} default={} eob_trans={} rule_of={}",
                n,
                self.default.len(),
                self.eob_trans.len(),
                self.rule_of.len()
            );
        }
        if self.n_classes == 0 {
            bail!("table has no character classes");
        }
        if let Some((b, &c)) = self
            .char_class
            .iter()
            .enumerate()
            .find(|&(_, &c)| c >= self.n_classes)
        {
            bail!("byte 0x{b:02X} maps to class {c} >= n_classes={}", self.n_classes);
        }
        let eob_class = self.class_of(EOB_BYTE);
        if (0..=255u8).any(|b| b != EOB_BYTE && self.class_of(b) == eob_class) {
            bail!("sentinel byte 0x{EOB_BYTE:02X} must own its character class");
        }
        let in_range = |s: StateId| (s as usize) < n;
        for s in 1..n {
            let reach = self.base[s] as usize + self.n_classes as usize;
            if reach > self.comb.len() {
                bail!("state {s}: base {} + classes overruns comb (len {})", self.base[s], self.comb.len());
            }
            if !in_range(self.default[s]) || !in_range(self.eob_trans[s]) {
                bail!("state {s}: default/eob transition out of range");
            }
        }
        self.check_default_chains()?;
        if let Some(c) = self
            .comb
            .iter()
            .find(|c| !in_range(c.check) || !in_range(c.next))
        {
            bail!("comb cell {c:?} references a state out of range");
        }
        if self.eob_state == NO_STATE || !in_range(self.eob_state) {
            bail!("end-of-buffer state {} is invalid", self.eob_state);
        }
        if self.default_state == NO_STATE || !in_range(self.default_state) {
            bail!("default state {} is invalid", self.default_state);
        }
        if self.eob_state == self.default_state {
            bail!("end-of-buffer and default state coincide");
        }
        if self.modes.is_empty() {
            bail!("table declares no modes");
        }
        for m in &self.modes {
            let last = if self.line_start_modes { m.state as usize + 1 } else { m.state as usize };
            if m.state == NO_STATE || last >= n {
                bail!("mode {:?} has invalid start state {}", m.name, m.state);
            }
        }
        Ok(())
    }

    /// Every chain of default transitions must end in `NO_STATE`.
    fn check_default_chains(&self) -> Result<()> {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;
        let mut mark = vec![UNSEEN; self.n_states()];
        let mut path = Vec::new();
        for s in 1..self.n_states() {
            let mut cur = s as StateId;
            while cur != NO_STATE && mark[cur as usize] == UNSEEN {
                mark[cur as usize] = ON_PATH;
                path.push(cur);
                cur = self.default[cur as usize];
            }
            if cur != NO_STATE && mark[cur as usize] == ON_PATH {
                bail!("default transitions from state {s} loop back to state {cur}");
            }
            for p in path.drain(..) {
                mark[p as usize] = DONE;
            }
        }
        Ok(())
    }
}
