// src/lexer/tables/build.rs
//
// Packs an explicitly described DFA into the comb layout used by the
// scanner. This is not a regular-expression compiler: callers spell out
// every state and edge, the builder only classifies bytes and compresses.

use std::{ops::RangeInclusive, time::Instant};

use anyhow::{Result, bail};
use hashbrown::HashMap;

use super::{
    Comb, EOB_BYTE, ModeInfo, Tables,
    tokens::{Mode, NO_RULE, NO_STATE, RuleId, StateId},
};

type Row = Box<[StateId; 256]>;

fn empty_row() -> Row {
    Box::new([NO_STATE; 256])
}

/// Incremental description of a scanner automaton.
pub struct DfaBuilder {
    rows: Vec<Row>,
    defaults: Vec<Option<StateId>>,
    rules: Vec<u16>,
    modes: Vec<ModeInfo>,
    line_start_modes: bool,
}

impl Default for DfaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DfaBuilder {
    pub fn new() -> Self {
        Self {
            // slot 0 is NO_STATE
            rows: vec![empty_row()],
            defaults: vec![None],
            rules: vec![NO_RULE],
            modes: Vec::new(),
            line_start_modes: false,
        }
    }

    /// Every mode gets a start-of-line twin at `mode + 1`, entered when the
    /// previous byte was `\n`.
    pub fn with_line_start_modes() -> Self {
        Self {
            line_start_modes: true,
            ..Self::new()
        }
    }

    pub fn state(&mut self) -> StateId {
        let id = self.rows.len() as StateId;
        self.rows.push(empty_row());
        self.defaults.push(None);
        self.rules.push(NO_RULE);
        id
    }

    pub fn mode(&mut self, name: &str) -> Mode {
        let start = self.state();
        if self.line_start_modes {
            let twin = self.state();
            debug_assert_eq!(twin, start + 1);
        }
        self.modes.push(ModeInfo {
            name: name.to_string(),
            state: start,
        });
        Mode(start)
    }

    pub fn accept(&mut self, state: StateId, rule: RuleId) {
        debug_assert!(rule != NO_RULE, "rule id {NO_RULE} is reserved");
        self.rules[state as usize] = rule;
    }

    pub fn on(&mut self, from: StateId, bytes: &[u8], to: StateId) {
        let row = &mut self.rows[from as usize];
        for &b in bytes {
            row[b as usize] = to;
        }
    }

    pub fn on_range(&mut self, from: StateId, range: RangeInclusive<u8>, to: StateId) {
        let row = &mut self.rows[from as usize];
        for b in range {
            row[b as usize] = to;
        }
    }

    pub fn on_except(&mut self, from: StateId, except: &[u8], to: StateId) {
        let mut skip = [false; 256];
        for &e in except {
            skip[e as usize] = true;
        }
        let row = &mut self.rows[from as usize];
        for b in 0u16..=255 {
            if !skip[b as usize] {
                row[b as usize] = to;
            }
        }
    }

    /// Follow (or create) one state per byte of `bytes` starting at `from`;
    /// returns the state reached after the last byte.
    pub fn path(&mut self, from: StateId, bytes: &[u8]) -> StateId {
        let mut cur = from;
        for &b in bytes {
            let existing = self.rows[cur as usize][b as usize];
            cur = if existing != NO_STATE {
                existing
            } else {
                let s = self.state();
                self.rows[cur as usize][b as usize] = s;
                s
            };
        }
        cur
    }

    pub fn target(&self, from: StateId, byte: u8) -> StateId {
        self.rows[from as usize][byte as usize]
    }

    /// Transitions missing from `state` are looked up in `fallback`.
    pub fn default_to(&mut self, state: StateId, fallback: StateId) {
        self.defaults[state as usize] = Some(fallback);
    }

    pub fn build(mut self) -> Result<Tables> {
        let t0 = Instant::now();
        if self.modes.is_empty() {
            bail!("at least one mode is required");
        }
        let user_states = self.rows.len() - 1;
        if user_states + 4 > StateId::MAX as usize {
            bail!("{user_states} states do not fit the state id range");
        }

        // Start-of-line twins inherit what they don't override.
        if self.line_start_modes {
            for m in &self.modes {
                let (s, t) = (m.state as usize, m.state as usize + 1);
                for b in 0..256 {
                    if self.rows[t][b] == NO_STATE {
                        self.rows[t][b] = self.rows[s][b];
                    }
                }
                if self.defaults[t].is_none() {
                    self.defaults[t] = self.defaults[s];
                }
            }
        }

        let root = self.state();
        let eob_state = self.state();
        let default_state = self.state();
        let n = self.rows.len();

        // In-band sentinel bytes are reinterpreted through eob_trans; the comb
        // itself only ever routes the sentinel to the end-of-buffer state.
        let mut eob_trans = vec![NO_STATE; n];
        for s in 1..=user_states {
            eob_trans[s] = self.rows[s][EOB_BYTE as usize];
            self.rows[s][EOB_BYTE as usize] = NO_STATE;
        }
        self.rows[root as usize][EOB_BYTE as usize] = eob_state;

        let mut default = vec![NO_STATE; n];
        for s in 1..=user_states {
            default[s] = self.defaults[s].unwrap_or(root);
        }

        // Interning byte columns into equivalence classes.
        let mut class_ids: HashMap<Vec<StateId>, u16> = HashMap::new();
        let mut char_class = [0u16; 256];
        let mut representative: Vec<u8> = Vec::new();
        for b in 0u16..=255 {
            let column: Vec<StateId> = (1..n).map(|s| self.rows[s][b as usize]).collect();
            let next_id = class_ids.len() as u16;
            let id = *class_ids.entry(column).or_insert_with(|| {
                representative.push(b as u8);
                next_id
            });
            char_class[b as usize] = id;
        }
        let n_classes = representative.len() as u16;

        // Rows in class space.
        let class_rows: Vec<Vec<(u16, StateId)>> = (0..n)
            .map(|s| {
                if s == 0 {
                    return Vec::new();
                }
                representative
                    .iter()
                    .enumerate()
                    .filter_map(|(c, &b)| {
                        let next = self.rows[s][b as usize];
                        (next != NO_STATE).then_some((c as u16, next))
                    })
                    .collect()
            })
            .collect();

        // First-fit packing, densest rows first.
        let mut order: Vec<usize> = (1..n).collect();
        order.sort_by_key(|&s| std::cmp::Reverse(class_rows[s].len()));
        let mut comb: Vec<Comb> = Vec::new();
        let mut base = vec![0u32; n];
        for s in order {
            let row = &class_rows[s];
            if row.is_empty() {
                continue;
            }
            let fits = |b: usize, comb: &[Comb]| {
                row.iter()
                    .all(|&(c, _)| comb.get(b + c as usize).is_none_or(|cell| cell.check == NO_STATE))
            };
            let mut b = 0usize;
            while !fits(b, &comb) {
                b += 1;
            }
            let need = b + n_classes as usize;
            if comb.len() < need {
                comb.resize(need, Comb::default());
            }
            for &(c, next) in row {
                comb[b + c as usize] = Comb {
                    check: s as StateId,
                    next,
                };
            }
            base[s] = b as u32;
        }
        let max_reach = base.iter().map(|&b| b as usize).max().unwrap_or(0) + n_classes as usize;
        if comb.len() < max_reach {
            comb.resize(max_reach, Comb::default());
        }

        let tables = Tables {
            char_class,
            n_classes,
            comb,
            base,
            default,
            eob_trans,
            rule_of: self.rules,
            eob_state,
            default_state,
            modes: self.modes,
            line_start_modes: self.line_start_modes,
        };
        tables.validate()?;

        log::debug!(
            "[tables] packed {} states, {} classes into {} comb cells in {:?}",
            n - 1,
            n_classes,
            tables.comb.len(),
            t0.elapsed()
        );
        Ok(tables)
    }
}
