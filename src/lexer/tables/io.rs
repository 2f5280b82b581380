// src/lexer/tables/io.rs
use std::{
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{Comb, ModeInfo, Tables, tokens::StateId};

// -------------------- JSON (de)serialization --------------------

#[derive(Serialize, Deserialize)]
struct ModeDisk {
    name: String,
    state: StateId,
}

#[serde_as]
#[derive(Serialize, Deserialize)]
struct TablesDisk {
    #[serde_as(as = "[_; 256]")]
    char_class: [u16; 256],
    n_classes: u16,
    check: Vec<StateId>,
    next: Vec<StateId>,
    base: Vec<u32>,
    default: Vec<StateId>,
    eob_trans: Vec<StateId>,
    rule_of: Vec<u16>,
    eob_state: StateId,
    default_state: StateId,
    modes: Vec<ModeDisk>,
    line_start_modes: bool,
}

impl From<&Tables> for TablesDisk {
    fn from(t: &Tables) -> Self {
        Self {
            char_class: t.char_class,
            n_classes: t.n_classes,
            check: t.comb.iter().map(|c| c.check).collect(),
            next: t.comb.iter().map(|c| c.next).collect(),
            base: t.base.clone(),
            default: t.default.clone(),
            eob_trans: t.eob_trans.clone(),
            rule_of: t.rule_of.clone(),
            eob_state: t.eob_state,
            default_state: t.default_state,
            modes: t
                .modes
                .iter()
                .map(|m| ModeDisk {
                    name: m.name.clone(),
                    state: m.state,
                })
                .collect(),
            line_start_modes: t.line_start_modes,
        }
    }
}

impl TablesDisk {
    fn into_tables(self) -> Result<Tables> {
        if self.check.len() != self.next.len() {
            bail!(
                "check/next length mismatch: {} vs {}",
                self.check.len(),
                self.next.len()
            );
        }
        let tables = Tables {
            char_class: self.char_class,
            n_classes: self.n_classes,
            comb: self
                .check
                .into_iter()
                .zip(self.next)
                .map(|(check, next)| Comb { check, next })
                .collect(),
            base: self.base,
            default: self.default,
            eob_trans: self.eob_trans,
            rule_of: self.rule_of,
            eob_state: self.eob_state,
            default_state: self.default_state,
            modes: self
                .modes
                .into_iter()
                .map(|m| ModeInfo {
                    name: m.name,
                    state: m.state,
                })
                .collect(),
            line_start_modes: self.line_start_modes,
        };
        tables.validate()?;
        Ok(tables)
    }
}

pub fn save_tables_json(path: &Path, t: &Tables) -> Result<()> {
    let f = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, &TablesDisk::from(t))?;
    w.flush()?;
    log::debug!("[tables] wrote JSON tables to {}", path.display());
    Ok(())
}

pub fn load_tables_json_bytes(data: &[u8]) -> Result<Tables> {
    serde_json::from_slice::<TablesDisk>(data)
        .context("failed to parse tables JSON")?
        .into_tables()
}

// -------------------- Compact binary (u16 packing) --------------------
//
//   magic: 8 bytes = "RXTBL001"
//   u32: n_states (including slot 0)
//   u32: comb_len
//   u32: n_modes
//   u16: n_classes, eob_state, default_state, flags (bit 0: line-start modes)
//   u16: char_class[256]
//   u16: check[comb_len], next[comb_len]
//   u32: base[n_states]
//   u16: default[n_states], eob_trans[n_states], rule_of[n_states]
//   per mode: u16 state, u16 name_len, name bytes (UTF-8)

const BIN_MAGIC: &[u8; 8] = b"RXTBL001";

pub fn save_tables_bin(path: &Path, t: &Tables) -> Result<()> {
    let instant = Instant::now();
    let f = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);

    w.write_all(BIN_MAGIC)?;
    w.write_all(&(t.n_states() as u32).to_le_bytes())?;
    w.write_all(&(t.comb.len() as u32).to_le_bytes())?;
    w.write_all(&(t.modes.len() as u32).to_le_bytes())?;
    for v in [
        t.n_classes,
        t.eob_state,
        t.default_state,
        t.line_start_modes as u16,
    ] {
        w.write_all(&v.to_le_bytes())?;
    }
    for v in t.char_class {
        w.write_all(&v.to_le_bytes())?;
    }
    for c in &t.comb {
        w.write_all(&c.check.to_le_bytes())?;
    }
    for c in &t.comb {
        w.write_all(&c.next.to_le_bytes())?;
    }
    for v in &t.base {
        w.write_all(&v.to_le_bytes())?;
    }
    for arr in [&t.default, &t.eob_trans, &t.rule_of] {
        for v in arr {
            w.write_all(&v.to_le_bytes())?;
        }
    }
    for m in &t.modes {
        let name_len = u16::try_from(m.name.len())
            .map_err(|_| anyhow!("mode name {:?} is too long", m.name))?;
        w.write_all(&m.state.to_le_bytes())?;
        w.write_all(&name_len.to_le_bytes())?;
        w.write_all(m.name.as_bytes())?;
    }
    w.flush()?;
    log::debug!(
        "[tables] wrote binary tables to {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    Ok(())
}

#[inline]
fn take_u32(buf: &mut &[u8]) -> Result<u32> {
    if buf.len() < 4 {
        bail!("truncated u32");
    }
    let mut le = [0u8; 4];
    le.copy_from_slice(&buf[..4]);
    *buf = &buf[4..];
    Ok(u32::from_le_bytes(le))
}

#[inline]
fn take_u16(buf: &mut &[u8]) -> Result<u16> {
    if buf.len() < 2 {
        bail!("truncated u16");
    }
    let mut le = [0u8; 2];
    le.copy_from_slice(&buf[..2]);
    *buf = &buf[2..];
    Ok(u16::from_le_bytes(le))
}

fn take_u16s(buf: &mut &[u8], n: usize) -> Result<Vec<u16>> {
    (0..n).map(|_| take_u16(buf)).collect()
}

pub fn load_tables_bin_bytes(mut data: &[u8]) -> Result<Tables> {
    if data.len() < 8 + 4 * 3 + 2 * 4 {
        bail!("bin too short");
    }
    if &data[..8] != BIN_MAGIC {
        bail!("bad magic in tables .bin");
    }
    data = &data[8..];

    let n_states = take_u32(&mut data)? as usize;
    let comb_len = take_u32(&mut data)? as usize;
    let n_modes = take_u32(&mut data)? as usize;
    let n_classes = take_u16(&mut data)?;
    let eob_state = take_u16(&mut data)?;
    let default_state = take_u16(&mut data)?;
    let flags = take_u16(&mut data)?;

    let mut char_class = [0u16; 256];
    for slot in char_class.iter_mut() {
        *slot = take_u16(&mut data)?;
    }
    let check = take_u16s(&mut data, comb_len)?;
    let next = take_u16s(&mut data, comb_len)?;
    let base = (0..n_states)
        .map(|_| take_u32(&mut data))
        .collect::<Result<Vec<_>>>()?;
    let default = take_u16s(&mut data, n_states)?;
    let eob_trans = take_u16s(&mut data, n_states)?;
    let rule_of = take_u16s(&mut data, n_states)?;

    let mut modes = Vec::with_capacity(n_modes.min(data.len() / 4));
    for _ in 0..n_modes {
        let state = take_u16(&mut data)?;
        let len = take_u16(&mut data)? as usize;
        if data.len() < len {
            bail!("truncated mode name");
        }
        let name = std::str::from_utf8(&data[..len])
            .context("mode name is not UTF-8")?
            .to_string();
        data = &data[len..];
        modes.push(ModeInfo { name, state });
    }

    let tables = Tables {
        char_class,
        n_classes,
        comb: check
            .into_iter()
            .zip(next)
            .map(|(check, next)| Comb { check, next })
            .collect(),
        base,
        default,
        eob_trans,
        rule_of,
        eob_state,
        default_state,
        modes,
        line_start_modes: flags & 1 != 0,
    };
    tables.validate()?;
    Ok(tables)
}
