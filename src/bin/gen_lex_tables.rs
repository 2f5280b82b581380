// src/bin/gen_lex_tables.rs
use std::{fs, path::Path};

use anyhow::{Context, Result};
use tablescan::lexer::{
    grammars::Grammar,
    tables::{save_tables_bin, save_tables_json},
};

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "tables".to_string());
    let out_dir = Path::new(&out_dir);
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    for grammar in Grammar::ALL {
        println!("[gen_lex_tables] building {} tables...", grammar.name());
        let tables = grammar.tables()?;

        let json = out_dir.join(format!("{}_tables.json", grammar.name()));
        save_tables_json(&json, &tables)?;
        let bin = out_dir.join(format!("{}_tables.bin", grammar.name()));
        save_tables_bin(&bin, &tables)?;

        let bytes = fs::metadata(&bin).map(|m| m.len()).unwrap_or(0);
        println!(
            "[gen_lex_tables] {}: {} states, {} classes, {} comb cells; wrote {} and {} ({} bytes, ~{:.1} KiB)",
            grammar.name(),
            tables.n_states() - 1,
            tables.n_classes,
            tables.comb.len(),
            json.display(),
            bin.display(),
            bytes,
            bytes as f64 / 1024.0
        );
    }
    Ok(())
}
