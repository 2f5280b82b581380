//! Saved tables load back unchanged and drive the scanner identically.

use pretty_assertions::assert_eq;
use tablescan::lexer::{
    Scanner, Tables,
    grammars::{Grammar, calc},
    tables::{load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin, save_tables_json},
};

const SAMPLE: &str = "# header\nx = 12.5e3 + \"q\\\"\" /* a /* b */ */ BEGIN\n";

fn scan_all(tables: Tables) -> Vec<(u16, Vec<u8>)> {
    let modes = calc::modes_of(&tables).unwrap();
    let mut s = Scanner::new(tables, calc::actions(modes));
    s.begin_memory(SAMPLE).unwrap();
    s.tokens()
        .map(|t| {
            let t = t.unwrap();
            (t.kind.0, t.text)
        })
        .collect()
}

#[test]
fn json_and_binary_round_trip_every_grammar() {
    let dir = tempfile::tempdir().unwrap();
    for g in Grammar::ALL {
        let t = g.tables().unwrap();
        let json = dir.path().join(format!("{}.json", g.name()));
        let bin = dir.path().join(format!("{}.bin", g.name()));
        save_tables_json(&json, &t).unwrap();
        save_tables_bin(&bin, &t).unwrap();

        let from_json = load_tables_json_bytes(&std::fs::read(&json).unwrap()).unwrap();
        let from_bin = load_tables_bin_bytes(&std::fs::read(&bin).unwrap()).unwrap();
        assert_eq!(from_json, t);
        assert_eq!(from_bin, t);
    }
}

#[test]
fn loaded_tables_scan_like_built_ones() {
    let (built, _) = calc::tables().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calc.bin");
    save_tables_bin(&path, &built).unwrap();
    let loaded = load_tables_bin_bytes(&std::fs::read(&path).unwrap()).unwrap();

    let expected = scan_all(built);
    assert_eq!(expected.len(), 6);
    assert_eq!(scan_all(loaded), expected);
}

#[test]
fn corrupt_inputs_are_rejected() {
    let (t, _) = calc::tables().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calc.bin");
    save_tables_bin(&path, &t).unwrap();
    let bytes = std::fs::read(&path).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] ^= 0xFF;
    assert!(load_tables_bin_bytes(&bad_magic).is_err());

    for cut in [4, 40, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            load_tables_bin_bytes(&bytes[..cut]).is_err(),
            "truncated at {cut} should fail"
        );
    }

    assert!(load_tables_json_bytes(b"{\"n_classes\": 3").is_err());
    assert!(load_tables_json_bytes(b"[]").is_err());
}
