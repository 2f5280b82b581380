// src/bin/fuzz_lex.rs
// Generate random-but-valid calc inputs and scan each one twice: once with a
// minimal buffer fed through tiny reads, once with a large buffer. The two
// token streams must be identical and diagnostic-free.
//   - FUZZ_SAVE=1 and FUZZ_DIR=... save generated fuzz cases
//   - FUZZ_INPUT=path         replay a saved case
//   - FUZZ_EX=<files>         comma/colon-separated list of handcrafted .calc files
//   - FUZZ_EX_DIR=<dir>       directory of .calc files (default: "lexer_tests")
//   - FUZZ_LEN / FUZZ_ITERS / FUZZ_SEED / FUZZ_CHUNK
//
// Sidecar golden files: <case>.tokens.json with {"tokens":[{"kind":"...", "text":"..."}...]}

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result, bail};
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use tablescan::{
    dev::generator::gen_valid_source,
    lexer::{
        ChunkedSource, CollectingReporter, MemorySource, ScannerConfig, Token,
        buffer::MIN_BUFFER_SIZE,
        grammars::calc,
    },
};

#[derive(serde::Deserialize)]
struct Golden {
    tokens: Vec<GoldenTok>,
}
#[derive(serde::Deserialize)]
struct GoldenTok {
    kind: String,
    text: String,
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

struct Scan {
    tokens: Vec<Token>,
    diagnostics: usize,
    error: Option<String>,
}

fn scan(src: &[u8], buffer_size: usize, chunk: Option<usize>) -> Result<Scan> {
    let mut s = calc::scanner()?
        .with_config(ScannerConfig::default().with_buffer_size(buffer_size))
        .with_reporter(CollectingReporter::default());
    let mem = MemorySource::new(src.to_vec());
    match chunk {
        Some(n) => s.begin_source(ChunkedSource::new(mem, n))?,
        None => s.begin_source(mem)?,
    }
    let mut tokens = Vec::new();
    let mut error = None;
    for t in s.tokens() {
        match t {
            Ok(t) => tokens.push(t),
            Err(e) => {
                error = Some(e.to_string());
                break;
            }
        }
    }
    for d in &s.reporter().diagnostics {
        eprintln!("  [diag] {d}");
    }
    Ok(Scan {
        tokens,
        diagnostics: s.reporter().diagnostics.len(),
        error,
    })
}

fn first_divergence_idx(a: &[Token], b: &[Token]) -> usize {
    a.iter()
        .zip(b.iter())
        .position(|(x, y)| x != y)
        .unwrap_or(a.len().min(b.len()))
}

fn dump_near(tiny: &[Token], large: &[Token], from: usize) {
    let lo = from.saturating_sub(1);
    let hi = (from + 3).min(tiny.len().max(large.len()));
    eprintln!("--- context tokens [{lo}..{hi}) ---");
    for i in lo..hi {
        let t = tiny.get(i).map(|t| (calc::kind_name(t.kind), t.pos, t.text_lossy()));
        let l = large.get(i).map(|t| (calc::kind_name(t.kind), t.pos, t.text_lossy()));
        let mark = if t == l { "✅" } else { "❌" };
        eprintln!("{mark} #{i:06} TINY={t:?}  LARGE={l:?}");
    }
}

fn check_against_golden(label: &str, toks: &[Token], golden: &Golden) -> bool {
    if toks.len() != golden.tokens.len() {
        eprintln!(
            "[golden:{label}] count mismatch: got={} expected={}",
            toks.len(),
            golden.tokens.len()
        );
        return false;
    }
    for (i, (t, exp)) in toks.iter().zip(golden.tokens.iter()).enumerate() {
        let kind = calc::kind_name(t.kind);
        let text = t.text_lossy();
        if kind != exp.kind || text != exp.text {
            eprintln!(
                "[golden:{label}] mismatch at {i}:\n  got:  kind={kind} text={text:?}\n  want: kind={} text={:?}",
                exp.kind, exp.text
            );
            return false;
        }
    }
    true
}

fn load_golden_for(case: &Path) -> Option<Golden> {
    let p = case.with_extension("tokens.json");
    let s = fs::read_to_string(&p).ok()?;
    match serde_json::from_str::<Golden>(&s) {
        Ok(g) => Some(g),
        Err(e) => {
            eprintln!("[golden] failed to parse {}: {e}", p.display());
            None
        }
    }
}

fn run_once(src: &[u8], label: &str, chunk: usize, golden_for: Option<&Path>) -> Result<bool> {
    let t0 = Instant::now();
    let (tiny, large) = rayon::join(
        || scan(src, MIN_BUFFER_SIZE, Some(chunk)),
        || scan(src, 1 << 20, None),
    );
    let (tiny, large) = (tiny?, large?);
    let ms = t0.elapsed().as_millis();

    let mut ok = tiny.tokens == large.tokens && tiny.error == large.error;
    if let Some(e) = &large.error {
        eprintln!("[{label}] scan error: {e}");
        ok = false;
    }
    if tiny.diagnostics + large.diagnostics != 0 {
        eprintln!("[{label}] unexpected diagnostics");
        ok = false;
    }
    eprintln!(
        "[{label}] {} bytes | {} ms | tokens = {} -> {}",
        src.len(),
        ms,
        large.tokens.len(),
        if ok { "OK" } else { "MISMATCH!" }
    );
    if !ok {
        let i = first_divergence_idx(&tiny.tokens, &large.tokens);
        dump_near(&tiny.tokens, &large.tokens, i);
    }

    if let Some(p) = golden_for {
        match load_golden_for(p) {
            Some(g) => ok &= check_against_golden(label, &large.tokens, &g),
            None => eprintln!("[golden] no sidecar found for {}", p.display()),
        }
    }
    Ok(ok)
}

fn collect_examples() -> Vec<PathBuf> {
    if let Ok(list) = std::env::var("FUZZ_EX") {
        let out: Vec<PathBuf> = list
            .split([',', ':'])
            .map(|part| PathBuf::from(part.trim()))
            .filter(|p| !p.as_os_str().is_empty() && p.exists())
            .collect();
        if !out.is_empty() {
            return out;
        }
    }

    let dir = std::env::var("FUZZ_EX_DIR").unwrap_or_else(|_| "lexer_tests".into());
    let Ok(rd) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut out: Vec<PathBuf> = rd
        .flatten()
        .map(|ent| ent.path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("calc"))
        })
        .collect();
    out.sort();
    out
}

#[derive(serde::Serialize)]
struct CaseMeta<'a> {
    unix_ts: u64,
    seed: u64,
    iter: usize,
    actual_bytes: usize,
    note: &'a str,
}

fn save_case(dir: &str, seed: u64, iter: usize, src: &str) -> Result<PathBuf> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let path = Path::new(dir).join(format!("case_s{seed}_i{iter}_n{}.calc", src.len()));
    fs::write(&path, src.as_bytes()).with_context(|| format!("writing {}", path.display()))?;

    let meta = CaseMeta {
        unix_ts: ts,
        seed,
        iter,
        actual_bytes: src.len(),
        note: "Replay with: FUZZ_INPUT=<this file> cargo run --bin fuzz_lex",
    };
    let meta_path = path.with_extension("json");
    let mut f = fs::File::create(&meta_path)?;
    writeln!(f, "{}", serde_json::to_string_pretty(&meta)?)?;
    Ok(path)
}

fn main() -> Result<()> {
    let chunk = env_usize("FUZZ_CHUNK", 7);

    if let Ok(path) = std::env::var("FUZZ_INPUT") {
        eprintln!("[replay] reading {path}");
        let src = fs::read(&path).with_context(|| format!("reading {path}"))?;
        if !run_once(&src, "replay", chunk, None)? {
            bail!("replay mismatch");
        }
        return Ok(());
    }

    let examples = collect_examples();
    if !examples.is_empty() {
        eprintln!("[ex] running {} handcrafted example(s)…", examples.len());
        for (j, p) in examples.iter().enumerate() {
            let src = fs::read(p).with_context(|| format!("reading {}", p.display()))?;
            if !run_once(&src, &format!("ex {j}"), chunk, Some(p))? {
                bail!("example {} failed", p.display());
            }
        }
    }

    let save_cases = std::env::var("FUZZ_SAVE").ok().as_deref() == Some("1");
    let out_dir = std::env::var("FUZZ_DIR").unwrap_or_else(|_| "fuzz-cases".to_string());
    let len = env_usize("FUZZ_LEN", 1_000_000);
    let iters = env_usize("FUZZ_ITERS", 3);
    let seed = env_u64("FUZZ_SEED", 42);

    eprintln!("[fuzz] len={len} iters={iters} seed={seed} chunk={chunk}");
    if save_cases {
        fs::create_dir_all(&out_dir).with_context(|| format!("creating {out_dir}"))?;
    }

    // Each iteration gets its own derived seed so they can run in parallel.
    let cases: Vec<(usize, String)> = (0..iters)
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed ^ (i as u64).wrapping_mul(0x9E3779B97F4A7C15));
            (i, gen_valid_source(&mut rng, len))
        })
        .collect();

    if save_cases {
        for (i, src) in &cases {
            let path = save_case(&out_dir, seed, *i, src)?;
            eprintln!("[save] wrote {}", path.display());
        }
    }

    let failures: Vec<usize> = cases
        .par_iter()
        .filter_map(|(i, src)| match run_once(src.as_bytes(), &format!("fuzz {i}"), chunk, None) {
            Ok(true) => None,
            Ok(false) => Some(*i),
            Err(e) => {
                eprintln!("[fuzz {i}] {e:#}");
                Some(*i)
            }
        })
        .collect();

    if !failures.is_empty() {
        bail!("{} of {iters} iteration(s) failed: {failures:?}", failures.len());
    }
    eprintln!("[fuzz] all iterations matched ✅");
    Ok(())
}
