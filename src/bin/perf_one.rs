// src/bin/perf_one.rs
use std::{env, fs, path::PathBuf, time::Instant};

use rand::{SeedableRng, rngs::StdRng};
use tablescan::{
    dev::generator::gen_valid_source,
    lexer::{ScannerConfig, grammars::calc},
};

fn fmt_mib(bytes: u64) -> String {
    let mib = (bytes as f64) / (1024.0 * 1024.0);
    format!("{mib:.2} MiB")
}

fn throughput_mibs(bytes: u64, ms: f64) -> f64 {
    if ms <= 0.0 {
        return 0.0;
    }
    (bytes as f64) / (1024.0 * 1024.0) / (ms / 1_000.0)
}

fn parse_target_len() -> usize {
    // Default: 10,000,000 characters
    env::var("PERF_ONE_LEN")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000_000)
}

fn parse_seed() -> u64 {
    env::var("PERF_ONE_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(42)
}

fn main() -> anyhow::Result<()> {
    // If a path is supplied, we'll use it; otherwise we **generate** input in memory.
    let maybe_path = env::args().nth(1);

    let text = if let Some(path) = maybe_path {
        let p = PathBuf::from(path);
        let load_t0 = Instant::now();
        let src = match fs::read(&p) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to read {}: {e}", p.display());
                std::process::exit(2);
            }
        };
        let load_ms = load_t0.elapsed().as_secs_f64() * 1e3;
        let bytes = src.len() as u64;
        println!(
            "Input: file={}  ({} | {} bytes)",
            p.display(),
            fmt_mib(bytes),
            bytes
        );
        println!("Load:  {:.3} ms", load_ms);
        src
    } else {
        let target_len = parse_target_len();
        let seed = parse_seed();
        let gen_t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(seed);
        let src = gen_valid_source(&mut rng, target_len);
        let gen_ms = gen_t0.elapsed().as_secs_f64() * 1e3;
        let bytes = src.len() as u64;
        println!(
            "Input: generated in-memory (len={} | {}) [seed={}]",
            bytes,
            fmt_mib(bytes),
            seed
        );
        println!("Gen:   {:.3} ms", gen_ms);
        src.into_bytes()
    };

    let bytes = text.len() as u64;
    let config = ScannerConfig::from_env();
    println!("Buffer: {} bytes initial", config.buffer_size);

    let build_t0 = Instant::now();
    let mut scanner = calc::scanner()?.with_config(config);
    let build_ms = build_t0.elapsed().as_secs_f64() * 1e3;
    println!("Tables: built in {:.3} ms", build_ms);

    let scan_t0 = Instant::now();
    scanner.begin_memory(text)?;
    let mut tokens = 0usize;
    for t in scanner.tokens() {
        if let Err(e) = t {
            eprintln!("scan failed: {e}");
            std::process::exit(1);
        }
        tokens += 1;
    }
    let scan_ms = scan_t0.elapsed().as_secs_f64() * 1e3;
    println!(
        "Scan: {:.3} ms | tokens={} | throughput={:.1} MiB/s",
        scan_ms,
        tokens,
        throughput_mibs(bytes, scan_ms)
    );
    Ok(())
}
