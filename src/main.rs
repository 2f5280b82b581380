// src/main.rs
use std::env;

use tablescan::lexer::{
    CollectingReporter, ScannerConfig, Severity,
    grammars::{Grammar, calc, expr},
};

const SAMPLE: &str = r#"
# calc sample
BEGIN
    foo = 12 + bar /* outer /* inner */ still outer */ (7) // hello
    baz=3.25e-1/*multi
    line*/+qux;
    msg = "say \"hi\"\\n";
"#;

fn main() -> anyhow::Result<()> {
    // tablescan [expr|calc] [path]
    let mut args = env::args().skip(1);
    let grammar = match args.next() {
        Some(name) => Grammar::parse(&name)?,
        None => Grammar::Calc,
    };
    let path = args.next();
    let config = ScannerConfig::from_env();

    let (tokens, diags) = match grammar {
        Grammar::Calc => {
            let mut s = calc::scanner()?
                .with_config(config)
                .with_reporter(CollectingReporter::default());
            match &path {
                Some(p) => s.begin_file(p)?,
                None => s.begin_memory(SAMPLE)?,
            }
            let tokens = s.tokens().collect::<Result<Vec<_>, _>>();
            (tokens, s.reporter().diagnostics.clone())
        }
        Grammar::Expr => {
            let mut s = expr::scanner()?
                .with_config(config)
                .with_reporter(CollectingReporter::default());
            match &path {
                Some(p) => s.begin_file(p)?,
                None => s.begin_memory("a = b + (c * d);\nx - y / z")?,
            }
            let tokens = s.tokens().collect::<Result<Vec<_>, _>>();
            (tokens, s.reporter().diagnostics.clone())
        }
    };

    match tokens {
        Ok(tokens) => {
            println!("TOKENS:");
            for t in &tokens {
                println!(
                    "{:>4}:{:<3} {:<8} {:?}",
                    t.pos.line,
                    t.pos.column,
                    grammar.kind_name(t.kind),
                    t.text_lossy()
                );
            }
        }
        Err(e) => eprintln!("scan error: {e}"),
    }
    for d in &diags {
        eprintln!("{d}");
    }
    if diags.iter().any(|d| d.severity == Severity::Fatal) {
        std::process::exit(1);
    }
    Ok(())
}
