// src/dev/generator.rs
//! Random inputs that the bundled `calc` lexer accepts without a single
//! diagnostic. Shared by `fuzz_lex`, `perf_one` and the size-sweep tests.

use rand::Rng;

/// Generates at least `target_len` bytes of valid `calc` source.
pub fn gen_valid_source<R: Rng>(rng: &mut R, target_len: usize) -> String {
    let mut out = String::with_capacity(target_len + target_len / 8);

    while out.len() < target_len {
        let roll = rng.random_range(0u32..100);

        match roll {
            0..=21 => push_ident(rng, &mut out),
            22..=31 => push_int(rng, &mut out),
            32..=37 => push_float(rng, &mut out),
            38..=49 => push_ws(rng, &mut out),
            50..=54 => push_line_comment(rng, &mut out),
            55..=61 => push_block_comment(rng, &mut out, 0),
            62..=67 => push_string(rng, &mut out),
            68..=69 => push_hash_comment(rng, &mut out),
            70..=71 => out.push_str("BEGIN "),
            72..=99 => push_operator(rng, &mut out),
            _ => unreachable!(),
        }
    }

    // a '/' right at the end must not turn into an unfinished comment
    out.push('\n');
    out
}

fn push_ident<R: Rng>(rng: &mut R, out: &mut String) {
    let len = rng.random_range(1..=12);
    out.push(random_alpha(rng));
    for _ in 1..len {
        if rng.random_bool(0.6) {
            out.push(random_alpha(rng));
        } else {
            out.push(random_digit(rng));
        }
    }
    // keeps the next number from gluing onto the identifier
    out.push(' ');
}

fn push_digits<R: Rng>(rng: &mut R, out: &mut String, max: usize) {
    let len = rng.random_range(1..=max);
    for _ in 0..len {
        out.push(random_digit(rng));
    }
}

fn push_int<R: Rng>(rng: &mut R, out: &mut String) {
    push_digits(rng, out, 8);
    out.push(' ');
}

fn push_float<R: Rng>(rng: &mut R, out: &mut String) {
    push_digits(rng, out, 4);
    if rng.random_bool(0.7) {
        out.push('.');
        push_digits(rng, out, 4);
    }
    if rng.random_bool(0.4) {
        out.push(if rng.random_bool(0.5) { 'e' } else { 'E' });
        match rng.random_range(0..3) {
            0 => out.push('-'),
            1 => out.push('+'),
            _ => {}
        }
        push_digits(rng, out, 3);
    }
    out.push(' ');
}

fn push_ws<R: Rng>(rng: &mut R, out: &mut String) {
    let opts: [char; 4] = [' ', '\t', '\r', '\n'];
    let len = rng.random_range(1..=8);
    for _ in 0..len {
        let i = rng.random_range(0..opts.len());
        out.push(opts[i]);
    }
}

fn push_line_comment<R: Rng>(rng: &mut R, out: &mut String) {
    out.push_str("//");
    let len = rng.random_range(0..=40);
    const ALPH: &str =
        "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 +-*/&|![]{}()<>=*&\"#";
    let bytes = ALPH.as_bytes();
    for _ in 0..len {
        let i = rng.random_range(0..bytes.len());
        out.push(bytes[i] as char);
    }
    out.push('\n');
}

fn push_hash_comment<R: Rng>(rng: &mut R, out: &mut String) {
    out.push_str("\n#");
    let len = rng.random_range(0..=20);
    for _ in 0..len {
        out.push(random_alpha(rng));
    }
    out.push('\n');
}

fn push_block_comment<R: Rng>(rng: &mut R, out: &mut String, depth: u32) {
    out.push_str("/*");
    let chunks = rng.random_range(0..=15);
    // no '/', no '*' and no '"' so the body can't close, open or quote anything
    const BODY: &str =
        "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 +-![]{}()<>=&|";
    let bytes = BODY.as_bytes();
    for _ in 0..chunks {
        let k = rng.random_range(1..=8);
        for _ in 0..k {
            let i = rng.random_range(0..bytes.len());
            out.push(bytes[i] as char);
        }
        if rng.random_bool(0.2) {
            out.push('*');
            out.push(' ');
        }
        if rng.random_bool(0.2) {
            out.push('\n');
        }
        if depth < 3 && rng.random_bool(0.05) {
            push_block_comment(rng, out, depth + 1);
        }
    }
    out.push_str("*/");
}

fn push_string<R: Rng>(rng: &mut R, out: &mut String) {
    out.push('"');
    let len = rng.random_range(0..=24);
    const BODY: &str = "abcdefghijklmnopqrstuvwxyz0123456789 +-*/()#'\t";
    let bytes = BODY.as_bytes();
    for _ in 0..len {
        match rng.random_range(0..20) {
            0 => out.push_str("\\\\"),
            1 => out.push_str("\\\""),
            _ => {
                let i = rng.random_range(0..bytes.len());
                out.push(bytes[i] as char);
            }
        }
    }
    out.push('"');
}

fn push_operator<R: Rng>(rng: &mut R, out: &mut String) {
    let ops = [
        "(", ")", "+", "-", "*", "=", "/", "!", "[", "]", "{", "}", "<", ">", ",", ";", "&", "|",
    ];
    let i = rng.random_range(0..ops.len());
    out.push_str(ops[i]);
    // '/' followed by '/' or '*' would start a comment
    if ops[i] == "/" || rng.random_bool(0.25) {
        out.push(' ');
    }
}

fn random_alpha<R: Rng>(rng: &mut R) -> char {
    let set = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
    let i = rng.random_range(0..set.len());
    set[i] as char
}

fn random_digit<R: Rng>(rng: &mut R) -> char {
    let set = b"0123456789";
    let i = rng.random_range(0..set.len());
    set[i] as char
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn reaches_target_length() {
        let mut rng = StdRng::seed_from_u64(7);
        for target in [0, 1, 50, 4096] {
            assert!(gen_valid_source(&mut rng, target).len() >= target);
        }
    }
}
