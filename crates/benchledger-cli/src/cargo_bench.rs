//! Parser for libtest `cargo bench` output.
//!
//! Only result lines are recognised:
//!
//! ```text
//! test fib_20 ... bench:      31,416 ns/iter (+/- 1,212)
//! ```
//!
//! Everything else (compile progress, `running N tests`, ignored tests) is
//! skipped.

use std::sync::OnceLock;

use benchledger_core::Measurement;
use regex::Regex;

fn bench_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^test (.+?)\s+\.\.\. bench:\s+([0-9,.]+) (\S+) \(\+/- ([0-9,.]+)\)\s*$")
            .expect("valid regex")
    })
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

/// Extract one measurement per bench result line, in output order.
pub fn parse(output: &str) -> Vec<Measurement> {
    output
        .lines()
        .filter_map(|line| {
            let caps = bench_line().captures(line.trim_end())?;
            let value = parse_number(&caps[2])?;
            let margin = parse_number(&caps[4])?;
            Some(Measurement::new(caps[1].trim(), value, &caps[3]).with_range(format!("± {margin}")))
        })
        .collect()
}
