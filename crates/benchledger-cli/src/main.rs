//! benchledger - benchmark history CLI
//!
//! The `benchledger` command appends CI benchmark runs to a repository's
//! history file and flags regressions against earlier runs.
//!
//! ## Commands
//!
//! - `ingest`: Append one run (JSON report or `cargo bench` output) and
//!   evaluate it against the alert policy
//! - `show`: Print stored runs
//! - `export`: Write the history as JSON or `data.js` for chart pages

mod cargo_bench;

use anyhow::{Context, Result};
use benchledger_core::{
    render_markdown, AlertPolicy, CommitInfo, CoordinatorConfig, Decision, Document,
    DocumentFormat, Entry, ExportView, FsHistoryStore, IngestOutcome, MergeCoordinator, OkReason,
    Verdict, METRICS,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "benchledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark history accumulation and regression alerts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a benchmark run to the history and check it for regressions
    Ingest(IngestArgs),

    /// Show stored runs
    Show {
        /// History file (`.js` for the data.js form, JSON otherwise)
        #[arg(long, env = "BENCHLEDGER_DATA")]
        data: PathBuf,

        /// Only show this tool's history
        #[arg(short, long)]
        tool: Option<String>,

        /// Maximum number of runs to show per tool (newest last)
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Write the history for chart pages
    Export {
        /// History file to read
        #[arg(long, env = "BENCHLEDGER_DATA")]
        data: PathBuf,

        /// Output file; a `.js` extension selects the data.js form
        #[arg(short, long)]
        output: PathBuf,

        /// Keep only the newest N runs of every tool
        #[arg(long)]
        max_items: Option<usize>,
    },
}

#[derive(Args, Debug, Clone)]
struct IngestArgs {
    /// History file (`.js` for the data.js form, JSON otherwise)
    #[arg(long, env = "BENCHLEDGER_DATA")]
    data: PathBuf,

    /// Repository the history belongs to
    #[arg(long, env = "BENCHLEDGER_REPO_URL")]
    repo_url: String,

    /// Tool key (benchmark suite name) the run is recorded under
    #[arg(long)]
    tool: String,

    /// Complete run report as JSON (commit, date, tool, benches)
    #[arg(long, required_unless_present = "cargo_bench", conflicts_with = "cargo_bench")]
    report: Option<PathBuf>,

    /// `cargo bench` output to parse
    #[arg(long, requires = "commit")]
    cargo_bench: Option<PathBuf>,

    /// Commit metadata as JSON (forge `head_commit` shape)
    #[arg(long)]
    commit: Option<PathBuf>,

    /// Tool kind recorded with parsed output
    #[arg(long, default_value = "cargo")]
    tool_kind: String,

    /// Run time in epoch milliseconds (default: now)
    #[arg(long)]
    date: Option<i64>,

    /// Alert policy file (TOML)
    #[arg(long, env = "BENCHLEDGER_POLICY")]
    policy: Option<PathBuf>,

    /// Attempts before giving up on concurrent writers
    #[arg(long, default_value = "5")]
    max_attempts: u32,

    /// Exit non-zero when any benchmark regressed
    #[arg(long)]
    fail_on_alert: bool,

    /// Write a Markdown summary of the decisions to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    benchledger_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Ingest(args) => cmd_ingest(&args).await.and_then(|outcome| {
            print_decisions(&outcome.decisions);
            check_alerts(&args, &outcome)
        }),
        Commands::Show { data, tool, limit } => cmd_show(&data, tool.as_deref(), limit).await,
        Commands::Export {
            data,
            output,
            max_items,
        } => cmd_export(&data, &output, max_items).await,
    };

    METRICS.flush();
    result
}

/// Append one run and return the committed outcome.
async fn cmd_ingest(args: &IngestArgs) -> Result<IngestOutcome> {
    let policy = match &args.policy {
        Some(path) => AlertPolicy::load(path)
            .with_context(|| format!("Failed to load alert policy {:?}", path))?,
        None => AlertPolicy::default(),
    };
    let entry = build_entry(args)?;

    let store = FsHistoryStore::new(&args.data, args.repo_url.clone());
    let coordinator = MergeCoordinator::with_config(
        store,
        CoordinatorConfig::with_max_attempts(args.max_attempts),
    );
    let commit = entry.commit.clone();

    let outcome = coordinator
        .ingest(&args.tool, entry, &policy)
        .await
        .with_context(|| format!("Failed to ingest run for '{}'", args.tool))?;

    info!(
        tool = %args.tool,
        version = %outcome.version,
        attempts = outcome.attempts,
        "run recorded"
    );

    if let Some(path) = &args.summary {
        let md = render_markdown(&args.tool, &commit, &outcome.decisions);
        std::fs::write(path, md).with_context(|| format!("Failed to write summary {:?}", path))?;
    }

    Ok(outcome)
}

fn check_alerts(args: &IngestArgs, outcome: &IngestOutcome) -> Result<()> {
    let alerts = outcome.alerts().count();
    if args.fail_on_alert && alerts > 0 {
        anyhow::bail!(
            "{} benchmark(s) in '{}' regressed past their threshold",
            alerts,
            args.tool
        );
    }
    Ok(())
}

fn build_entry(args: &IngestArgs) -> Result<Entry> {
    if let Some(report) = &args.report {
        return read_json_file(report);
    }

    let bench_path = args
        .cargo_bench
        .as_ref()
        .context("either --report or --cargo-bench is required")?;
    let commit_path = args
        .commit
        .as_ref()
        .context("--cargo-bench requires --commit")?;

    let output = std::fs::read_to_string(bench_path)
        .with_context(|| format!("Failed to read {:?}", bench_path))?;
    let benches = cargo_bench::parse(&output);
    if benches.is_empty() {
        anyhow::bail!("No benchmark results found in {:?}", bench_path);
    }
    let commit: CommitInfo = read_json_file(commit_path)?;
    let date = args
        .date
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    Ok(Entry::new(commit, date, args.tool_kind.clone(), benches))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse JSON in {:?}", path))
}

fn print_decisions(decisions: &[Decision]) {
    for decision in decisions {
        let status = match &decision.verdict {
            Verdict::Ok(OkReason::InsufficientHistory) => "new".to_string(),
            Verdict::Ok(OkReason::ZeroBaseline) => "ok (zero baseline)".to_string(),
            Verdict::Ok(OkReason::WithinThreshold { ratio, .. }) => {
                format!("ok ({:+.2}%)", ratio * 100.0)
            }
            Verdict::Alert(a) => format!("REGRESSION ({:+.2}% vs {})", a.ratio * 100.0, a.baseline),
            Verdict::Inconclusive(a) => {
                format!("inconclusive ({:+.2}% within noise)", a.ratio * 100.0)
            }
        };
        println!(
            "{:<40} {:>14} {:<10} {}",
            decision.name, decision.value, decision.unit, status
        );
        if let Some(w) = &decision.unit_mismatch {
            println!("    unit changed: {} -> {}", w.previous_unit, w.unit);
        }
    }
}

/// Print the newest `limit` runs of one or all tools.
async fn cmd_show(data: &Path, tool: Option<&str>, limit: usize) -> Result<()> {
    let view = ExportView::new(FsHistoryStore::open(data));
    let document = view
        .get()
        .await
        .with_context(|| format!("Failed to read {:?}", data))?;

    if document.entries.is_empty() && tool.is_none() {
        println!("No benchmark history in {:?}", data);
        return Ok(());
    }
    print!("{}", render_history(&document, tool, limit));
    Ok(())
}

/// Text listing of one snapshot; every tool is sliced from `document`.
fn render_history(document: &Document, tool: Option<&str>, limit: usize) -> String {
    let tools: Vec<&str> = match tool {
        Some(t) => vec![t],
        None => document.entries.keys().map(String::as_str).collect(),
    };

    let mut out = format!("repo: {}  lastUpdate: {}\n", document.repo_url, document.last_update);
    for tool in tools {
        let history = document.tool_history(tool);
        let shown = &history[history.len().saturating_sub(limit)..];
        out.push_str(&format!("\n{} ({} shown)\n", tool, shown.len()));
        for entry in shown {
            out.push_str(&format!(
                "  {} {} {}\n",
                entry.commit.short_id(),
                entry.commit.timestamp.to_rfc3339(),
                truncate(first_line(&entry.commit.message), 60)
            ));
            for bench in &entry.benches {
                let range = bench.range.as_deref().unwrap_or("");
                out.push_str(&format!(
                    "      {:<36} {:>14} {} {}\n",
                    bench.name, bench.value, bench.unit, range
                ));
            }
        }
    }
    out
}

/// Write the history (optionally trimmed) to `output`.
async fn cmd_export(data: &Path, output: &Path, max_items: Option<usize>) -> Result<()> {
    let view = ExportView::new(FsHistoryStore::open(data));
    let format = DocumentFormat::for_path(output);

    let bytes = match max_items {
        Some(max) => {
            let document = view.trimmed(max).await?;
            format.encode(&document)?
        }
        None => view.render(format).await?,
    };
    std::fs::write(output, bytes).with_context(|| format!("Failed to write {:?}", output))?;
    println!("Exported {:?} to {:?}", data, output);
    Ok(())
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
