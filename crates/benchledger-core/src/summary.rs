//! Markdown summary of an ingestion's decisions.
//!
//! Produces the body a notifier can post as a pull-request comment or job
//! summary. Posting it is the notifier's business.

use benchledger_state::CommitInfo;

use crate::detector::{Decision, OkReason, Verdict};

fn fmt_value(v: f64, unit: &str) -> String {
    format!("{v} {unit}")
}

fn fmt_ratio(ratio: f64) -> String {
    format!("{:+.2}%", ratio * 100.0)
}

fn row(decision: &Decision) -> String {
    let current = fmt_value(decision.value, &decision.unit);
    let (previous, ratio, status) = match &decision.verdict {
        Verdict::Ok(OkReason::InsufficientHistory) => ("-".to_string(), "-".to_string(), "new"),
        Verdict::Ok(OkReason::ZeroBaseline) => {
            (fmt_value(0.0, &decision.unit), "-".to_string(), "ok")
        }
        Verdict::Ok(OkReason::WithinThreshold { baseline, ratio }) => {
            (fmt_value(*baseline, &decision.unit), fmt_ratio(*ratio), "ok")
        }
        Verdict::Alert(a) => (fmt_value(a.baseline, &decision.unit), fmt_ratio(a.ratio), "**regression**"),
        Verdict::Inconclusive(a) => {
            (fmt_value(a.baseline, &decision.unit), fmt_ratio(a.ratio), "inconclusive")
        }
    };
    let status = if decision.unit_mismatch.is_some() {
        format!("{status} (unit changed)")
    } else {
        status.to_string()
    };
    format!(
        "| `{}` | {} | {} | {} | {} |\n",
        decision.name, current, previous, ratio, status
    )
}

/// Render all decisions of one ingestion as a Markdown table, headed by a
/// warning banner when any measurement regressed.
pub fn render_markdown(tool: &str, commit: &CommitInfo, decisions: &[Decision]) -> String {
    let alerts = decisions.iter().filter(|d| d.is_alert()).count();

    let mut md = if alerts > 0 {
        format!(
            "# :warning: Performance Alert :warning:\n\n\
             Possible performance regression in **{tool}** at `{}`: \
             {alerts} of {} benchmarks exceeded their threshold.\n",
            commit.short_id(),
            decisions.len(),
        )
    } else {
        format!(
            "# Benchmark results: {tool}\n\nNo regressions at `{}`.\n",
            commit.short_id()
        )
    };

    let previous: String = decisions
        .iter()
        .find_map(|d| d.previous_commit.as_deref())
        .map(|p| p.chars().take(7).collect())
        .unwrap_or_else(|| "-".to_string());
    md.push_str(&format!(
        "\n| Benchmark | Current: `{}` | Previous: `{previous}` | Change | Status |\n",
        commit.short_id(),
    ));
    md.push_str("|---|---|---|---|---|\n");
    for decision in decisions {
        md.push_str(&row(decision));
    }
    md
}
