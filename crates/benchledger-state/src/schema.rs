//! Schema definitions for the benchmark history document
//!
//! One [`Document`] per repository:
//! - `lastUpdate`: epoch milliseconds of the newest ingestion
//! - `repoUrl`: repository the history belongs to
//! - `entries`: tool key → append-ordered [`Entry`] list
//!
//! Field names and ordering follow the persisted layout so a document
//! written by this crate reads back byte-identical.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, Serializer};

/// Epoch time in milliseconds.
pub type EpochMillis = i64;

/// Name, email and (optional) forge username of a commit author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Commit metadata captured once from CI at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub author: Identity,
    pub committer: Identity,
    #[serde(default = "default_distinct")]
    pub distinct: bool,
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<FixedOffset>,
    pub tree_id: String,
    pub url: String,
}

fn default_distinct() -> bool {
    true
}

impl CommitInfo {
    /// Minimal commit record: author doubles as committer, tree and URL empty.
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        author: Identity,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            committer: author.clone(),
            author,
            distinct: true,
            id: id.into(),
            message: message.into(),
            timestamp,
            tree_id: String::new(),
            url: String::new(),
        }
    }

    /// First 7 characters of the commit id, the way forges abbreviate it.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}

/// One named benchmark result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    #[serde(serialize_with = "serialize_value")]
    pub value: f64,
    /// Error margin as reported by the tool, e.g. `"± 0.10"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub unit: String,
    /// Free-form extra text some tools attach (sample counts etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            range: None,
            unit: unit.into(),
            extra: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Numeric error margin parsed from `range`.
    ///
    /// Accepts `"± 0.10"`, `"+/- 0.10"` and bare numbers; thousands
    /// separators are ignored. Returns `None` when absent or unparseable.
    pub fn margin(&self) -> Option<f64> {
        self.range.as_deref().and_then(parse_margin)
    }
}

// Largest magnitude below which every integral f64 is exact in an i64.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Integral values are written without a fractional part (`135`, not
/// `135.0`), the way chart pages and other producers of the layout write
/// them, so re-encoding a stored entry reproduces its bytes.
fn serialize_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let v = *value;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < EXACT_INT_LIMIT {
        serializer.serialize_i64(v as i64)
    } else {
        serializer.serialize_f64(v)
    }
}

/// Parse an error-margin string such as `"± 1,204"` into a non-negative number.
pub fn parse_margin(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed
        .strip_prefix('±')
        .or_else(|| trimmed.strip_prefix("+/-"))
        .or_else(|| trimmed.strip_prefix("+-"))
        .unwrap_or(trimmed)
        .trim()
        .replace(',', "");
    number
        .parse::<f64>()
        .ok()
        .filter(|m| m.is_finite())
        .map(f64::abs)
}

/// One ingestion event: commit metadata plus its measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub commit: CommitInfo,
    pub date: EpochMillis,
    /// Producing tool kind (e.g. `"cargo"`).
    pub tool: String,
    pub benches: Vec<Measurement>,
}

impl Entry {
    pub fn new(
        commit: CommitInfo,
        date: EpochMillis,
        tool: impl Into<String>,
        benches: Vec<Measurement>,
    ) -> Self {
        Self {
            commit,
            date,
            tool: tool.into(),
            benches,
        }
    }

    /// Look up a measurement by name.
    pub fn bench(&self, name: &str) -> Option<&Measurement> {
        self.benches.iter().find(|m| m.name == name)
    }
}

/// Full benchmark history of one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "lastUpdate")]
    pub last_update: EpochMillis,
    #[serde(rename = "repoUrl")]
    pub repo_url: String,
    /// Tool key → append-ordered history.
    pub entries: BTreeMap<String, Vec<Entry>>,
}

impl Document {
    /// Empty history for a repository.
    pub fn empty(repo_url: impl Into<String>) -> Self {
        Self {
            last_update: 0,
            repo_url: repo_url.into(),
            entries: BTreeMap::new(),
        }
    }

    /// History for one tool key; empty when the tool was never ingested.
    pub fn tool_history(&self, tool: &str) -> &[Entry] {
        self.entries.get(tool).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of entries across every tool.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Return a new document with `entry` appended to `tool`'s history.
    ///
    /// Existing entries are carried over untouched and `lastUpdate` never
    /// moves backwards.
    pub fn with_entry(&self, tool: &str, entry: Entry) -> Document {
        let mut next = self.clone();
        next.last_update = next.last_update.max(entry.date);
        next.entries.entry(tool.to_string()).or_default().push(entry);
        next
    }
}
