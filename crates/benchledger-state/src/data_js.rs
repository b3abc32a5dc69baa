//! Document encodings.
//!
//! A history document is persisted either as plain JSON or as the script
//! form loaded directly by chart pages:
//!
//! ```text
//! window.BENCHMARK_DATA = { "lastUpdate": ..., "repoUrl": ..., "entries": { ... } }
//! ```

use std::path::Path;

use crate::error::StorageError;
use crate::schema::Document;
use crate::storage_traits::StorageResult;

/// Assignment prefix of the script form.
pub const SCRIPT_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// On-disk encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Pretty-printed JSON object.
    Json,
    /// JSON object assigned to `window.BENCHMARK_DATA`.
    Script,
}

impl DocumentFormat {
    /// `.js` files use the script form; everything else is JSON.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("js") => DocumentFormat::Script,
            _ => DocumentFormat::Json,
        }
    }

    pub fn encode(self, document: &Document) -> StorageResult<Vec<u8>> {
        let json = serde_json::to_string_pretty(document)?;
        let text = match self {
            DocumentFormat::Json => format!("{json}\n"),
            DocumentFormat::Script => format!("{SCRIPT_PREFIX}{json}\n"),
        };
        Ok(text.into_bytes())
    }

    /// Decode either encoding; the script prefix is optional for both so a
    /// file renamed between `.js` and `.json` still loads.
    pub fn decode(self, bytes: &[u8]) -> StorageResult<Document> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Malformed(format!("not utf-8: {e}")))?;
        let body = text.trim_start();
        let body = body.strip_prefix(SCRIPT_PREFIX).unwrap_or(body);
        let body = body.trim_end().trim_end_matches(';');
        serde_json::from_str(body).map_err(|e| StorageError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1742109651755,
  "repoUrl": "https://github.com/skanehira/yui",
  "entries": {
    "Rust Benchmark": [
      {
        "commit": {
          "author": {
            "email": "sho19921005@gmail.com",
            "name": "skanehira",
            "username": "skanehira"
          },
          "committer": {
            "email": "sho19921005@gmail.com",
            "name": "skanehira",
            "username": "skanehira"
          },
          "distinct": true,
          "id": "41a39930a0a5dc15bb34f624f47c4f18fd2d88b6",
          "message": "init",
          "timestamp": "2025-03-15T09:57:47+09:00",
          "tree_id": "4f345d91835a21713efe869cfd6f911185799382",
          "url": "https://github.com/skanehira/yui/commit/41a39930a0a5dc15bb34f624f47c4f18fd2d88b6"
        },
        "date": 1742000418980,
        "tool": "cargo",
        "benches": [
          {
            "name": "tests::bench_fib",
            "value": 18.02,
            "range": "± 0.10",
            "unit": "ns/iter"
          },
          {
            "name": "tests::bench_parse",
            "value": 135,
            "range": "± 24",
            "unit": "ns/iter"
          }
        ]
      }
    ]
  }
}
"#;

    #[test]
    fn decodes_chart_page_script() {
        let doc = DocumentFormat::Script.decode(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.last_update, 1742109651755);
        let history = doc.tool_history("Rust Benchmark");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].benches[0].margin(), Some(0.10));
        assert_eq!(history[0].benches[1].value, 135.0);
        assert_eq!(history[0].commit.author.username.as_deref(), Some("skanehira"));
    }

    #[test]
    fn script_encoding_is_stable() {
        let doc = DocumentFormat::Script.decode(SAMPLE.as_bytes()).unwrap();
        let encoded = DocumentFormat::Script.encode(&doc).unwrap();
        assert_eq!(String::from_utf8(encoded).unwrap(), SAMPLE);
    }

    #[test]
    fn json_decoder_accepts_script_prefix() {
        let doc = DocumentFormat::Json.decode(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.repo_url, "https://github.com/skanehira/yui");
    }

    #[test]
    fn format_by_extension() {
        assert_eq!(DocumentFormat::for_path(Path::new("dev/bench/data.js")), DocumentFormat::Script);
        assert_eq!(DocumentFormat::for_path(Path::new("history.json")), DocumentFormat::Json);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = DocumentFormat::Json.decode(b"{ nope").unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }
}
