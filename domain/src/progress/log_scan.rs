//! Progress detection in engine log output.

use regex::Regex;
use std::sync::LazyLock;

static SAFETENSORS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"model[-_](\d+)[-_]of[-_](\d+)\.safetensors:?\s+(\d+)%").expect("valid regex")
});
static TOKENIZER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(tokenizer_config|vocab|merges)\.json:?\s+(\d+)%").expect("valid regex")
});
static FETCHING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Fetching (\d+) files:?\s+(\d+)%").expect("valid regex"));

/// Progress announced by a single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogProgress {
    pub artifact_name: String,
    pub completed: u64,
    pub total: u64,
}

impl LogProgress {
    fn percent(artifact_name: String, pct: &str) -> Option<Self> {
        Some(Self {
            artifact_name,
            completed: pct.parse().ok()?,
            total: 100,
        })
    }
}

/// Match a line against the known progress shapes.
///
/// Weight shards, tokenizer assets and multi-file fetches are recognized;
/// anything else yields `None`.
pub fn scan_progress_line(line: &str) -> Option<LogProgress> {
    if let Some(c) = SAFETENSORS_RE.captures(line) {
        let name = format!("model-{}-of-{}.safetensors", &c[1], &c[2]);
        return LogProgress::percent(name, &c[3]);
    }
    if let Some(c) = TOKENIZER_RE.captures(line) {
        return LogProgress::percent(format!("{}.json", &c[1]), &c[2]);
    }
    if let Some(c) = FETCHING_RE.captures(line) {
        return LogProgress::percent(format!("fetching_{}_files", &c[1]), &c[2]);
    }
    None
}
