use serde::{Deserialize, Serialize};

/// A coarse URL-level history item. One entry may stand for many discrete
/// visits; `last_visit_time` is the most recent of them, in epoch
/// milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_visit_time: Option<i64>,
}

/// One timestamped visit to a URL (epoch milliseconds).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub visit_time: i64,
}

/// Bulk query issued to the visit source. Timestamps are epoch milliseconds;
/// `max_results` bounds memory and latency on large histories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySearchQuery {
    pub start_time: i64,
    pub end_time: i64,
    pub max_results: usize,
}
