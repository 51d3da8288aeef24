use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed category taxonomy. The categorizer only ever emits these labels;
/// consumers must treat labels they do not recognize gracefully, since the
/// taxonomy can grow independently of any presentation mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Social,
    Entertainment,
    Shopping,
    News,
    Search,
    Finance,
    Education,
    Ai,
    Other,
}

impl Category {
    /// Every emittable label, in rule-table declaration order with `other`
    /// last. Used to pre-seed `category_stats` at zero.
    pub const ALL: [Category; 10] = [
        Category::Work,
        Category::Social,
        Category::Entertainment,
        Category::Shopping,
        Category::News,
        Category::Search,
        Category::Finance,
        Category::Education,
        Category::Ai,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Social => "social",
            Category::Entertainment => "entertainment",
            Category::Shopping => "shopping",
            Category::News => "news",
            Category::Search => "search",
            Category::Finance => "finance",
            Category::Education => "education",
            Category::Ai => "ai",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate totals for one unique domain in the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStat {
    pub domain: String,
    pub visits: u64,
    /// Most recent coarse `last_visit_time` seen for this domain (epoch ms).
    pub last_visit: i64,
}

/// Aggregate totals for one unique page (URL truncated to a fixed key length).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStat {
    pub url: String,
    pub title: String,
    pub visits: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
    pub days: i64,
}

/// Snapshot of one aggregation run over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    /// Unique domains sorted descending by visits, capped at 20. The cap
    /// never hides counts from `total_visits` or `unique_domains`.
    pub top_domains: Vec<DomainStat>,
    /// Unique pages sorted descending by visits, capped at 50.
    pub top_pages: Vec<PageStat>,
    /// Visit counters by local hour of day, index 0-23.
    pub hourly_activity: Vec<u64>,
    /// Visit counters by local day of week, index 0 = Sunday.
    pub daily_activity: Vec<u64>,
    /// Per-category visit counts, pre-seeded with every taxonomy label at 0.
    pub category_stats: BTreeMap<Category, u64>,
    pub today_visits: u64,
    pub total_visits: u64,
    /// Number of coarse history entries the bulk query returned.
    pub total_items: u64,
    pub unique_domains: u64,
    /// Epoch milliseconds at which this snapshot was computed.
    pub fetched_at: i64,
    pub date_range: DateRange,
}

/// Reduced snapshot for the "today" popup view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStats {
    pub today_visits: u64,
    pub top_domains: Vec<DomainStat>,
    pub hourly_activity: Vec<u64>,
}

/// Analytics request. A default-window query covers the last `days` days and
/// is cacheable; supplying both custom timestamps (epoch ms) makes the query
/// non-repeating and bypasses the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQueryParams {
    #[serde(default = "default_window_days")]
    pub days: i64,
    #[serde(default)]
    pub start_timestamp: Option<i64>,
    #[serde(default)]
    pub end_timestamp: Option<i64>,
}

impl AnalyticsQueryParams {
    pub fn window(days: i64) -> Self {
        Self {
            days,
            start_timestamp: None,
            end_timestamp: None,
        }
    }

    pub fn custom_range(days: i64, start: i64, end: i64) -> Self {
        Self {
            days,
            start_timestamp: Some(start),
            end_timestamp: Some(end),
        }
    }

    /// True when the caller pinned an explicit start of the range. Such
    /// queries never touch the cache.
    pub fn is_custom_range(&self) -> bool {
        self.start_timestamp.is_some()
    }
}

impl Default for AnalyticsQueryParams {
    fn default() -> Self {
        Self {
            days: default_window_days(),
            start_timestamp: None,
            end_timestamp: None,
        }
    }
}

fn default_window_days() -> i64 {
    30
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

impl Default for ReportFormat {
    fn default() -> Self {
        ReportFormat::Markdown
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExportParams {
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(flatten)]
    pub query: AnalyticsQueryParams,
}

impl Default for ReportExportParams {
    fn default() -> Self {
        Self {
            format: ReportFormat::Markdown,
            query: AnalyticsQueryParams::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExportResult {
    pub file_path: String,
    pub format: ReportFormat,
    pub generated_at: String,
}
