use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use tempfile::tempdir;

use browselens::error::AppResult;
use browselens::models::analytics::{
    AnalyticsQueryParams, Category, ReportExportParams, ReportFormat,
};
use browselens::models::history::{HistoryEntry, HistorySearchQuery, VisitRecord};
use browselens::services::history_service::{Clock, HistoryService, HistoryServiceConfig};
use browselens::services::visit_source::VisitSource;
use browselens::utils::logger::init_logging;

struct MockVisitSource {
    entries: Vec<HistoryEntry>,
    visits: HashMap<String, Vec<VisitRecord>>,
    search_calls: AtomicUsize,
}

impl MockVisitSource {
    fn new(entries: Vec<HistoryEntry>, visits: HashMap<String, Vec<VisitRecord>>) -> Self {
        Self {
            entries,
            visits,
            search_calls: AtomicUsize::new(0),
        }
    }

    fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisitSource for MockVisitSource {
    async fn search_history(&self, query: &HistorySearchQuery) -> AppResult<Vec<HistoryEntry>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .iter()
            .take(query.max_results)
            .cloned()
            .collect())
    }

    async fn get_visits(&self, url: &str) -> AppResult<Vec<VisitRecord>> {
        Ok(self.visits.get(url).cloned().unwrap_or_default())
    }
}

struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    fn advance(&self, duration: Duration) {
        let mut guard = self.now.lock().expect("clock lock");
        *guard += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().expect("clock lock")
    }
}

fn entry(url: &str, title: Option<&str>, last_visit_time: Option<i64>) -> HistoryEntry {
    HistoryEntry {
        url: url.to_string(),
        title: title.map(|t| t.to_string()),
        last_visit_time,
    }
}

fn visit(visit_time: i64) -> VisitRecord {
    VisitRecord { visit_time }
}

// Wednesday 2026-08-12 15:30 UTC.
fn fixed_now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("offset")
        .with_ymd_and_hms(2026, 8, 12, 15, 30, 0)
        .single()
        .expect("fixed now")
}

// The `TempDir` guard must outlive the service so the reports directory is
// cleaned up when the test ends.
fn service_with(
    source: Arc<MockVisitSource>,
    clock: Arc<ManualClock>,
) -> (HistoryService, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let config = HistoryServiceConfig {
        reports_dir: dir.path().to_path_buf(),
        ..HistoryServiceConfig::default()
    };
    let service = HistoryService::with_clock(source, config, clock).expect("history service");
    (service, dir)
}

#[tokio::test]
async fn aggregation_classifies_and_counts_visits_end_to_end() {
    init_logging().expect("logging init");

    let now = fixed_now();
    let t1 = (now - Duration::hours(2)).timestamp_millis();
    let t2 = (now - Duration::hours(1)).timestamp_millis();
    let t3 = (now - Duration::hours(26)).timestamp_millis();

    let mut visits = HashMap::new();
    visits.insert(
        "https://github.com/x".to_string(),
        vec![visit(t1), visit(t2)],
    );
    visits.insert("https://netflix.com/watch".to_string(), vec![visit(t3)]);

    let source = Arc::new(MockVisitSource::new(
        vec![
            entry("https://github.com/x", Some("x repo"), Some(t2)),
            entry("https://netflix.com/watch", None, Some(t3)),
        ],
        visits,
    ));
    let clock = Arc::new(ManualClock::new(now));
    let (service, _reports_dir) = service_with(source.clone(), clock);

    let result = service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("analytics");

    assert_eq!(result.total_visits, 3);
    assert_eq!(result.total_items, 2);
    assert_eq!(result.unique_domains, 2);
    assert_eq!(result.today_visits, 2);

    assert_eq!(result.top_domains.len(), 2);
    assert_eq!(result.top_domains[0].domain, "github.com");
    assert_eq!(result.top_domains[0].visits, 2);
    assert_eq!(result.top_domains[0].last_visit, t2);
    assert_eq!(result.top_domains[1].domain, "netflix.com");
    assert_eq!(result.top_domains[1].visits, 1);

    assert_eq!(result.category_stats[&Category::Work], 2);
    assert_eq!(result.category_stats[&Category::Entertainment], 1);
    // Every taxonomy label is present even with zero visits.
    for category in Category::ALL {
        assert!(result.category_stats.contains_key(&category), "{category}");
    }

    // Totals equal the per-domain and per-category sums.
    let domain_sum: u64 = result.top_domains.iter().map(|d| d.visits).sum();
    let category_sum: u64 = result.category_stats.values().sum();
    assert_eq!(result.total_visits, domain_sum);
    assert_eq!(result.total_visits, category_sum);

    // 13:30 and 14:30 today, 13:30 yesterday.
    assert_eq!(result.hourly_activity[13], 2);
    assert_eq!(result.hourly_activity[14], 1);
    assert_eq!(result.daily_activity[3], 2); // Wednesday
    assert_eq!(result.daily_activity[2], 1); // Tuesday

    // Explicit titles are kept; a missing title falls back to the URL.
    let github_page = result
        .top_pages
        .iter()
        .find(|page| page.url == "https://github.com/x")
        .expect("github page");
    assert_eq!(github_page.title, "x repo");
    assert_eq!(github_page.visits, 2);
    let netflix_page = result
        .top_pages
        .iter()
        .find(|page| page.url == "https://netflix.com/watch")
        .expect("netflix page");
    assert_eq!(netflix_page.title, "https://netflix.com/watch");

    assert_eq!(result.date_range.days, 30);
    assert_eq!(result.fetched_at, now.timestamp_millis());
}

#[tokio::test]
async fn top_lists_are_capped_but_totals_are_not() {
    let now = fixed_now();
    let t = (now - Duration::hours(1)).timestamp_millis();

    let mut entries = Vec::new();
    let mut visits = HashMap::new();
    for i in 0..25u64 {
        let url = format!("https://site-{i:02}.example/page");
        // site-00 gets the most visits, descending from there.
        let count = 25 - i;
        entries.push(entry(&url, Some("page"), Some(t)));
        visits.insert(url, (0..count).map(|_| visit(t)).collect());
    }

    let source = Arc::new(MockVisitSource::new(entries, visits));
    let clock = Arc::new(ManualClock::new(now));
    let (service, _reports_dir) = service_with(source, clock);

    let result = service
        .fetch_analytics(AnalyticsQueryParams::window(7))
        .await
        .expect("analytics");

    assert_eq!(result.top_domains.len(), 20);
    assert_eq!(result.unique_domains, 25);
    assert_eq!(result.total_visits, (1..=25).sum::<u64>());

    for pair in result.top_domains.windows(2) {
        assert!(pair[0].visits >= pair[1].visits);
    }
    assert_eq!(result.top_domains[0].domain, "site-00.example");
}

#[tokio::test]
async fn entry_cap_truncates_the_result_set_instead_of_failing() {
    let now = fixed_now();
    let t = (now - Duration::hours(1)).timestamp_millis();

    let mut entries = Vec::new();
    let mut visits = HashMap::new();
    for i in 0..10 {
        let url = format!("https://site-{i}.example/");
        entries.push(entry(&url, Some("page"), Some(t)));
        visits.insert(url, vec![visit(t)]);
    }

    let source = Arc::new(MockVisitSource::new(entries, visits));
    let clock = Arc::new(ManualClock::new(now));
    let dir = tempdir().expect("temp dir");
    let config = HistoryServiceConfig {
        max_results: 4,
        reports_dir: dir.path().to_path_buf(),
        ..HistoryServiceConfig::default()
    };
    let service = HistoryService::with_clock(source, config, clock).expect("history service");

    let result = service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("exceeding the cap must truncate, not fail");

    // Only the first `max_results` entries are aggregated together.
    assert_eq!(result.total_items, 4);
    assert_eq!(result.total_visits, 4);
    assert_eq!(result.unique_domains, 4);
    assert_eq!(result.top_domains[0].domain, "site-0.example");
}

#[tokio::test]
async fn default_window_results_are_cached_for_the_ttl() {
    let now = fixed_now();
    let t = (now - Duration::hours(1)).timestamp_millis();
    let mut visits = HashMap::new();
    visits.insert("https://github.com/x".to_string(), vec![visit(t)]);

    let source = Arc::new(MockVisitSource::new(
        vec![entry("https://github.com/x", Some("x"), Some(t))],
        visits,
    ));
    let clock = Arc::new(ManualClock::new(now));
    let (service, _reports_dir) = service_with(source.clone(), clock.clone());

    let first = service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("first fetch");
    clock.advance(Duration::minutes(2));
    let second = service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("second fetch");

    assert_eq!(first.fetched_at, second.fetched_at);
    assert_eq!(source.search_calls(), 1);

    // Past the TTL the slot is stale and the window is recomputed.
    clock.advance(Duration::minutes(4));
    let third = service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("third fetch");
    assert_ne!(first.fetched_at, third.fetched_at);
    assert_eq!(source.search_calls(), 2);
}

#[tokio::test]
async fn custom_ranges_bypass_the_cache_entirely() {
    let now = fixed_now();
    let now_ms = now.timestamp_millis();
    let t = (now - Duration::hours(1)).timestamp_millis();
    let mut visits = HashMap::new();
    visits.insert("https://github.com/x".to_string(), vec![visit(t)]);

    let source = Arc::new(MockVisitSource::new(
        vec![entry("https://github.com/x", Some("x"), Some(t))],
        visits,
    ));
    let clock = Arc::new(ManualClock::new(now));
    let (service, _reports_dir) = service_with(source.clone(), clock);

    let range = AnalyticsQueryParams::custom_range(30, t - 1_000, now_ms);
    service
        .fetch_analytics(range.clone())
        .await
        .expect("first custom fetch");
    service.fetch_analytics(range).await.expect("second custom fetch");
    assert_eq!(source.search_calls(), 2);

    // Custom ranges never populate the slot, so the default window still
    // computes fresh.
    service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("default window");
    assert_eq!(source.search_calls(), 3);
}

#[tokio::test]
async fn clear_cache_and_window_changes_force_recomputation() {
    let now = fixed_now();
    let t = (now - Duration::hours(1)).timestamp_millis();
    let mut visits = HashMap::new();
    visits.insert("https://github.com/x".to_string(), vec![visit(t)]);

    let source = Arc::new(MockVisitSource::new(
        vec![entry("https://github.com/x", Some("x"), Some(t))],
        visits,
    ));
    let clock = Arc::new(ManualClock::new(now));
    let (service, _reports_dir) = service_with(source.clone(), clock.clone());

    service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("warm the slot");
    assert_eq!(source.search_calls(), 1);

    // A different window size misses the single slot.
    service
        .fetch_analytics(AnalyticsQueryParams::window(7))
        .await
        .expect("seven day window");
    assert_eq!(source.search_calls(), 2);

    // The slot now holds the 7-day result, so 30 days recomputes too.
    service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("thirty day window");
    assert_eq!(source.search_calls(), 3);

    assert!(service.clear_cache());
    clock.advance(Duration::seconds(1));
    let after_clear = service
        .fetch_analytics(AnalyticsQueryParams::window(30))
        .await
        .expect("after clear");
    assert_eq!(source.search_calls(), 4);
    assert_eq!(after_clear.fetched_at, clock.now().timestamp_millis());
}

#[tokio::test]
async fn today_stats_cover_the_local_calendar_day_and_cap_domains() {
    let now = fixed_now();
    let this_morning = (now - Duration::hours(5)).timestamp_millis();
    let yesterday = (now - Duration::hours(20)).timestamp_millis();

    let mut entries = Vec::new();
    let mut visits = HashMap::new();
    for (i, domain) in ["github.com", "reddit.com", "youtube.com", "etsy.com"]
        .into_iter()
        .enumerate()
    {
        let url = format!("https://{domain}/");
        let count = 4 - i;
        entries.push(entry(&url, Some(domain), Some(this_morning)));
        visits.insert(url, (0..count).map(|_| visit(this_morning)).collect());
    }
    entries.push(entry("https://old.example/", None, Some(yesterday)));
    visits.insert("https://old.example/".to_string(), vec![visit(yesterday)]);

    let source = Arc::new(MockVisitSource::new(entries, visits));
    let clock = Arc::new(ManualClock::new(now));
    let (service, _reports_dir) = service_with(source, clock);

    let stats = service.today_stats().await;
    // 4 + 3 + 2 + 1 visits this morning; yesterday's visit falls outside
    // the day window and is filtered out.
    assert_eq!(stats.today_visits, 10);
    assert_eq!(stats.top_domains.len(), 3);
    assert_eq!(stats.top_domains[0].domain, "github.com");
    assert_eq!(stats.top_domains[0].visits, 4);
    assert_eq!(stats.hourly_activity[10], 10); // 10:30 local
}

#[tokio::test]
async fn report_export_writes_json_and_markdown() {
    let now = fixed_now();
    let t = (now - Duration::hours(1)).timestamp_millis();
    let mut visits = HashMap::new();
    visits.insert("https://github.com/x".to_string(), vec![visit(t)]);

    let source = Arc::new(MockVisitSource::new(
        vec![entry("https://github.com/x", Some("x"), Some(t))],
        visits,
    ));
    let clock = Arc::new(ManualClock::new(now));
    let dir = tempdir().expect("temp dir");
    let config = HistoryServiceConfig {
        reports_dir: dir.path().to_path_buf(),
        ..HistoryServiceConfig::default()
    };
    let service = HistoryService::with_clock(source, config, clock).expect("service");

    let json_export = service
        .export_report(ReportExportParams {
            format: ReportFormat::Json,
            query: AnalyticsQueryParams::window(30),
        })
        .await
        .expect("json export");
    let payload = std::fs::read_to_string(&json_export.file_path).expect("json file");
    let parsed: serde_json::Value = serde_json::from_str(&payload).expect("valid json");
    assert_eq!(parsed["totalVisits"], 1);
    assert_eq!(parsed["categoryStats"]["work"], 1);

    let md_export = service
        .export_report(ReportExportParams {
            format: ReportFormat::Markdown,
            query: AnalyticsQueryParams::window(30),
        })
        .await
        .expect("markdown export");
    let report = std::fs::read_to_string(&md_export.file_path).expect("markdown file");
    assert!(report.contains("# Browsing Analytics Report"));
    assert!(report.contains("github.com"));
}
