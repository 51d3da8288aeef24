//! Windowed aggregation of browsing history into dashboard analytics.
//!
//! One aggregation run pulls coarse entries from the [`VisitSource`],
//! resolves each entry's individual visit timestamps, classifies it, and
//! folds everything into an [`AnalyticsResult`]. Results for the default
//! (non-custom-range) window are memoized in a single-slot cache for a
//! short TTL.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, TimeZone, Timelike};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::analytics::{
    AnalyticsQueryParams, AnalyticsResult, Category, DateRange, DomainStat, PageStat,
    ReportExportParams, ReportExportResult, ReportFormat, TodayStats,
};
use crate::models::history::{HistoryEntry, HistorySearchQuery, VisitRecord};
use crate::services::categorizer::{categorize, extract_domain};
use crate::services::visit_source::VisitSource;
use crate::utils::format::{day_name, format_number, hour_label, percentage, truncate_url};

const CACHE_TTL_SECONDS: i64 = 300;
const MAX_HISTORY_RESULTS: usize = 10_000;
const TOP_DOMAINS_LIMIT: usize = 20;
const TOP_PAGES_LIMIT: usize = 50;
const TODAY_TOP_DOMAINS: usize = 3;
const PAGE_KEY_MAX_CHARS: usize = 150;
const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;
const REPORT_PREFIX: &str = "browsing-report";
const MS_PER_DAY: i64 = 86_400_000;

/// Source of "now" for TTL checks and local-time bucketing. Injected so the
/// cache and the today/hour/day logic are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryServiceConfig {
    /// Cap on coarse entries per bulk query; exceeding it truncates silently.
    pub max_results: usize,
    pub cache_ttl: Duration,
    /// Deadline applied to every visit-source call so a hung source cannot
    /// hang the caller.
    pub source_timeout: StdDuration,
    pub reports_dir: PathBuf,
}

impl Default for HistoryServiceConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_HISTORY_RESULTS,
            cache_ttl: Duration::seconds(CACHE_TTL_SECONDS),
            source_timeout: StdDuration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
            reports_dir: std::env::temp_dir().join("browselens-reports"),
        }
    }
}

#[derive(Clone)]
struct CachedAnalytics {
    result: AnalyticsResult,
    computed_at: i64,
    window_days: i64,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedQuery {
    start: i64,
    end: i64,
    days: i64,
    /// Custom-range queries are considered non-repeating and neither read
    /// nor populate the cache.
    cacheable: bool,
}

#[derive(Default)]
struct DomainAccum {
    visits: u64,
    last_visit: i64,
    order: usize,
}

struct PageAccum {
    url: String,
    title: String,
    visits: u64,
    order: usize,
}

pub struct HistoryService {
    visit_source: Arc<dyn VisitSource>,
    clock: Arc<dyn Clock>,
    config: HistoryServiceConfig,
    cache: RwLock<Option<CachedAnalytics>>,
}

impl HistoryService {
    pub fn new(visit_source: Arc<dyn VisitSource>) -> AppResult<Self> {
        Self::with_config(visit_source, HistoryServiceConfig::default())
    }

    pub fn with_config(
        visit_source: Arc<dyn VisitSource>,
        config: HistoryServiceConfig,
    ) -> AppResult<Self> {
        Self::with_clock(visit_source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        visit_source: Arc<dyn VisitSource>,
        config: HistoryServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        std::fs::create_dir_all(&config.reports_dir)?;
        Ok(Self {
            visit_source,
            clock,
            config,
            cache: RwLock::new(None),
        })
    }

    /// Aggregate analytics for the requested window. Default-window queries
    /// are served from the cache while fresh; any failure of the bulk fetch
    /// is terminal and yields no partial result.
    pub async fn fetch_analytics(
        &self,
        params: AnalyticsQueryParams,
    ) -> AppResult<AnalyticsResult> {
        let resolved = self.resolve_query(&params)?;

        if resolved.cacheable {
            if let Some(cached) = self.try_get_cache(resolved.days) {
                debug!(target: "app::history::cache", days = resolved.days, "analytics cache hit");
                return Ok(cached);
            }
        }

        let result = self.compute_analytics(&resolved).await?;

        if resolved.cacheable {
            self.insert_cache(resolved.days, result.clone());
        }

        Ok(result)
    }

    /// Reduced stats for the current local calendar day. Always custom-range
    /// (so never cached), and never fails: an unavailable source yields
    /// empty stats so the popup can still render.
    pub async fn today_stats(&self) -> TodayStats {
        let now = self.clock.now();
        let now_ms = now.timestamp_millis();
        let today_start = now_ms - millis_since_midnight(&now);

        let params = AnalyticsQueryParams::custom_range(1, today_start, now_ms);
        match self.fetch_analytics(params).await {
            Ok(result) => TodayStats {
                today_visits: result.total_visits,
                top_domains: result
                    .top_domains
                    .into_iter()
                    .take(TODAY_TOP_DOMAINS)
                    .collect(),
                hourly_activity: result.hourly_activity,
            },
            Err(err) => {
                warn!(target: "app::history", error = %err, "today stats unavailable, returning empty stats");
                TodayStats::default()
            }
        }
    }

    /// Unconditionally invalidate the cached result.
    pub fn clear_cache(&self) -> bool {
        match self.cache.write() {
            Ok(mut guard) => {
                *guard = None;
                debug!(target: "app::history::cache", "analytics cache cleared");
                true
            }
            Err(_) => false,
        }
    }

    /// Write a report file for the requested window under
    /// `config.reports_dir` and return its path.
    pub async fn export_report(
        &self,
        params: ReportExportParams,
    ) -> AppResult<ReportExportResult> {
        let result = self.fetch_analytics(params.query.clone()).await?;

        let timestamp = self.clock.now().format("%Y%m%dT%H%M%S");
        let filename = format!(
            "{REPORT_PREFIX}-{timestamp}.{}",
            params.format.file_extension()
        );
        let path = self.config.reports_dir.join(filename);

        match params.format {
            ReportFormat::Markdown => {
                std::fs::write(&path, render_markdown_report(&result))?;
            }
            ReportFormat::Json => {
                std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
            }
        }

        debug!(target: "app::history", path = %path.display(), "exported analytics report");
        Ok(ReportExportResult {
            file_path: path.to_string_lossy().to_string(),
            format: params.format,
            generated_at: self.clock.now().to_rfc3339(),
        })
    }

    fn resolve_query(&self, params: &AnalyticsQueryParams) -> AppResult<ResolvedQuery> {
        let now_ms = self.clock.now().timestamp_millis();

        let (start, end) = match (params.start_timestamp, params.end_timestamp) {
            (Some(start), Some(end)) => (start, end),
            _ => (now_ms - params.days * MS_PER_DAY, now_ms),
        };

        if start > end {
            return Err(AppError::validation("analytics window start is after end"));
        }

        Ok(ResolvedQuery {
            start,
            end,
            days: params.days,
            cacheable: !params.is_custom_range(),
        })
    }

    async fn compute_analytics(&self, resolved: &ResolvedQuery) -> AppResult<AnalyticsResult> {
        let now = self.clock.now();
        let now_ms = now.timestamp_millis();
        let offset = *now.offset();
        let today_start_ms = now_ms - millis_since_midnight(&now);

        let query = HistorySearchQuery {
            start_time: resolved.start,
            end_time: resolved.end,
            max_results: self.config.max_results,
        };

        let mut entries = match timeout(
            self.config.source_timeout,
            self.visit_source.search_history(&query),
        )
        .await
        {
            Ok(Ok(entries)) => entries,
            Ok(Err(err)) => return Err(AppError::source_unavailable(err.to_string())),
            Err(_) => return Err(AppError::source_unavailable("bulk history fetch timed out")),
        };
        entries.truncate(self.config.max_results);

        let mut domain_stats: HashMap<String, DomainAccum> = HashMap::new();
        let mut page_stats: HashMap<String, PageAccum> = HashMap::new();
        let mut hourly_activity = vec![0u64; 24];
        let mut daily_activity = vec![0u64; 7];
        let mut category_stats: BTreeMap<Category, u64> =
            Category::ALL.iter().map(|category| (*category, 0)).collect();
        let mut total_visits = 0u64;
        let mut today_visits = 0u64;

        for entry in &entries {
            let domain = extract_domain(&entry.url);

            let visits = match self.entry_visits(entry, resolved.start, resolved.end).await {
                Ok(visits) => visits,
                Err(err) => {
                    // Partial-failure tolerance: one bad record must not
                    // abort the aggregation. Count the entry as a single
                    // visit at its last known time.
                    debug!(
                        target: "app::history",
                        url = %entry.url,
                        error = %err,
                        "visit detail fetch failed, using single-visit fallback"
                    );
                    vec![VisitRecord {
                        visit_time: entry.last_visit_time.unwrap_or(now_ms),
                    }]
                }
            };

            let visit_count = visits.len() as u64;
            if visit_count == 0 {
                continue;
            }
            total_visits += visit_count;

            let next_order = domain_stats.len();
            let domain_accum = domain_stats.entry(domain.clone()).or_insert(DomainAccum {
                order: next_order,
                ..DomainAccum::default()
            });
            domain_accum.visits += visit_count;
            domain_accum.last_visit = domain_accum
                .last_visit
                .max(entry.last_visit_time.unwrap_or(0));

            let page_key: String = entry.url.chars().take(PAGE_KEY_MAX_CHARS).collect();
            let next_order = page_stats.len();
            let page_accum = page_stats.entry(page_key).or_insert_with(|| PageAccum {
                url: entry.url.clone(),
                title: entry
                    .title
                    .clone()
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| entry.url.clone()),
                visits: 0,
                order: next_order,
            });
            page_accum.visits += visit_count;

            // Classified once per coarse entry, counted once per visit.
            let category = categorize(&domain, &entry.url);
            *category_stats.entry(category).or_insert(0) += visit_count;

            for visit in &visits {
                if let Some(local) = offset.timestamp_millis_opt(visit.visit_time).single() {
                    hourly_activity[local.hour() as usize] += 1;
                    daily_activity[local.weekday().num_days_from_sunday() as usize] += 1;
                }
                if visit.visit_time >= today_start_ms {
                    today_visits += 1;
                }
            }
        }

        let unique_domains = domain_stats.len() as u64;
        let top_domains = rank_domains(domain_stats)
            .into_iter()
            .take(TOP_DOMAINS_LIMIT)
            .collect();
        let top_pages = rank_pages(page_stats)
            .into_iter()
            .take(TOP_PAGES_LIMIT)
            .collect();

        Ok(AnalyticsResult {
            top_domains,
            top_pages,
            hourly_activity,
            daily_activity,
            category_stats,
            today_visits,
            total_visits,
            total_items: entries.len() as u64,
            unique_domains,
            fetched_at: now_ms,
            date_range: DateRange {
                start: resolved.start,
                end: resolved.end,
                days: resolved.days,
            },
        })
    }

    /// Fetch and window-filter the individual visits for one coarse entry.
    /// Returns `Err` on any source failure or deadline so the caller can
    /// apply the single-visit fallback in one place.
    async fn entry_visits(
        &self,
        entry: &HistoryEntry,
        start: i64,
        end: i64,
    ) -> AppResult<Vec<VisitRecord>> {
        let visits = match timeout(
            self.config.source_timeout,
            self.visit_source.get_visits(&entry.url),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(AppError::Other(format!(
                    "visit detail fetch timed out for {}",
                    entry.url
                )))
            }
        };

        Ok(visits
            .into_iter()
            .filter(|visit| visit.visit_time >= start && visit.visit_time <= end)
            .collect())
    }

    fn try_get_cache(&self, days: i64) -> Option<AnalyticsResult> {
        let now_ms = self.clock.now().timestamp_millis();
        self.cache
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .and_then(|entry| {
                let fresh = now_ms - entry.computed_at < self.config.cache_ttl.num_milliseconds();
                if entry.window_days == days && fresh {
                    Some(entry.result)
                } else {
                    None
                }
            })
    }

    fn insert_cache(&self, days: i64, result: AnalyticsResult) {
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(CachedAnalytics {
                computed_at: result.fetched_at,
                window_days: days,
                result,
            });
        }
    }
}

fn millis_since_midnight(now: &DateTime<FixedOffset>) -> i64 {
    now.num_seconds_from_midnight() as i64 * 1000 + now.timestamp_subsec_millis() as i64
}

/// Sort descending by visits; ties keep discovery order via the fold's
/// insertion counter.
fn rank_domains(stats: HashMap<String, DomainAccum>) -> Vec<DomainStat> {
    let mut ranked: Vec<(usize, DomainStat)> = stats
        .into_iter()
        .map(|(domain, accum)| {
            (
                accum.order,
                DomainStat {
                    domain,
                    visits: accum.visits,
                    last_visit: accum.last_visit,
                },
            )
        })
        .collect();
    ranked.sort_by(|a, b| b.1.visits.cmp(&a.1.visits).then(a.0.cmp(&b.0)));
    ranked.into_iter().map(|(_, stat)| stat).collect()
}

fn rank_pages(stats: HashMap<String, PageAccum>) -> Vec<PageStat> {
    let mut ranked: Vec<(usize, PageStat)> = stats
        .into_values()
        .map(|accum| {
            (
                accum.order,
                PageStat {
                    url: accum.url,
                    title: accum.title,
                    visits: accum.visits,
                },
            )
        })
        .collect();
    ranked.sort_by(|a, b| b.1.visits.cmp(&a.1.visits).then(a.0.cmp(&b.0)));
    ranked.into_iter().map(|(_, stat)| stat).collect()
}

fn render_markdown_report(result: &AnalyticsResult) -> String {
    let mut content = String::new();
    content.push_str("# Browsing Analytics Report\n\n");
    content.push_str(&format!(
        "Window: {} day(s) ({} .. {})\n\n",
        result.date_range.days, result.date_range.start, result.date_range.end
    ));

    content.push_str("## Summary\n");
    content.push_str(&format!(
        "- Total visits: {}\n- Unique domains: {}\n- Pages seen: {}\n- Visits today: {}\n\n",
        format_number(result.total_visits),
        result.unique_domains,
        result.total_items,
        format_number(result.today_visits)
    ));

    content.push_str("## Top domains\n");
    for stat in result.top_domains.iter().take(10) {
        content.push_str(&format!(
            "- {}: {} visits ({})\n",
            stat.domain,
            stat.visits,
            percentage(stat.visits, result.total_visits)
        ));
    }
    content.push('\n');

    content.push_str("## Categories\n");
    for (category, count) in &result.category_stats {
        content.push_str(&format!(
            "- {}: {} ({})\n",
            category,
            count,
            percentage(*count, result.total_visits)
        ));
    }
    content.push('\n');

    if let Some(peak_hour) = max_index(&result.hourly_activity) {
        content.push_str(&format!("Peak hour: {}\n", hour_label(peak_hour)));
    }
    if let Some(busiest_day) = max_index(&result.daily_activity) {
        content.push_str(&format!("Busiest day: {}\n", day_name(busiest_day)));
    }
    content.push('\n');

    content.push_str("## Top pages\n");
    for stat in result.top_pages.iter().take(10) {
        content.push_str(&format!(
            "- {} ({} visits): {}\n",
            stat.title,
            stat.visits,
            truncate_url(&stat.url, 50)
        ));
    }

    content
}

/// Index of the first maximum, or `None` when all counters are zero.
fn max_index(counters: &[u64]) -> Option<usize> {
    let (index, max) = counters
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    if *max == 0 {
        None
    } else {
        Some(index)
    }
}
