//! Abstract capability boundary to the external history store.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::history::{HistoryEntry, HistorySearchQuery, VisitRecord};

/// Provider of raw browsing-history data. Implementations wrap whatever
/// history store the embedding application has access to; the aggregation
/// pipeline only depends on this trait.
#[async_trait]
pub trait VisitSource: Send + Sync {
    /// Return coarse URL-level entries overlapping the query window, at most
    /// `max_results` of them. A failure here is terminal for the whole
    /// aggregation.
    async fn search_history(&self, query: &HistorySearchQuery) -> AppResult<Vec<HistoryEntry>>;

    /// Return the individual visit timestamps recorded for `url`. May fail
    /// per call; the aggregator recovers with a single-visit fallback.
    async fn get_visits(&self, url: &str) -> AppResult<Vec<VisitRecord>>;
}
