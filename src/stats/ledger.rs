//! Points Ledger - append-only history of point awards
//!
//! The ledger itself is a single JSON array under `points_history`,
//! newest first, truncated to the most recent 1000 entries on append.
//! Per-day summaries live under `points_summary_<date>` and are updated
//! incrementally on each award, so ledger truncation never touches an
//! already-committed summary.

use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use super::date_key::{day_key, day_key_for_ms, Clock};
use super::models::{Category, DailySummary, PointHistoryEntry, PointSource};
use super::store::KvStore;

const HISTORY_KEY: &str = "points_history";
const SUMMARY_PREFIX: &str = "points_summary_";

/// Retention ceiling for the raw ledger
pub const HISTORY_RETENTION: usize = 1000;

fn summary_key(date: &str) -> String {
    format!("{SUMMARY_PREFIX}{date}")
}

/// Filters for `get_points_history`
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub source: Option<PointSource>,
    pub category: Option<Category>,
    /// Inclusive day key bound, "YYYY-MM-DD"
    pub start_date: Option<String>,
    /// Inclusive day key bound, "YYYY-MM-DD"
    pub end_date: Option<String>,
}

#[derive(Clone)]
pub struct PointsLedger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl PointsLedger {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append an award unconditionally, then update the same-day summary
    pub fn record_points(
        &self,
        source: PointSource,
        amount: u32,
        category: Category,
        description: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<PointHistoryEntry> {
        let entry = PointHistoryEntry {
            id: Uuid::new_v4().to_string(),
            source,
            amount,
            category,
            description: description.to_string(),
            timestamp: self.clock.now_ms(),
            metadata,
        };

        let mut history = self.load_history();
        history.insert(0, entry.clone());
        history.truncate(HISTORY_RETENTION);
        let json = serde_json::to_string(&history).context("Failed to serialize ledger")?;
        self.store.set(HISTORY_KEY, &json)?;

        self.update_daily_summary(&entry)?;
        Ok(entry)
    }

    /// Entries newest first, filtered and truncated to `limit`
    pub fn get_points_history(&self, limit: usize, filter: &HistoryFilter) -> Vec<PointHistoryEntry> {
        self.load_history()
            .into_iter()
            .filter(|e| filter.source.is_none_or(|s| e.source == s))
            .filter(|e| filter.category.is_none_or(|c| e.category == c))
            .filter(|e| {
                let day = day_key_for_ms(e.timestamp);
                filter.start_date.as_deref().is_none_or(|d| day.as_str() >= d)
                    && filter.end_date.as_deref().is_none_or(|d| day.as_str() <= d)
            })
            .take(limit)
            .collect()
    }

    /// Per-day rollup; zero-valued default when absent or unreadable
    pub fn get_daily_summary(&self, date: &str) -> DailySummary {
        match self.load_summary(date) {
            Ok(Some(summary)) => summary,
            Ok(None) => DailySummary::new(date),
            Err(e) => {
                tracing::warn!("Failed to load daily summary for {date}, using zeros: {e:#}");
                DailySummary::new(date)
            }
        }
    }

    /// Summaries for the last `n` days (today included), newest first
    pub fn get_recent_daily_summaries(&self, n: usize) -> Vec<DailySummary> {
        let today = self.clock.today();
        (0..n)
            .filter_map(|back| today.checked_sub_days(chrono::Days::new(back as u64)))
            .map(|date| self.get_daily_summary(&day_key(date)))
            .collect()
    }

    /// Incremental O(1) summary maintenance; never reads the full ledger
    fn update_daily_summary(&self, entry: &PointHistoryEntry) -> Result<()> {
        let date = day_key_for_ms(entry.timestamp);
        let mut summary = self.get_daily_summary(&date);

        summary.total_points = summary.total_points.saturating_add(entry.amount);
        summary.entry_count += 1;
        *summary.points_by_category.entry(entry.category).or_insert(0) += entry.amount;
        *summary.points_by_source.entry(entry.source).or_insert(0) += entry.amount;
        summary.top_source = summary
            .points_by_source
            .iter()
            .max_by_key(|(_, points)| **points)
            .map(|(source, _)| *source);

        let json = serde_json::to_string(&summary).context("Failed to serialize daily summary")?;
        self.store.set(&summary_key(&date), &json)
    }

    fn load_history(&self) -> Vec<PointHistoryEntry> {
        match self.store.get(HISTORY_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Malformed points history, starting fresh: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load points history: {e:#}");
                Vec::new()
            }
        }
    }

    fn load_summary(&self, date: &str) -> Result<Option<DailySummary>> {
        let Some(json) = self.store.get(&summary_key(date))? else {
            return Ok(None);
        };
        let summary = serde_json::from_str(&json)
            .with_context(|| format!("Malformed daily summary for {date}"))?;
        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::date_key::FixedClock;
    use crate::stats::store::MemoryStore;
    use chrono::TimeZone;

    fn setup() -> (Arc<FixedClock>, PointsLedger) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            chrono::Local.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap(),
        ));
        let ledger = PointsLedger::new(store, clock.clone());
        (clock, ledger)
    }

    #[test]
    fn test_record_appends_newest_first() {
        let (_, ledger) = setup();
        ledger
            .record_points(PointSource::Journal, 20, Category::Jou, "Journal entry", None)
            .unwrap();
        ledger
            .record_points(PointSource::GoalCompleted, 10, Category::Dis, "Goal done", None)
            .unwrap();

        let history = ledger.get_points_history(10, &HistoryFilter::default());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source, PointSource::GoalCompleted);
        assert_eq!(history[1].source, PointSource::Journal);
    }

    #[test]
    fn test_history_filters() {
        let (_, ledger) = setup();
        ledger
            .record_points(PointSource::Journal, 20, Category::Jou, "a", None)
            .unwrap();
        ledger
            .record_points(PointSource::TodoCompleted, 5, Category::Prd, "b", None)
            .unwrap();

        let only_journal = ledger.get_points_history(
            10,
            &HistoryFilter {
                source: Some(PointSource::Journal),
                ..Default::default()
            },
        );
        assert_eq!(only_journal.len(), 1);
        assert_eq!(only_journal[0].category, Category::Jou);

        let capped = ledger.get_points_history(1, &HistoryFilter::default());
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_retention_cap_preserves_order() {
        let (_, ledger) = setup();
        for i in 0..(HISTORY_RETENTION + 25) {
            ledger
                .record_points(PointSource::TodoCompleted, 1, Category::Prd, &format!("t{i}"), None)
                .unwrap();
        }
        let history = ledger.get_points_history(usize::MAX, &HistoryFilter::default());
        assert_eq!(history.len(), HISTORY_RETENTION);
        // Newest entry survives at the front
        assert_eq!(history[0].description, format!("t{}", HISTORY_RETENTION + 24));
    }

    #[test]
    fn test_summary_independent_of_retention() {
        let (_, ledger) = setup();
        for _ in 0..(HISTORY_RETENTION + 50) {
            ledger
                .record_points(PointSource::TodoCompleted, 2, Category::Prd, "t", None)
                .unwrap();
        }
        let summary = ledger.get_daily_summary("2024-03-07");
        // Every award counted even though the ledger was truncated
        assert_eq!(summary.entry_count as usize, HISTORY_RETENTION + 50);
        assert_eq!(summary.total_points as usize, (HISTORY_RETENTION + 50) * 2);
    }

    #[test]
    fn test_summary_rollup_and_top_source() {
        let (_, ledger) = setup();
        ledger
            .record_points(PointSource::Journal, 20, Category::Jou, "j", None)
            .unwrap();
        ledger
            .record_points(PointSource::TodoCompleted, 5, Category::Prd, "t", None)
            .unwrap();
        ledger
            .record_points(PointSource::TodoCompleted, 5, Category::Prd, "t", None)
            .unwrap();

        let summary = ledger.get_daily_summary("2024-03-07");
        assert_eq!(summary.total_points, 30);
        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.points_by_category[&Category::Jou], 20);
        assert_eq!(summary.points_by_category[&Category::Prd], 10);
        // Journal still holds the most points from a single source
        assert_eq!(summary.top_source, Some(PointSource::Journal));
    }

    #[test]
    fn test_recent_summaries_span_days() {
        let (clock, ledger) = setup();
        ledger
            .record_points(PointSource::Journal, 20, Category::Jou, "day1", None)
            .unwrap();
        clock.advance_days(1);
        ledger
            .record_points(PointSource::Journal, 20, Category::Jou, "day2", None)
            .unwrap();

        let recent = ledger.get_recent_daily_summaries(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].date, "2024-03-08");
        assert_eq!(recent[0].total_points, 20);
        assert_eq!(recent[1].date, "2024-03-07");
        assert_eq!(recent[1].total_points, 20);
        assert_eq!(recent[2].total_points, 0);
    }
}
