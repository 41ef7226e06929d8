//! Period Aggregator - Daily, Monthly and Lifetime category vectors
//!
//! Daily stats are always computed live from the Activity Store. The
//! current (open) month is computed live by scoring each day 1..today
//! independently and summing - this keeps the per-day JOU cap at the
//! right granularity. Closed months come from persisted MonthlyRecords.
//! Lifetime sums all closed-month records plus the live open month; the
//! open month's persisted record (written by the daily merge) is skipped
//! so it is never double-counted.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};

use serde::{Deserialize, Serialize};

use super::activity::ActivityStore;
use super::date_key::{day_key, month_key, Clock};
use super::formulas;
use super::models::{CategoryStats, MonthlyRecord};
use super::store::KvStore;
use super::tier::Tier;

const MONTHLY_PREFIX: &str = "monthly_";
const MARKER_PREFIX: &str = "monthly_marker_";

/// Last day merged into a month's record, with the exact contribution
/// that was added for it. Kept so a later merge can replace that day's
/// share when more activity lands on the same date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MergeMarker {
    date: String,
    stats: CategoryStats,
}

fn monthly_key(month: &str) -> String {
    format!("{MONTHLY_PREFIX}{month}")
}

fn marker_key(month: &str) -> String {
    format!("{MARKER_PREFIX}{month}")
}

/// Aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Monthly,
    Lifetime,
}

#[derive(Clone)]
pub struct PeriodAggregator {
    store: Arc<dyn KvStore>,
    activity: ActivityStore,
    clock: Arc<dyn Clock>,
}

impl PeriodAggregator {
    pub fn new(store: Arc<dyn KvStore>, activity: ActivityStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            activity,
            clock,
        }
    }

    /// Today's live category scores
    pub fn daily_stats(&self, usage_permission: bool) -> CategoryStats {
        let today = day_key(self.clock.today());
        self.stats_for_day(&today, usage_permission)
    }

    /// Live category scores for one calendar date
    pub fn stats_for_day(&self, date: &str, usage_permission: bool) -> CategoryStats {
        let activity = self.activity.peek_daily_activity(date);
        formulas::score_day(&activity, usage_permission)
    }

    /// Month-to-date scores for the open month, or the persisted record
    /// for a closed one (zeros when none was ever written).
    pub fn monthly_stats(&self, month: &str, usage_permission: bool) -> CategoryStats {
        let current = month_key(self.clock.today());
        if month == current {
            return self.live_month_stats(usage_permission);
        }
        match self.load_record(month) {
            Ok(Some(record)) => record.stats,
            Ok(None) => CategoryStats::default(),
            Err(e) => {
                tracing::warn!("Failed to load monthly record {month}, using zeros: {e:#}");
                CategoryStats::default()
            }
        }
    }

    /// Lifetime scores: all closed-month records plus the live open month
    pub fn lifetime_stats(&self, usage_permission: bool) -> CategoryStats {
        let current = month_key(self.clock.today());
        let mut total = CategoryStats::default();

        match self.all_records() {
            Ok(records) => {
                for record in records {
                    if record.month != current {
                        total.add(&record.stats);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to scan monthly records: {e:#}");
            }
        }

        total.add(&self.live_month_stats(usage_permission));
        total
    }

    /// Merge today's scores into the open month's record. The marker
    /// remembers the exact contribution last merged per day, so calling
    /// again on the same day replaces that day's share rather than
    /// double-counting it - idempotent, and later same-day activity is
    /// never lost when the month closes.
    pub fn update_monthly_stats(&self, usage_permission: bool) -> Result<()> {
        let today = day_key(self.clock.today());
        let month = month_key(self.clock.today());

        let today_stats = self.stats_for_day(&today, usage_permission);
        let mut record = self
            .load_record(&month)?
            .unwrap_or_else(|| MonthlyRecord::new(&month));

        match self.load_marker(&month) {
            Ok(Some(marker)) => {
                if marker.date == today && marker.stats == today_stats {
                    return Ok(());
                }
                // Back out the stale contribution; an earlier day gets
                // re-scored so its final activity is what the record keeps.
                record.stats.sub(&marker.stats);
                if marker.date != today {
                    record
                        .stats
                        .add(&self.stats_for_day(&marker.date, usage_permission));
                }
                record.stats.add(&today_stats);
            }
            Ok(None) => record.stats.add(&today_stats),
            Err(e) => {
                // Unreadable marker: the incremental bookkeeping is lost,
                // rebuild the open month from its daily records.
                tracing::warn!("Unreadable merge marker for {month}, rebuilding record: {e:#}");
                record.stats = self.live_month_stats(usage_permission);
            }
        }
        record.total_points = record.stats.total();
        record.tier = Tier::for_points(record.total_points);

        let json = serde_json::to_string(&record).context("Failed to serialize monthly record")?;
        self.store.set(&monthly_key(&month), &json)?;
        let marker = MergeMarker {
            date: today.clone(),
            stats: today_stats,
        };
        let marker_json =
            serde_json::to_string(&marker).context("Failed to serialize merge marker")?;
        self.store.set(&marker_key(&month), &marker_json)?;
        tracing::debug!("Merged {today} into monthly record {month}");
        Ok(())
    }

    /// Persisted record for a month, if any
    pub fn monthly_record(&self, month: &str) -> Option<MonthlyRecord> {
        self.load_record(month).ok().flatten()
    }

    fn live_month_stats(&self, usage_permission: bool) -> CategoryStats {
        let today = self.clock.today();
        let mut total = CategoryStats::default();
        for day in 1..=today.day() {
            let Some(date) = NaiveDate::from_ymd_opt(today.year(), today.month(), day) else {
                continue;
            };
            total.add(&self.stats_for_day(&day_key(date), usage_permission));
        }
        total
    }

    fn all_records(&self) -> Result<Vec<MonthlyRecord>> {
        let keys = self.store.list_keys(MONTHLY_PREFIX)?;
        let mut records = Vec::new();
        for key in keys {
            if key.starts_with(MARKER_PREFIX) {
                continue;
            }
            let Some(json) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<MonthlyRecord>(&json) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping malformed monthly record {key}: {e}"),
            }
        }
        Ok(records)
    }

    fn load_marker(&self, month: &str) -> Result<Option<MergeMarker>> {
        let Some(json) = self.store.get(&marker_key(month))? else {
            return Ok(None);
        };
        let marker = serde_json::from_str(&json)
            .with_context(|| format!("Malformed merge marker for {month}"))?;
        Ok(Some(marker))
    }

    fn load_record(&self, month: &str) -> Result<Option<MonthlyRecord>> {
        let Some(json) = self.store.get(&monthly_key(month))? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&json)
            .with_context(|| format!("Malformed monthly record for {month}"))?;
        Ok(Some(record))
    }
}
