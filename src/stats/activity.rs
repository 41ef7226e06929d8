//! Activity Store - per-day counters keyed by local calendar date
//!
//! Records are created lazily with zeroed counters on first access and
//! stored as JSON under `activity_<YYYY-MM-DD>`. On read or parse
//! failure the store degrades to the zero-valued default so the rating
//! screens stay available.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::date_key::{day_key, Clock};
use super::models::DailyActivity;
use super::store::KvStore;

const ACTIVITY_PREFIX: &str = "activity_";

pub fn activity_key(date: &str) -> String {
    format!("{ACTIVITY_PREFIX}{date}")
}

/// Exclusive owner of `DailyActivity` records
#[derive(Clone)]
pub struct ActivityStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl ActivityStore {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Get the record for a date, creating and persisting a zeroed one
    /// if absent. Never fails: store errors degrade to the default.
    pub fn get_daily_activity(&self, date: &str) -> DailyActivity {
        match self.load(date) {
            Ok(Some(activity)) => activity,
            Ok(None) => {
                let fresh = DailyActivity::new(date);
                if let Err(e) = self.save_daily_activity(&fresh) {
                    tracing::warn!("Failed to persist new activity record for {date}: {e:#}");
                }
                fresh
            }
            Err(e) => {
                tracing::warn!("Failed to load activity for {date}, using zeros: {e:#}");
                DailyActivity::new(date)
            }
        }
    }

    /// Read-only variant of `get_daily_activity`: absent records come
    /// back zeroed without being persisted. Used by aggregation scans so
    /// a month-to-date read does not write thirty empty records.
    pub fn peek_daily_activity(&self, date: &str) -> DailyActivity {
        match self.load(date) {
            Ok(Some(activity)) => activity,
            Ok(None) => DailyActivity::new(date),
            Err(e) => {
                tracing::warn!("Failed to load activity for {date}, using zeros: {e:#}");
                DailyActivity::new(date)
            }
        }
    }

    /// Full overwrite by date key
    pub fn save_daily_activity(&self, activity: &DailyActivity) -> Result<()> {
        let json = serde_json::to_string(activity).context("Failed to serialize activity")?;
        self.store.set(&activity_key(&activity.date), &json)
    }

    /// Read-modify-write against today's record, using the local
    /// calendar day boundary.
    pub fn update_today_activity(
        &self,
        mutate: impl FnOnce(&mut DailyActivity),
    ) -> Result<DailyActivity> {
        let today = day_key(self.clock.today());
        let mut activity = self.get_daily_activity(&today);
        mutate(&mut activity);
        self.save_daily_activity(&activity)?;
        Ok(activity)
    }

    /// All dates with a persisted record, sorted ascending
    pub fn recorded_dates(&self) -> Result<Vec<String>> {
        let keys = self.store.list_keys(ACTIVITY_PREFIX)?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(ACTIVITY_PREFIX).map(str::to_string))
            .collect())
    }

    fn load(&self, date: &str) -> Result<Option<DailyActivity>> {
        let Some(json) = self.store.get(&activity_key(date))? else {
            return Ok(None);
        };
        let activity = serde_json::from_str(&json)
            .with_context(|| format!("Malformed activity record for {date}"))?;
        Ok(Some(activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::date_key::FixedClock;
    use crate::stats::store::MemoryStore;
    use chrono::TimeZone;

    fn setup() -> (Arc<MemoryStore>, ActivityStore) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            chrono::Local.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap(),
        ));
        let activity = ActivityStore::new(store.clone(), clock);
        (store, activity)
    }

    #[test]
    fn test_get_creates_and_persists_zeroed_record() {
        let (store, activity) = setup();
        let a = activity.get_daily_activity("2024-03-07");
        assert_eq!(a, DailyActivity::new("2024-03-07"));
        // Idempotent create-and-persist
        assert!(store.get("activity_2024-03-07").unwrap().is_some());
        assert_eq!(activity.get_daily_activity("2024-03-07"), a);
    }

    #[test]
    fn test_update_today_is_read_modify_write() {
        let (_, activity) = setup();
        activity
            .update_today_activity(|a| a.journal_entries += 1)
            .unwrap();
        let updated = activity
            .update_today_activity(|a| a.journal_entries += 1)
            .unwrap();
        assert_eq!(updated.date, "2024-03-07");
        assert_eq!(updated.journal_entries, 2);
    }

    #[test]
    fn test_malformed_record_degrades_to_zeros() {
        let (store, activity) = setup();
        store.set("activity_2024-03-07", "not json").unwrap();
        let a = activity.get_daily_activity("2024-03-07");
        assert_eq!(a.journal_entries, 0);
    }

    #[test]
    fn test_recorded_dates_sorted() {
        let (_, activity) = setup();
        activity
            .save_daily_activity(&DailyActivity::new("2024-03-09"))
            .unwrap();
        activity
            .save_daily_activity(&DailyActivity::new("2024-03-07"))
            .unwrap();
        assert_eq!(
            activity.recorded_dates().unwrap(),
            vec!["2024-03-07", "2024-03-09"]
        );
    }
}
