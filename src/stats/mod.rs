//! Stats aggregation and rating engine
//!
//! Turns daily actions (journaling, focus sessions, goals/todos, phone
//! usage) into an eight-category rating with monthly and lifetime
//! aggregates, a tier classification and a best-effort leaderboard push.
//!
//! # Control flow
//!
//! ```text
//! UI action ─▶ ActivityStore increment ─▶ PointsLedger append
//!                      │
//!                      ├─▶ monthly merge (idempotent per day)
//!                      ├─▶ RatingCache invalidation
//!                      └─▶ achievement check / leaderboard sync
//!                          (detached, fire-and-forget)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let engine = RatingEngine::open_default(&config)?;
//! engine.record_journal_entry()?;
//! let rating = engine.get_current_rating();
//! println!("{} ({} pts)", rating.tier.label(), rating.total_points);
//! ```

mod activity;
mod aggregator;
mod cache;
mod date_key;
mod formulas;
mod ledger;
mod leaderboard;
mod models;
mod store;
mod tier;

pub use activity::ActivityStore;
pub use aggregator::{Period, PeriodAggregator};
pub use cache::{RatingCache, DEFAULT_TTL_HOURS};
pub use date_key::{
    day_key, day_key_for_ms, month_key, parse_day_key, parse_month_key, Clock, FixedClock,
    SystemClock,
};
pub use formulas::{score_day, weights};
pub use ledger::{HistoryFilter, PointsLedger, HISTORY_RETENTION};
pub use leaderboard::{spawn_upsert, HttpRankingService, LeaderboardEntry, RankingService};
pub use models::{
    Category, CategoryStats, DailyActivity, DailySummary, FocusKind, FocusMinutes,
    MonthlyRecord, PointHistoryEntry, PointSource, RatingSnapshot,
};
pub use store::{KvStore, MemoryStore, SqliteStore};
pub use tier::{Tier, TIER_THRESHOLDS};

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::config::Config;

/// Exposes whether the on-device usage-statistics permission was
/// granted. The DET formula applies phone-usage adjustments only when
/// it was, so declining tracking never costs points.
pub trait UsageAccessProvider: Send + Sync {
    fn has_usage_access_permission(&self) -> bool;
}

/// Fixed permission answer (CLI config flag, tests)
pub struct StaticUsageAccess(pub bool);

impl UsageAccessProvider for StaticUsageAccess {
    fn has_usage_access_permission(&self) -> bool {
        self.0
    }
}

/// Opaque post-mutation hook. Invoked off the critical path; anything
/// it unlocks comes back through `record_achievement_unlocked`.
pub trait AchievementChecker: Send + Sync {
    fn check_after_activity(&self, activity: &DailyActivity);
}

/// Last total pushed to the leaderboard, persisted so the guard
/// survives process restarts
const LAST_SYNC_KEY: &str = "leaderboard_last_total";

/// Ledger award amounts per source
mod awards {
    pub const JOURNAL: u32 = 20;
    pub const GOAL_COMPLETED: u32 = 10;
    pub const GOAL_CREATED: u32 = 2;
    pub const FOCUS_SESSION: u32 = 10;
    pub const TODO_COMPLETED: u32 = 5;
    pub const TODO_CREATED: u32 = 1;
    pub const TIME_OUTSIDE: u32 = 10;
    pub const TIME_WITH_FRIENDS: u32 = 15;
    pub const HABIT_STREAK: u32 = 10;
    pub const ACHIEVEMENT_UNLOCKED: u32 = 5;
}

/// Engine construction knobs
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub username: String,
    pub cache_ttl_hours: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            username: "player".to_string(),
            cache_ttl_hours: DEFAULT_TTL_HOURS,
        }
    }
}

/// Central coordinator for activity recording and rating reads.
///
/// Explicitly constructed and dependency-injected: tests substitute an
/// in-memory store, a fixed clock and recording collaborators.
pub struct RatingEngine {
    store: Arc<dyn KvStore>,
    activity: ActivityStore,
    ledger: PointsLedger,
    aggregator: PeriodAggregator,
    cache: RatingCache,
    usage: Arc<dyn UsageAccessProvider>,
    ranking: Option<Arc<dyn RankingService>>,
    achievements: Option<Arc<dyn AchievementChecker>>,
    clock: Arc<dyn Clock>,
    username: String,
    /// Serializes mutating operations: the read-modify-write sequences
    /// over activity counters and the monthly merge are not atomic in
    /// the store itself.
    write_lock: Mutex<()>,
}

impl RatingEngine {
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        usage: Arc<dyn UsageAccessProvider>,
        ranking: Option<Arc<dyn RankingService>>,
        achievements: Option<Arc<dyn AchievementChecker>>,
        settings: EngineSettings,
    ) -> Self {
        let activity = ActivityStore::new(store.clone(), clock.clone());
        let aggregator = PeriodAggregator::new(store.clone(), activity.clone(), clock.clone());
        let ledger = PointsLedger::new(store.clone(), clock.clone());
        let cache = RatingCache::new(store.clone(), clock.clone(), settings.cache_ttl_hours);
        Self {
            store,
            activity,
            ledger,
            aggregator,
            cache,
            usage,
            ranking,
            achievements,
            clock,
            username: settings.username,
            write_lock: Mutex::new(()),
        }
    }

    /// Engine over the default on-disk store, wired from the config file
    pub fn open_default(config: &Config) -> Result<Self> {
        let store: Arc<dyn KvStore> = Arc::new(SqliteStore::open(&config.db_path())?);
        let ranking: Option<Arc<dyn RankingService>> = config
            .leaderboard_url
            .as_deref()
            .map(|url| Arc::new(HttpRankingService::new(url)) as Arc<dyn RankingService>);
        Ok(Self::new(
            store,
            Arc::new(SystemClock),
            Arc::new(StaticUsageAccess(config.usage_access)),
            ranking,
            None,
            EngineSettings {
                username: config.username.clone(),
                cache_ttl_hours: config.cache_ttl_hours,
            },
        ))
    }

    // ========================================
    // MUTATING OPERATIONS
    // ========================================

    pub fn record_journal_entry(&self) -> Result<()> {
        self.apply(
            |a| a.journal_entries += 1,
            Some((PointSource::Journal, awards::JOURNAL, Category::Jou, "Journal entry")),
            true,
        )
    }

    pub fn record_goal_completed(&self) -> Result<()> {
        self.apply(
            |a| a.completed_goals += 1,
            Some((
                PointSource::GoalCompleted,
                awards::GOAL_COMPLETED,
                Category::Dis,
                "Goal completed",
            )),
            true,
        )
    }

    pub fn record_goal_created(&self) -> Result<()> {
        self.apply(
            |_| {},
            Some((
                PointSource::GoalCreated,
                awards::GOAL_CREATED,
                Category::Prd,
                "Goal created",
            )),
            true,
        )
    }

    pub fn record_todo_completed(&self) -> Result<()> {
        self.apply(
            |a| a.completed_todos += 1,
            Some((
                PointSource::TodoCompleted,
                awards::TODO_COMPLETED,
                Category::Prd,
                "Todo completed",
            )),
            true,
        )
    }

    pub fn record_todo_created(&self) -> Result<()> {
        self.apply(
            |_| {},
            Some((
                PointSource::TodoCreated,
                awards::TODO_CREATED,
                Category::Prd,
                "Todo created",
            )),
            true,
        )
    }

    /// Record a focus session. Completed sessions add their minutes to
    /// the per-kind totals; aborted ones only bump the abort counter.
    pub fn record_focus_session(
        &self,
        kind: FocusKind,
        minutes: u32,
        completed: bool,
    ) -> Result<()> {
        if completed {
            self.apply(
                move |a| {
                    a.completed_sessions += 1;
                    a.focus_minutes.add(kind, minutes);
                },
                Some((
                    PointSource::FocusSession,
                    awards::FOCUS_SESSION,
                    Category::Foc,
                    "Focus session completed",
                )),
                true,
            )
        } else {
            self.apply(|a| a.aborted_sessions += 1, None, true)
        }
    }

    pub fn record_time_outside(&self, minutes: u32) -> Result<()> {
        self.apply(
            move |a| a.time_outside_minutes = a.time_outside_minutes.saturating_add(minutes),
            Some((
                PointSource::TimeOutside,
                awards::TIME_OUTSIDE,
                Category::Soc,
                "Time outside",
            )),
            true,
        )
    }

    pub fn record_time_with_friends(&self, minutes: u32) -> Result<()> {
        self.apply(
            move |a| {
                a.time_with_friends_minutes = a.time_with_friends_minutes.saturating_add(minutes)
            },
            Some((
                PointSource::TimeWithFriends,
                awards::TIME_WITH_FRIENDS,
                Category::Soc,
                "Time with friends",
            )),
            true,
        )
    }

    /// Record phone and social-media usage minutes (no point award;
    /// these feed the DIS/DET adjustments).
    pub fn record_phone_usage(&self, phone_minutes: u32, social_media_minutes: u32) -> Result<()> {
        self.apply(
            move |a| {
                a.phone_usage_minutes = a.phone_usage_minutes.saturating_add(phone_minutes);
                a.social_media_minutes =
                    a.social_media_minutes.saturating_add(social_media_minutes);
            },
            None,
            true,
        )
    }

    /// Record a completed 7-day habit streak
    pub fn record_habit_streak(&self) -> Result<()> {
        self.apply(
            |a| a.habit_streak_weeks += 1,
            Some((
                PointSource::HabitStreak,
                awards::HABIT_STREAK,
                Category::Det,
                "7-day habit streak",
            )),
            true,
        )
    }

    /// Called back by the achievement collaborator; does not re-trigger
    /// the achievement check.
    pub fn record_achievement_unlocked(&self, name: &str) -> Result<()> {
        let description = format!("Achievement unlocked: {name}");
        self.apply(
            |a| a.achievements_unlocked += 1,
            Some((
                PointSource::AchievementUnlocked,
                awards::ACHIEVEMENT_UNLOCKED,
                Category::Det,
                &description,
            )),
            false,
        )
    }

    /// Shared mutation path: serialize, increment, append, merge,
    /// invalidate - then kick off the detached follow-ups.
    fn apply(
        &self,
        mutate: impl FnOnce(&mut DailyActivity),
        award: Option<(PointSource, u32, Category, &str)>,
        check_achievements: bool,
    ) -> Result<()> {
        let activity = {
            let _guard = self.write_lock.lock().expect("engine write lock poisoned");
            let activity = self.activity.update_today_activity(mutate)?;
            if let Some((source, amount, category, description)) = award {
                self.ledger
                    .record_points(source, amount, category, description, None)?;
            }
            self.aggregator.update_monthly_stats(self.usage_permission())?;
            self.cache.invalidate();
            activity
        };

        if check_achievements {
            if let Some(checker) = &self.achievements {
                let checker = checker.clone();
                std::thread::spawn(move || checker.check_after_activity(&activity));
            }
        }
        self.maybe_sync_leaderboard();
        Ok(())
    }

    // ========================================
    // READS
    // ========================================

    /// Current rating, cached behind the TTL. Never fails: any internal
    /// error degrades to a fully-zeroed snapshot.
    pub fn get_current_rating(&self) -> RatingSnapshot {
        if let Some(hit) = self.cache.get() {
            return hit;
        }
        match self.compute_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Rating recomputation failed, returning zero snapshot: {e:#}");
                RatingSnapshot::zero(self.clock.now_ms())
            }
        }
    }

    /// Category scores for a period
    pub fn get_stats(&self, period: Period) -> CategoryStats {
        let perm = self.usage_permission();
        match period {
            Period::Daily => self.aggregator.daily_stats(perm),
            Period::Monthly => self
                .aggregator
                .monthly_stats(&month_key(self.clock.today()), perm),
            Period::Lifetime => self.aggregator.lifetime_stats(perm),
        }
    }

    pub fn get_points_history(&self, limit: usize, filter: &HistoryFilter) -> Vec<PointHistoryEntry> {
        self.ledger.get_points_history(limit, filter)
    }

    pub fn get_daily_summary(&self, date: &str) -> DailySummary {
        self.ledger.get_daily_summary(date)
    }

    pub fn get_recent_daily_summaries(&self, n: usize) -> Vec<DailySummary> {
        self.ledger.get_recent_daily_summaries(n)
    }

    pub fn monthly_record(&self, month: &str) -> Option<MonthlyRecord> {
        self.aggregator.monthly_record(month)
    }

    /// Top-N query against the ranking service (display only; the
    /// engine's own pushes never read back).
    pub fn leaderboard_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        match &self.ranking {
            Some(service) => service.top(limit),
            None => Ok(Vec::new()),
        }
    }

    // ========================================
    // SYNC & MAINTENANCE
    // ========================================

    /// Explicit, blocking push of the current summary to the ranking
    /// service. Unlike the fire-and-forget push after mutations, this
    /// surfaces the outcome to the caller (the CLI `sync` command would
    /// otherwise exit before a detached push completes). Returns false
    /// when no ranking service is configured.
    pub fn sync_user_to_leaderboard(&self) -> Result<bool> {
        let Some(service) = &self.ranking else {
            return Ok(false);
        };
        let snapshot = self.get_current_rating();
        service.upsert(&self.leaderboard_entry(&snapshot))?;
        self.set_last_synced(snapshot.total_points);
        Ok(true)
    }

    /// Delete all engine data (activity, ledger, summaries, monthly
    /// records, cache).
    pub fn reset_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().expect("engine write lock poisoned");
        for prefix in ["activity_", "points_", "monthly_", "rating_cache", "leaderboard_"] {
            for key in self.store.list_keys(prefix)? {
                self.store.remove(&key)?;
            }
        }
        Ok(())
    }

    fn compute_snapshot(&self) -> Result<RatingSnapshot> {
        let perm = self.usage_permission();
        let month = month_key(self.clock.today());
        let monthly = self.aggregator.monthly_stats(&month, perm);
        let lifetime = self.aggregator.lifetime_stats(perm);

        let snapshot = RatingSnapshot {
            stats: monthly,
            overall_rating: monthly.overall_rating(),
            total_points: lifetime.total(),
            monthly_points: monthly.total(),
            tier: Tier::for_points(lifetime.total()),
            captured_at: self.clock.now_ms(),
        };
        if let Err(e) = self.cache.put(&snapshot) {
            tracing::warn!("Failed to store rating cache (serving uncached): {e:#}");
        }
        Ok(snapshot)
    }

    /// Push to the leaderboard only when the lifetime total actually
    /// grew since the last push.
    fn maybe_sync_leaderboard(&self) {
        let Some(service) = &self.ranking else {
            return;
        };
        let snapshot = self.get_current_rating();
        if snapshot.total_points > self.last_synced() {
            self.set_last_synced(snapshot.total_points);
            spawn_upsert(service.clone(), self.leaderboard_entry(&snapshot));
        }
    }

    /// Persisted guard value; unreadable or absent reads as zero
    fn last_synced(&self) -> u32 {
        match self.store.get(LAST_SYNC_KEY) {
            Ok(Some(value)) => value.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!("Failed to read leaderboard sync guard: {e:#}");
                0
            }
        }
    }

    fn set_last_synced(&self, total: u32) {
        if let Err(e) = self.store.set(LAST_SYNC_KEY, &total.to_string()) {
            tracing::warn!("Failed to persist leaderboard sync guard: {e:#}");
        }
    }

    fn leaderboard_entry(&self, snapshot: &RatingSnapshot) -> LeaderboardEntry {
        LeaderboardEntry {
            username: self.username.clone(),
            total_points: snapshot.total_points,
            monthly_points: snapshot.monthly_points,
            overall_rating: snapshot.overall_rating,
            tier: snapshot.tier,
        }
    }

    fn usage_permission(&self) -> bool {
        self.usage.has_usage_access_permission()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine() -> (Arc<FixedClock>, RatingEngine) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            chrono::Local.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap(),
        ));
        let engine = RatingEngine::new(
            store,
            clock.clone(),
            Arc::new(StaticUsageAccess(false)),
            None,
            None,
            EngineSettings::default(),
        );
        (clock, engine)
    }

    #[test]
    fn test_journal_entry_flows_through() {
        let (_, engine) = engine();
        engine.record_journal_entry().unwrap();

        let rating = engine.get_current_rating();
        assert_eq!(rating.stats.journaling, 20);
        assert_eq!(rating.stats.discipline, 5);
        assert_eq!(rating.stats.productivity, 10);
        assert_eq!(rating.monthly_points, 35);
        assert_eq!(rating.total_points, 35);

        let history = engine.get_points_history(10, &HistoryFilter::default());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source, PointSource::Journal);
        assert_eq!(history[0].amount, 20);
    }

    #[test]
    fn test_rating_is_cached_until_mutation() {
        let (clock, engine) = engine();
        engine.record_journal_entry().unwrap();

        let first = engine.get_current_rating();
        clock.advance_hours(1);
        let second = engine.get_current_rating();
        assert_eq!(first, second); // bit-identical, same captured_at

        engine.record_goal_completed().unwrap();
        let third = engine.get_current_rating();
        assert_ne!(second.stats, third.stats);
        assert!(third.stats.discipline > second.stats.discipline);
    }

    #[test]
    fn test_aborted_session_penalizes_discipline_only() {
        let (_, engine) = engine();
        engine.record_focus_session(FocusKind::Flow, 30, true).unwrap();
        engine.record_focus_session(FocusKind::Flow, 10, false).unwrap();

        let stats = engine.get_stats(Period::Daily);
        assert_eq!(stats.discipline, 0); // 5 session - 5 abort
        assert_eq!(stats.focus, 10); // aborted minutes do not count
    }

    #[test]
    fn test_reset_all_clears_everything() {
        let (_, engine) = engine();
        engine.record_journal_entry().unwrap();
        engine.reset_all().unwrap();

        let rating = engine.get_current_rating();
        assert_eq!(rating.total_points, 0);
        assert!(engine.get_points_history(10, &HistoryFilter::default()).is_empty());
        assert!(engine.monthly_record("2024-03").is_none());
    }

    #[test]
    fn test_leaderboard_top_without_service_is_empty() {
        let (_, engine) = engine();
        assert!(engine.leaderboard_top(10).unwrap().is_empty());
    }
}
