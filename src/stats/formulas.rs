//! Per-category scoring formulas
//!
//! Pure, stateless functions over already-aggregated daily counters.
//! Rounding is asymmetric on purpose: per-unit-of-time bonuses round up
//! (in the user's favor), per-threshold chunks round down.

use super::models::{CategoryStats, DailyActivity};

/// Weights and thresholds used by the formulas
pub mod weights {
    /// Points per completed focus session (DIS)
    pub const DIS_SESSION: u32 = 5;
    /// Points per completed goal (DIS)
    pub const DIS_GOAL: u32 = 10;
    /// Flat bonus for at least one journal entry (DIS)
    pub const DIS_JOURNAL: u32 = 5;
    /// Points per started hour of body focus (DIS)
    pub const DIS_BODY_HOUR: u32 = 10;
    /// Penalty per aborted session (DIS)
    pub const DIS_ABORT_PENALTY: u32 = 5;
    /// One penalty point per this many social-media minutes (DIS)
    pub const DIS_SOCIAL_MEDIA_CHUNK: u32 = 10;

    /// Points per started hour of focus, flow and non-flow alike (FOC)
    pub const FOC_HOUR: u32 = 10;

    /// Daily journal award (JOU)
    pub const JOU_ENTRY: u32 = 20;
    /// Journal entries counted per day (JOU)
    pub const JOU_DAILY_CAP: u32 = 1;

    /// DET points per full ten completed goals
    pub const DET_GOALS_PER_TEN: u32 = 20;
    /// DET points per full ten journal entries
    pub const DET_JOURNAL_PER_TEN: u32 = 10;
    /// DET points per full ten completed sessions
    pub const DET_SESSIONS_PER_TEN: u32 = 10;
    /// DET points per achievement unlocked
    pub const DET_ACHIEVEMENT: u32 = 5;
    /// DET points per completed 7-day habit streak
    pub const DET_STREAK_WEEK: u32 = 10;
    /// DET points per completed todo item
    pub const DET_TODO: u32 = 1;
    /// Phone minutes above which usage is penalized (DET)
    pub const DET_PHONE_PENALTY_THRESHOLD: u32 = 180;
    /// Penalty per full 30 minutes above the threshold (DET)
    pub const DET_PHONE_PENALTY: u32 = 5;
    /// Phone minutes below which reduced usage is rewarded (DET)
    pub const DET_PHONE_BONUS_THRESHOLD: u32 = 120;
    /// Flat bonus for low phone usage (DET)
    pub const DET_PHONE_BONUS: u32 = 10;

    /// Points per meditation minute, no minimum threshold (MEN)
    pub const MEN_MEDITATION_MINUTE: u32 = 2;

    /// Points per full 30 minutes of body focus (PHY)
    pub const PHY_BODY_CHUNK: u32 = 20;

    /// Points per started hour outside (SOC)
    pub const SOC_OUTSIDE_HOUR: u32 = 10;
    /// Points per started hour with friends (SOC)
    pub const SOC_FRIENDS_HOUR: u32 = 15;

    /// PRD weights
    pub const PRD_GOAL: u32 = 15;
    pub const PRD_JOURNAL: u32 = 10;
    /// Points per full hour of total focus (PRD)
    pub const PRD_FOCUS_HOUR: u32 = 5;
}

fn ceil_div(value: u32, unit: u32) -> u32 {
    value.div_ceil(unit)
}

fn clamp(value: i64) -> u32 {
    value.max(0).min(u32::MAX as i64) as u32
}

/// DIS: sessions, goals, journaling presence and body focus earn points;
/// aborted sessions and social-media minutes take them away.
pub fn discipline(a: &DailyActivity) -> u32 {
    let earned = weights::DIS_SESSION * a.completed_sessions
        + weights::DIS_GOAL * a.completed_goals
        + weights::DIS_JOURNAL * a.journal_entries.min(1)
        + weights::DIS_BODY_HOUR * ceil_div(a.focus_minutes.body, 60);
    let penalty = weights::DIS_ABORT_PENALTY * a.aborted_sessions
        + a.social_media_minutes / weights::DIS_SOCIAL_MEDIA_CHUNK;
    clamp(earned as i64 - penalty as i64)
}

/// FOC: started hours of focus. Flow minutes count in their own term,
/// everything else in the base term.
pub fn focus(a: &DailyActivity) -> u32 {
    let non_flow =
        a.focus_minutes.meditation + a.focus_minutes.body + a.focus_minutes.no_phone;
    weights::FOC_HOUR * ceil_div(non_flow, 60)
        + weights::FOC_HOUR * ceil_div(a.focus_minutes.flow, 60)
}

/// JOU: capped per calendar day. Entries beyond the cap add nothing here
/// (they still count toward DIS/DET/PRD).
pub fn journaling(a: &DailyActivity) -> u32 {
    weights::JOU_ENTRY * a.journal_entries.min(weights::JOU_DAILY_CAP)
}

/// DET: weighted sum of everything that takes willpower, plus a
/// phone-usage adjustment that only applies when usage-tracking
/// permission was granted.
pub fn determination(a: &DailyActivity, usage_permission: bool) -> u32 {
    let mut score = (weights::DET_GOALS_PER_TEN * (a.completed_goals / 10)
        + weights::DET_JOURNAL_PER_TEN * (a.journal_entries / 10)
        + weights::DET_SESSIONS_PER_TEN * (a.completed_sessions / 10)
        + weights::DET_ACHIEVEMENT * a.achievements_unlocked
        + weights::DET_STREAK_WEEK * a.habit_streak_weeks
        + weights::DET_TODO * a.completed_todos) as i64;

    if usage_permission {
        if a.phone_usage_minutes > weights::DET_PHONE_PENALTY_THRESHOLD {
            let over = a.phone_usage_minutes - weights::DET_PHONE_PENALTY_THRESHOLD;
            score -= (weights::DET_PHONE_PENALTY * (over / 30)) as i64;
        } else if a.phone_usage_minutes < weights::DET_PHONE_BONUS_THRESHOLD {
            score += weights::DET_PHONE_BONUS as i64;
        }
    }

    clamp(score)
}

/// MEN: meditation minutes, exempt from the 5-minute floor other modes use
pub fn mentality(a: &DailyActivity) -> u32 {
    weights::MEN_MEDITATION_MINUTE * a.focus_minutes.meditation
}

/// PHY: full half-hours of body focus
pub fn physical(a: &DailyActivity) -> u32 {
    weights::PHY_BODY_CHUNK * (a.focus_minutes.body / 30)
}

/// SOC: started hours outside and with friends, at different weights
pub fn social(a: &DailyActivity) -> u32 {
    weights::SOC_OUTSIDE_HOUR * ceil_div(a.time_outside_minutes, 60)
        + weights::SOC_FRIENDS_HOUR * ceil_div(a.time_with_friends_minutes, 60)
}

/// PRD: goals, journal entries and full hours of total focus
pub fn productivity(a: &DailyActivity) -> u32 {
    weights::PRD_GOAL * a.completed_goals
        + weights::PRD_JOURNAL * a.journal_entries
        + weights::PRD_FOCUS_HOUR * (a.focus_minutes.total() / 60)
}

/// Score one day's aggregated counters across all eight categories
pub fn score_day(activity: &DailyActivity, usage_permission: bool) -> CategoryStats {
    CategoryStats {
        discipline: discipline(activity),
        focus: focus(activity),
        journaling: journaling(activity),
        determination: determination(activity, usage_permission),
        mentality: mentality(activity),
        physical: physical(activity),
        social: social(activity),
        productivity: productivity(activity),
    }
}
