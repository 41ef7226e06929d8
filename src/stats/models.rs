//! Data models for activity tracking and rating aggregation
//!
//! These structures represent the data stored in and queried from the
//! key-value store. Everything is serialized as JSON under deterministic
//! key patterns (`activity_<date>`, `monthly_<month>`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::tier::Tier;

/// The eight rating categories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Discipline
    Dis,
    /// Focus
    Foc,
    /// Journaling
    Jou,
    /// Determination
    Det,
    /// Mentality
    Men,
    /// Physical
    Phy,
    /// Social
    Soc,
    /// Productivity
    Prd,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Dis,
        Self::Foc,
        Self::Jou,
        Self::Det,
        Self::Men,
        Self::Phy,
        Self::Soc,
        Self::Prd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dis => "DIS",
            Self::Foc => "FOC",
            Self::Jou => "JOU",
            Self::Det => "DET",
            Self::Men => "MEN",
            Self::Phy => "PHY",
            Self::Soc => "SOC",
            Self::Prd => "PRD",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DIS" => Some(Self::Dis),
            "FOC" => Some(Self::Foc),
            "JOU" => Some(Self::Jou),
            "DET" => Some(Self::Det),
            "MEN" => Some(Self::Men),
            "PHY" => Some(Self::Phy),
            "SOC" => Some(Self::Soc),
            "PRD" => Some(Self::Prd),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dis => "Discipline",
            Self::Foc => "Focus",
            Self::Jou => "Journaling",
            Self::Det => "Determination",
            Self::Men => "Mentality",
            Self::Phy => "Physical",
            Self::Soc => "Social",
            Self::Prd => "Productivity",
        }
    }
}

/// One score per category. Scores are never negative; every formula
/// clamps at zero before the value lands here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub discipline: u32,
    pub focus: u32,
    pub journaling: u32,
    pub determination: u32,
    pub mentality: u32,
    pub physical: u32,
    pub social: u32,
    pub productivity: u32,
}

impl CategoryStats {
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Dis => self.discipline,
            Category::Foc => self.focus,
            Category::Jou => self.journaling,
            Category::Det => self.determination,
            Category::Men => self.mentality,
            Category::Phy => self.physical,
            Category::Soc => self.social,
            Category::Prd => self.productivity,
        }
    }

    /// Element-wise add, saturating on overflow
    pub fn add(&mut self, other: &CategoryStats) {
        self.discipline = self.discipline.saturating_add(other.discipline);
        self.focus = self.focus.saturating_add(other.focus);
        self.journaling = self.journaling.saturating_add(other.journaling);
        self.determination = self.determination.saturating_add(other.determination);
        self.mentality = self.mentality.saturating_add(other.mentality);
        self.physical = self.physical.saturating_add(other.physical);
        self.social = self.social.saturating_add(other.social);
        self.productivity = self.productivity.saturating_add(other.productivity);
    }

    /// Element-wise subtract, saturating at zero
    pub fn sub(&mut self, other: &CategoryStats) {
        self.discipline = self.discipline.saturating_sub(other.discipline);
        self.focus = self.focus.saturating_sub(other.focus);
        self.journaling = self.journaling.saturating_sub(other.journaling);
        self.determination = self.determination.saturating_sub(other.determination);
        self.mentality = self.mentality.saturating_sub(other.mentality);
        self.physical = self.physical.saturating_sub(other.physical);
        self.social = self.social.saturating_sub(other.social);
        self.productivity = self.productivity.saturating_sub(other.productivity);
    }

    /// Sum of the eight category scores
    pub fn total(&self) -> u32 {
        Category::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Arithmetic mean of the eight scores, rounded half-up
    pub fn overall_rating(&self) -> u32 {
        (self.total() + 4) / 8
    }
}

/// Focus activity kinds tracked per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusKind {
    Flow,
    Meditation,
    Body,
    NoPhone,
}

impl FocusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Meditation => "meditation",
            Self::Body => "body",
            Self::NoPhone => "no_phone",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "flow" => Some(Self::Flow),
            "meditation" => Some(Self::Meditation),
            "body" => Some(Self::Body),
            "no_phone" | "no-phone" => Some(Self::NoPhone),
            _ => None,
        }
    }
}

/// Focus minutes per activity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusMinutes {
    pub flow: u32,
    pub meditation: u32,
    pub body: u32,
    pub no_phone: u32,
}

impl FocusMinutes {
    pub fn get(&self, kind: FocusKind) -> u32 {
        match kind {
            FocusKind::Flow => self.flow,
            FocusKind::Meditation => self.meditation,
            FocusKind::Body => self.body,
            FocusKind::NoPhone => self.no_phone,
        }
    }

    pub fn add(&mut self, kind: FocusKind, minutes: u32) {
        let slot = match kind {
            FocusKind::Flow => &mut self.flow,
            FocusKind::Meditation => &mut self.meditation,
            FocusKind::Body => &mut self.body,
            FocusKind::NoPhone => &mut self.no_phone,
        };
        *slot = slot.saturating_add(minutes);
    }

    pub fn total(&self) -> u32 {
        self.flow + self.meditation + self.body + self.no_phone
    }
}

/// One record per local calendar date. Created lazily with zeroed
/// counters on first access; owned exclusively by the Activity Store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Local calendar date, "YYYY-MM-DD"
    pub date: String,
    pub journal_entries: u32,
    pub completed_sessions: u32,
    pub aborted_sessions: u32,
    pub completed_goals: u32,
    pub achievements_unlocked: u32,
    pub habit_streak_weeks: u32,
    pub completed_todos: u32,
    pub focus_minutes: FocusMinutes,
    pub phone_usage_minutes: u32,
    pub social_media_minutes: u32,
    pub time_outside_minutes: u32,
    pub time_with_friends_minutes: u32,
}

impl DailyActivity {
    pub fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            ..Self::default()
        }
    }
}

/// Source tag for a point-earning event
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    Journal,
    GoalCompleted,
    GoalCreated,
    FocusSession,
    ReminderCompleted,
    TodoCompleted,
    TodoCreated,
    SocialInteraction,
    TimeOutside,
    TimeWithFriends,
    HabitStreak,
    AchievementUnlocked,
    DailyBonus,
    WeeklyBonus,
    MonthlyBonus,
}

impl PointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::GoalCompleted => "goal_completed",
            Self::GoalCreated => "goal_created",
            Self::FocusSession => "focus_session",
            Self::ReminderCompleted => "reminder_completed",
            Self::TodoCompleted => "todo_completed",
            Self::TodoCreated => "todo_created",
            Self::SocialInteraction => "social_interaction",
            Self::TimeOutside => "time_outside",
            Self::TimeWithFriends => "time_with_friends",
            Self::HabitStreak => "habit_streak",
            Self::AchievementUnlocked => "achievement_unlocked",
            Self::DailyBonus => "daily_bonus",
            Self::WeeklyBonus => "weekly_bonus",
            Self::MonthlyBonus => "monthly_bonus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "journal" => Some(Self::Journal),
            "goal_completed" => Some(Self::GoalCompleted),
            "goal_created" => Some(Self::GoalCreated),
            "focus_session" => Some(Self::FocusSession),
            "reminder_completed" => Some(Self::ReminderCompleted),
            "todo_completed" => Some(Self::TodoCompleted),
            "todo_created" => Some(Self::TodoCreated),
            "social_interaction" => Some(Self::SocialInteraction),
            "time_outside" => Some(Self::TimeOutside),
            "time_with_friends" => Some(Self::TimeWithFriends),
            "habit_streak" => Some(Self::HabitStreak),
            "achievement_unlocked" => Some(Self::AchievementUnlocked),
            "daily_bonus" => Some(Self::DailyBonus),
            "weekly_bonus" => Some(Self::WeeklyBonus),
            "monthly_bonus" => Some(Self::MonthlyBonus),
            _ => None,
        }
    }
}

/// Immutable record of one point award (append-only history)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointHistoryEntry {
    pub id: String,
    pub source: PointSource,
    pub amount: u32,
    pub category: Category,
    pub description: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Per-day rollup of the points ledger, maintained incrementally on
/// each recorded award (never recomputed from the full ledger)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: String,
    pub total_points: u32,
    pub points_by_category: BTreeMap<Category, u32>,
    pub points_by_source: BTreeMap<PointSource, u32>,
    pub entry_count: u32,
    pub top_source: Option<PointSource>,
}

impl DailySummary {
    pub fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            ..Self::default()
        }
    }
}

/// Persisted per-month accumulation: the running sum of each day's
/// independently scored CategoryStats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    /// Month key, "YYYY-MM"
    pub month: String,
    pub stats: CategoryStats,
    pub total_points: u32,
    pub tier: Tier,
}

impl MonthlyRecord {
    pub fn new(month: &str) -> Self {
        Self {
            month: month.to_string(),
            stats: CategoryStats::default(),
            total_points: 0,
            tier: Tier::default(),
        }
    }
}

/// Fully derived rating bundle returned by `get_current_rating`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    /// Month-to-date category scores (what the card displays)
    pub stats: CategoryStats,
    /// Integer-rounded mean of the eight monthly scores
    pub overall_rating: u32,
    /// Lifetime points across all categories
    pub total_points: u32,
    /// Month-to-date points across all categories
    pub monthly_points: u32,
    pub tier: Tier,
    /// Capture timestamp, milliseconds since epoch
    pub captured_at: i64,
}

impl RatingSnapshot {
    /// Fully zeroed snapshot used as the degraded default when a
    /// recomputation fails. The rating screen never hard-fails.
    pub fn zero(captured_at: i64) -> Self {
        Self {
            stats: CategoryStats::default(),
            overall_rating: 0,
            total_points: 0,
            monthly_points: 0,
            tier: Tier::default(),
            captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for c in Category::ALL {
            assert_eq!(Category::from_str(c.as_str()), Some(c));
        }
    }

    #[test]
    fn test_overall_rating_rounds_half_up() {
        let stats = CategoryStats {
            discipline: 20,
            focus: 16,
            ..Default::default()
        };
        // total 36, mean 4.5 -> 5
        assert_eq!(stats.overall_rating(), 5);
    }

    #[test]
    fn test_category_stats_add_saturates() {
        let mut a = CategoryStats {
            discipline: u32::MAX - 1,
            ..Default::default()
        };
        let b = CategoryStats {
            discipline: 10,
            ..Default::default()
        };
        a.add(&b);
        assert_eq!(a.discipline, u32::MAX);
    }

    #[test]
    fn test_category_stats_sub_saturates_at_zero() {
        let mut a = CategoryStats {
            discipline: 10,
            focus: 5,
            ..Default::default()
        };
        let b = CategoryStats {
            discipline: 4,
            focus: 9,
            ..Default::default()
        };
        a.sub(&b);
        assert_eq!(a.discipline, 6);
        assert_eq!(a.focus, 0);
    }

    #[test]
    fn test_point_source_roundtrip() {
        let sources = [
            PointSource::Journal,
            PointSource::GoalCompleted,
            PointSource::HabitStreak,
            PointSource::MonthlyBonus,
        ];
        for s in sources {
            assert_eq!(PointSource::from_str(s.as_str()), Some(s));
        }
    }
}
