//! Tier classification
//!
//! Maps a total-points scalar onto seven ordered tiers via fixed
//! ascending thresholds. No hysteresis: the classifier is a pure
//! total-ordering function of the input.

use serde::{Deserialize, Serialize};

/// The seven card tiers, lowest to highest
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
    Obsidian,
}

/// Ascending point thresholds, aligned with the `Tier` variant order
pub static TIER_THRESHOLDS: &[(Tier, u32)] = &[
    (Tier::Bronze, 0),
    (Tier::Silver, 200),
    (Tier::Gold, 500),
    (Tier::Platinum, 1000),
    (Tier::Diamond, 2000),
    (Tier::Master, 3500),
    (Tier::Obsidian, 5000),
];

impl Tier {
    /// Highest tier whose threshold is <= `total_points`
    pub fn for_points(total_points: u32) -> Tier {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(_, required)| total_points >= *required)
            .map(|(tier, _)| *tier)
            .unwrap_or(Tier::Bronze)
    }

    /// Points needed to enter this tier
    pub fn threshold(&self) -> u32 {
        TIER_THRESHOLDS
            .iter()
            .find(|(tier, _)| tier == self)
            .map(|(_, required)| *required)
            .unwrap_or(0)
    }

    /// Threshold of the next tier up (None at Obsidian)
    pub fn next_threshold(&self) -> Option<u32> {
        let idx = TIER_THRESHOLDS.iter().position(|(tier, _)| tier == self)?;
        TIER_THRESHOLDS.get(idx + 1).map(|(_, required)| *required)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Diamond => "diamond",
            Self::Master => "master",
            Self::Obsidian => "obsidian",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Diamond => "Diamond",
            Self::Master => "Master",
            Self::Obsidian => "Obsidian",
        }
    }
}
