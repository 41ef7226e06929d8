//! Gritcard - a personal discipline tracker
//!
//! Gritcard turns daily actions (journaling, focus sessions, goals,
//! todos, time outside) into points across eight life categories,
//! aggregates them into monthly and lifetime ratings, classifies the
//! result into tiers and optionally pushes a summary to a shared
//! leaderboard.
//!
//! The engine lives in [`stats`]; [`config`] holds the file-backed
//! settings the CLI wires it up from.

pub mod config;
pub mod stats;

pub use config::Config;
pub use stats::{Period, RatingEngine, RatingSnapshot, Tier};
