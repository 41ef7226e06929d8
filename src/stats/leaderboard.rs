//! Leaderboard Sync - best-effort push to the external ranking service
//!
//! The engine only pushes; it never reads back its own writes. Pushes
//! run on a detached thread whose failures are logged and swallowed -
//! a save action must never block on, or fail because of, the network.

use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::tier::Tier;

/// Summary row upserted to (and returned by) the ranking service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_points: u32,
    pub monthly_points: u32,
    pub overall_rating: u32,
    pub tier: Tier,
}

/// External ranking service: upsert-by-user plus a top-N query
pub trait RankingService: Send + Sync {
    fn upsert(&self, entry: &LeaderboardEntry) -> Result<()>;
    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;
}

/// HTTP-backed ranking service client
pub struct HttpRankingService {
    base_url: String,
}

impl HttpRankingService {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl RankingService for HttpRankingService {
    fn upsert(&self, entry: &LeaderboardEntry) -> Result<()> {
        let url = format!("{}/users/{}", self.base_url, entry.username);
        ureq::put(&url)
            .set("User-Agent", "gritcard")
            .send_json(serde_json::to_value(entry)?)
            .map_err(|e| anyhow!("Leaderboard upsert failed: {e}"))?;
        Ok(())
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let url = format!("{}/top?limit={limit}", self.base_url);
        let response = ureq::get(&url)
            .set("User-Agent", "gritcard")
            .call()
            .map_err(|e| anyhow!("Leaderboard query failed: {e}"))?;
        let entries: Vec<LeaderboardEntry> = response.into_json()?;
        Ok(entries)
    }
}

/// Submit an upsert on a detached background thread. The handle is
/// returned for tests; production callers drop it.
pub fn spawn_upsert(
    service: Arc<dyn RankingService>,
    entry: LeaderboardEntry,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = service.upsert(&entry) {
            tracing::warn!("Leaderboard sync failed (ignored): {e:#}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        upserts: Mutex<Vec<LeaderboardEntry>>,
        fail: bool,
    }

    impl RankingService for RecordingService {
        fn upsert(&self, entry: &LeaderboardEntry) -> Result<()> {
            if self.fail {
                return Err(anyhow!("boom"));
            }
            self.upserts.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
            let mut entries = self.upserts.lock().unwrap().clone();
            entries.sort_by(|a, b| b.total_points.cmp(&a.total_points));
            entries.truncate(limit);
            Ok(entries)
        }
    }

    fn entry(username: &str, total: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            username: username.to_string(),
            total_points: total,
            monthly_points: total,
            overall_rating: total / 8,
            tier: Tier::for_points(total),
        }
    }

    #[test]
    fn test_spawn_upsert_delivers() {
        let service = Arc::new(RecordingService::default());
        spawn_upsert(service.clone(), entry("ada", 120))
            .join()
            .unwrap();
        assert_eq!(service.upserts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_spawn_upsert_swallows_failure() {
        let service = Arc::new(RecordingService {
            fail: true,
            ..Default::default()
        });
        // Must not panic or propagate
        spawn_upsert(service, entry("ada", 120)).join().unwrap();
    }

    #[test]
    fn test_top_orders_by_total_points() {
        let service = RecordingService::default();
        service.upsert(&entry("ada", 120)).unwrap();
        service.upsert(&entry("grace", 500)).unwrap();
        let top = service.top(1).unwrap();
        assert_eq!(top[0].username, "grace");
    }
}
