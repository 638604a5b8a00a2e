//! Per-user daily download counters backed by `usage.json`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

use super::store::{load_table, save_table};

/// What a counted download consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Song,
    Video,
}

impl QuotaKind {
    pub fn label(self) -> &'static str {
        match self {
            QuotaKind::Song => "song",
            QuotaKind::Video => "video",
        }
    }
}

/// One user's counters for a single UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub songs: u32,
    #[serde(default)]
    pub videos: u32,
}

impl DailyUsage {
    fn fresh(today: &str) -> Self {
        Self { date: today.to_string(), songs: 0, videos: 0 }
    }

    fn counter(&mut self, kind: QuotaKind) -> &mut u32 {
        match kind {
            QuotaKind::Song => &mut self.songs,
            QuotaKind::Video => &mut self.videos,
        }
    }
}

type UsageTable = HashMap<String, DailyUsage>;

#[derive(Debug, Clone, Copy)]
pub struct DailyLimits {
    pub songs: u32,
    pub videos: u32,
}

impl DailyLimits {
    pub fn for_kind(&self, kind: QuotaKind) -> u32 {
        match kind {
            QuotaKind::Song => self.songs,
            QuotaKind::Video => self.videos,
        }
    }
}

/// Daily counter keyed by sender JID.
pub struct UsageTracker {
    path: PathBuf,
    limits: DailyLimits,
    /// Serializes read-modify-write of the file.
    lock: Mutex<()>,
}

impl UsageTracker {
    pub fn new(path: PathBuf, limits: DailyLimits) -> Self {
        Self { path, limits, lock: Mutex::new(()) }
    }

    pub fn limits(&self) -> DailyLimits {
        self.limits
    }

    /// Count one download if the sender is under today's limit.
    ///
    /// Returns false without touching the file when the limit is already reached.
    pub fn check_and_increment(&self, jid: &str, kind: QuotaKind, today: NaiveDate) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let today = today.format("%Y-%m-%d").to_string();

        let mut table: UsageTable = load_table(&self.path);
        let usage = table
            .entry(jid.to_string())
            .or_insert_with(|| DailyUsage::fresh(&today));

        if usage.date != today {
            *usage = DailyUsage::fresh(&today);
        }

        let limit = self.limits.for_kind(kind);
        let counter = usage.counter(kind);
        if *counter >= limit {
            info!("🚫 {} reached daily {} limit ({}/{})", jid, kind.label(), counter, limit);
            return false;
        }
        *counter += 1;
        let used = *counter;

        if let Err(e) = save_table(&self.path, &table) {
            warn!("Error saving usage: {e}");
        }
        info!("📊 {} used {}/{} {}s today", jid, used, limit, kind.label());
        true
    }

    /// Downloads of `kind` the sender has left today.
    pub fn remaining(&self, jid: &str, kind: QuotaKind, today: NaiveDate) -> u32 {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let today = today.format("%Y-%m-%d").to_string();
        let table: UsageTable = load_table(&self.path);
        let limit = self.limits.for_kind(kind);

        match table.get(jid) {
            Some(usage) if usage.date == today => {
                let used = match kind {
                    QuotaKind::Song => usage.songs,
                    QuotaKind::Video => usage.videos,
                };
                limit.saturating_sub(used)
            }
            _ => limit,
        }
    }
}
