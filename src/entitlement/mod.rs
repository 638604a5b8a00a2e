//! Who may download how much: admin allowlist, premium table and daily quota.

pub mod premium;
pub mod store;
pub mod usage;

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use crate::config::Config;
pub use premium::{PremiumEntry, PremiumStore};
pub use usage::{DailyLimits, QuotaKind, UsageTracker};

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admin,
    Premium,
    /// Counted against the daily quota.
    Counted,
    LimitReached,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Decision::LimitReached)
    }
}

/// Snapshot for `.mystatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Standing {
    Admin,
    Premium(PremiumEntry),
    Free { songs_left: u32, videos_left: u32, limits: (u32, u32) },
}

pub struct Entitlements {
    admins: HashSet<String>,
    premium: PremiumStore,
    usage: UsageTracker,
}

impl Entitlements {
    pub fn new(admins: HashSet<String>, premium: PremiumStore, usage: UsageTracker) -> Self {
        Self { admins, premium, usage }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.admin_jids.clone(),
            PremiumStore::new(config.premium_path(), config.premium_days),
            UsageTracker::new(
                config.usage_path(),
                DailyLimits {
                    songs: config.daily_song_limit,
                    videos: config.daily_video_limit,
                },
            ),
        )
    }

    pub fn is_admin(&self, jid: &str) -> bool {
        self.admins.contains(&normalize_jid(jid))
    }

    pub fn premium(&self) -> &PremiumStore {
        &self.premium
    }

    pub fn limits(&self) -> DailyLimits {
        self.usage.limits()
    }

    /// Admins and premium users pass freely; everyone else spends daily quota.
    pub fn check_limit_or_premium(&self, sender: &str, kind: QuotaKind) -> Decision {
        self.check_at(sender, kind, Utc::now())
    }

    pub fn check_at(&self, sender: &str, kind: QuotaKind, now: DateTime<Utc>) -> Decision {
        let sender = normalize_jid(sender);
        debug!("Checking {} quota for {}", kind.label(), sender);

        if self.admins.contains(&sender) {
            debug!("👑 {} is admin", sender);
            return Decision::Admin;
        }
        if self.premium.is_premium(&sender, now) {
            debug!("💎 {} is premium", sender);
            return Decision::Premium;
        }
        if self.usage.check_and_increment(&sender, kind, now.date_naive()) {
            Decision::Counted
        } else {
            Decision::LimitReached
        }
    }

    pub fn standing_at(&self, sender: &str, now: DateTime<Utc>) -> Standing {
        let sender = normalize_jid(sender);
        if self.admins.contains(&sender) {
            return Standing::Admin;
        }
        if let Some(entry) = self.premium.active_entry(&sender, now) {
            return Standing::Premium(entry);
        }
        let today = now.date_naive();
        let limits = self.usage.limits();
        Standing::Free {
            songs_left: self.usage.remaining(&sender, QuotaKind::Song, today),
            videos_left: self.usage.remaining(&sender, QuotaKind::Video, today),
            limits: (limits.songs, limits.videos),
        }
    }
}

/// Strip the device part so `123:4@s.whatsapp.net` and `123@s.whatsapp.net` match.
pub fn normalize_jid(jid: &str) -> String {
    let jid = jid.trim();
    match jid.split_once('@') {
        Some((user, server)) => {
            let user = user.split_once(':').map_or(user, |(u, _)| u);
            format!("{}@{}", user, server)
        }
        None => jid.to_string(),
    }
}

/// Accept a bare phone number (`+265 99 123 4567`), an `@mention` or a full JID.
pub fn jid_from_input(input: &str) -> Option<String> {
    let input = input.trim().trim_start_matches('@');
    if input.contains('@') {
        return Some(normalize_jid(input));
    }
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    let only_number_chars = input
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if digits.len() < 7 || !only_number_chars {
        return None;
    }
    Some(format!("{}@s.whatsapp.net", digits))
}
