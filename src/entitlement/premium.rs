//! Premium subscriptions with expiry, backed by `premium.json`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

use super::store::{load_table, save_table};

/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumEntry {
    pub added_at: i64,
    pub expires_at: i64,
}

impl PremiumEntry {
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now.timestamp_millis()
    }
}

type PremiumTable = HashMap<String, PremiumEntry>;

pub struct PremiumStore {
    path: PathBuf,
    period: Duration,
    lock: Mutex<()>,
}

impl PremiumStore {
    pub fn new(path: PathBuf, days: u32) -> Self {
        Self {
            path,
            period: Duration::days(i64::from(days)),
            lock: Mutex::new(()),
        }
    }

    /// Active entry for `jid`, dropping it from the file if it has expired.
    pub fn active_entry(&self, jid: &str, now: DateTime<Utc>) -> Option<PremiumEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut table: PremiumTable = load_table(&self.path);
        let entry = *table.get(jid)?;

        if entry.is_expired(now) {
            info!("⏰ Premium expired for {}", jid);
            table.remove(jid);
            if let Err(e) = save_table(&self.path, &table) {
                warn!("Error saving premium: {e}");
            }
            return None;
        }
        Some(entry)
    }

    pub fn is_premium(&self, jid: &str, now: DateTime<Utc>) -> bool {
        self.active_entry(jid, now).is_some()
    }

    /// Grant (or restart) a premium period starting at `now`.
    pub fn add(&self, jid: &str, now: DateTime<Utc>) -> Result<PremiumEntry, String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut table: PremiumTable = load_table(&self.path);

        let entry = PremiumEntry {
            added_at: now.timestamp_millis(),
            expires_at: (now + self.period).timestamp_millis(),
        };
        table.insert(jid.to_string(), entry);
        save_table(&self.path, &table)?;

        info!("💎 Premium added for {} until {:?}", jid, entry.expires());
        Ok(entry)
    }

    /// Returns whether an entry existed.
    pub fn remove(&self, jid: &str) -> Result<bool, String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut table: PremiumTable = load_table(&self.path);

        if table.remove(jid).is_none() {
            return Ok(false);
        }
        save_table(&self.path, &table)?;
        info!("Premium removed for {}", jid);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(day: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2026-03-{:02}T12:00:00Z", day))
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_unknown_jid_not_premium() {
        let dir = TempDir::new().unwrap();
        let store = PremiumStore::new(dir.path().join("premium.json"), 30);
        assert!(!store.is_premium("a@s.whatsapp.net", at(1)));
    }

    #[test]
    fn test_add_then_active_until_expiry() {
        let dir = TempDir::new().unwrap();
        let store = PremiumStore::new(dir.path().join("premium.json"), 10);

        let entry = store.add("a@s.whatsapp.net", at(1)).unwrap();
        assert_eq!(entry.expires_at - entry.added_at, 10 * 24 * 60 * 60 * 1000);
        assert!(store.is_premium("a@s.whatsapp.net", at(5)));
        assert!(store.is_premium("a@s.whatsapp.net", at(11)));
        assert!(!store.is_premium("a@s.whatsapp.net", at(12)));
    }

    #[test]
    fn test_expired_entry_removed_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("premium.json");
        let store = PremiumStore::new(path.clone(), 1);
        store.add("a@s.whatsapp.net", at(1)).unwrap();
        store.add("b@s.whatsapp.net", at(20)).unwrap();

        assert!(!store.is_premium("a@s.whatsapp.net", at(20)));

        let table: PremiumTable = load_table(&path);
        assert!(!table.contains_key("a@s.whatsapp.net"));
        assert!(table.contains_key("b@s.whatsapp.net"));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = PremiumStore::new(dir.path().join("premium.json"), 30);
        store.add("a@s.whatsapp.net", at(1)).unwrap();

        assert!(store.remove("a@s.whatsapp.net").unwrap());
        assert!(!store.remove("a@s.whatsapp.net").unwrap());
        assert!(!store.is_premium("a@s.whatsapp.net", at(2)));
    }

    #[test]
    fn test_file_uses_camel_case_millis() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("premium.json");
        std::fs::write(
            &path,
            r#"{ "a@s.whatsapp.net": { "addedAt": 0, "expiresAt": 4102444800000 } }"#,
        )
        .unwrap();
        let store = PremiumStore::new(path, 30);
        assert!(store.is_premium("a@s.whatsapp.net", at(1)));
    }
}
