//! Whole-file JSON persistence shared by the usage and premium tables.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};

/// Load a table, falling back to an empty one when the file is missing or unreadable.
pub fn load_table<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return T::default();
    }

    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to read {:?}: {e}", path);
            return T::default();
        }
    };

    match serde_json::from_str(&json) {
        Ok(table) => table,
        Err(e) => {
            warn!("Failed to parse {:?}: {e}", path);
            T::default()
        }
    }
}

/// Write a table through a sibling temp file so readers never see a half-written file.
pub fn save_table<T: Serialize>(path: &Path, table: &T) -> Result<(), String> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create {:?}: {e}", dir))?;
    }

    let json = serde_json::to_string_pretty(table).map_err(|e| format!("Failed to serialize: {e}"))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| format!("Failed to write {:?}: {e}", tmp))?;
    std::fs::rename(&tmp, path).map_err(|e| format!("Failed to replace {:?}: {e}", path))?;

    debug!("💾 Saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let table: HashMap<String, u32> = load_table(&dir.path().join("nope.json"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "{ not json").unwrap();
        let table: HashMap<String, u32> = load_table(&path);
        assert!(table.is_empty());
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("premium.json");
        let table = HashMap::from([("a".to_string(), 7u32)]);
        save_table(&path, &table).unwrap();

        let loaded: HashMap<String, u32> = load_table(&path);
        assert_eq!(loaded, table);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
