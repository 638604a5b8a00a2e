use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::entitlement::normalize_jid;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// JIDs with unlimited downloads and access to premium management commands.
    #[serde(default)]
    admin_jids: Vec<String>,
    #[serde(default = "default_bot_name")]
    bot_name: String,
    /// Line shown by `.developer`.
    developer: Option<String>,
    /// Directory for the session store, usage/premium tables and logs.
    data_dir: Option<String>,
    /// Directory for in-flight downloads.
    tmp_dir: Option<String>,
    #[serde(default = "default_ytdlp_path")]
    ytdlp_path: String,
    #[serde(default = "default_ffmpeg_path")]
    ffmpeg_path: String,
    #[serde(default = "default_download_timeout_secs")]
    download_timeout_secs: u64,
    #[serde(default = "default_daily_song_limit")]
    daily_song_limit: u32,
    #[serde(default = "default_daily_video_limit")]
    daily_video_limit: u32,
    #[serde(default = "default_premium_days")]
    premium_days: u32,
    /// Largest video we try to upload, in MiB.
    #[serde(default = "default_max_upload_mb")]
    max_upload_mb: u64,
    #[serde(default = "default_lyrics_api_url")]
    lyrics_api_url: String,
    #[serde(default = "default_spotify_api_url")]
    spotify_api_url: String,
    /// Appended to limit-reached replies (payment instructions etc).
    upgrade_notice: Option<String>,
    /// Chat that receives forwarded log lines.
    log_chat_jid: Option<String>,
}

fn default_bot_name() -> String {
    "Webs Bot".to_string()
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_download_timeout_secs() -> u64 {
    600
}

fn default_daily_song_limit() -> u32 {
    2
}

fn default_daily_video_limit() -> u32 {
    1
}

fn default_premium_days() -> u32 {
    30
}

fn default_max_upload_mb() -> u64 {
    95
}

fn default_lyrics_api_url() -> String {
    "https://api.lyrics.ovh".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotifydown.com".to_string()
}

pub struct Config {
    /// Path the config was loaded from.
    pub config_path: PathBuf,
    /// Normalized admin JIDs (device suffix stripped).
    pub admin_jids: HashSet<String>,
    pub bot_name: String,
    pub developer: String,
    pub data_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    /// Upper bound on a single yt-dlp run.
    pub download_timeout: Duration,
    pub daily_song_limit: u32,
    pub daily_video_limit: u32,
    pub premium_days: u32,
    pub max_upload_bytes: u64,
    pub lyrics_api_url: String,
    pub spotify_api_url: String,
    pub upgrade_notice: String,
    pub log_chat_jid: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        for jid in &file.admin_jids {
            if !jid.contains('@') {
                return Err(ConfigError::Validation(format!(
                    "admin_jids entry '{}' is not a JID (expected e.g. 265991234567@s.whatsapp.net)",
                    jid
                )));
            }
        }
        if file.daily_song_limit == 0 || file.daily_video_limit == 0 {
            return Err(ConfigError::Validation("daily limits must be at least 1".into()));
        }
        if file.premium_days == 0 {
            return Err(ConfigError::Validation("premium_days must be at least 1".into()));
        }
        if file.max_upload_mb == 0 {
            return Err(ConfigError::Validation("max_upload_mb must be at least 1".into()));
        }
        let max_upload_bytes = file
            .max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Validation(format!("max_upload_mb {} is too large", file.max_upload_mb)))?;
        if file.download_timeout_secs == 0 {
            return Err(ConfigError::Validation("download_timeout_secs must be at least 1".into()));
        }
        if let Some(ref jid) = file.log_chat_jid
            && !jid.contains('@')
        {
            return Err(ConfigError::Validation(format!("log_chat_jid '{}' is not a JID", jid)));
        }

        let bot_name = file.bot_name;
        let developer = file
            .developer
            .unwrap_or_else(|| format!("{} is maintained by its admins.", bot_name));
        let upgrade_notice = file.upgrade_notice.unwrap_or_else(|| {
            "💎 Upgrade to unlimited downloads by contacting the bot admin.".to_string()
        });

        Ok(Self {
            config_path,
            admin_jids: file.admin_jids.iter().map(|j| normalize_jid(j)).collect(),
            bot_name,
            developer,
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            tmp_dir: file.tmp_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("tmp")),
            ytdlp_path: file.ytdlp_path,
            ffmpeg_path: file.ffmpeg_path,
            download_timeout: Duration::from_secs(file.download_timeout_secs),
            daily_song_limit: file.daily_song_limit,
            daily_video_limit: file.daily_video_limit,
            premium_days: file.premium_days,
            max_upload_bytes,
            lyrics_api_url: file.lyrics_api_url.trim_end_matches('/').to_string(),
            spotify_api_url: file.spotify_api_url.trim_end_matches('/').to_string(),
            upgrade_notice,
            log_chat_jid: file.log_chat_jid,
        })
    }

    pub fn session_db_path(&self) -> PathBuf {
        self.data_dir.join("session.db")
    }

    pub fn usage_path(&self) -> PathBuf {
        self.data_dir.join("usage.json")
    }

    pub fn premium_path(&self) -> PathBuf {
        self.data_dir.join("premium.json")
    }

    pub fn qr_path(&self) -> PathBuf {
        self.data_dir.join("qr.svg")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
impl Config {
    /// Defaults rooted in a scratch directory.
    pub fn for_tests(root: &Path) -> Self {
        Self {
            config_path: root.join("websbot.json"),
            admin_jids: HashSet::from(["100@s.whatsapp.net".to_string()]),
            bot_name: "Test Bot".to_string(),
            developer: "Developed by tests".to_string(),
            data_dir: root.join("data"),
            tmp_dir: root.join("tmp"),
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_path: default_ffmpeg_path(),
            download_timeout: Duration::from_secs(5),
            daily_song_limit: 2,
            daily_video_limit: 1,
            premium_days: 30,
            max_upload_bytes: 1024,
            lyrics_api_url: "http://127.0.0.1:9".to_string(),
            spotify_api_url: "http://127.0.0.1:9".to_string(),
            upgrade_notice: "💎 Ask an admin.".to_string(),
            log_chat_jid: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config("{}");
        let config = Config::load(file.path()).expect("should load empty config");
        assert!(config.admin_jids.is_empty());
        assert_eq!(config.bot_name, "Webs Bot");
        assert_eq!(config.daily_song_limit, 2);
        assert_eq!(config.daily_video_limit, 1);
        assert_eq!(config.premium_days, 30);
        assert_eq!(config.max_upload_bytes, 95 * 1024 * 1024);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.usage_path(), PathBuf::from("data/usage.json"));
        assert_eq!(config.lyrics_api_url, "https://api.lyrics.ovh");
    }

    #[test]
    fn test_admins_are_normalized() {
        let file = write_config(r#"{
            "admin_jids": ["265991234567:12@s.whatsapp.net", "192380812664956@lid"]
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.admin_jids,
            HashSet::from([
                "265991234567@s.whatsapp.net".to_string(),
                "192380812664956@lid".to_string(),
            ])
        );
    }

    #[test]
    fn test_trailing_slash_trimmed_from_api_urls() {
        let file = write_config(r#"{ "lyrics_api_url": "http://localhost:8080/" }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.lyrics_api_url, "http://localhost:8080");
    }

    #[test]
    fn test_admin_without_domain_rejected() {
        let file = write_config(r#"{ "admin_jids": ["265991234567"] }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("admin_jids"));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let file = write_config(r#"{ "daily_video_limit": 0 }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_premium_days_rejected() {
        let file = write_config(r#"{ "premium_days": 0 }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("premium_days"));
    }

    #[test]
    fn test_huge_upload_cap_rejected() {
        let file = write_config(r#"{ "max_upload_mb": 18446744073709551615 }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("max_upload_mb"));
    }

    #[test]
    fn test_bad_log_chat_rejected() {
        let file = write_config(r#"{ "log_chat_jid": "nope" }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("log_chat_jid"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/websbot.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
