//! Media lookup and download: yt-dlp, lyrics.ovh and the Spotify downloader API.

pub mod lyrics;
pub mod spotify;
pub mod ytdlp;

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;
use tracing::{debug, warn};

pub use lyrics::LyricsClient;
pub use spotify::SpotifyClient;
pub use ytdlp::YtDlp;

/// Split-stream format capped at 480p so uploads stay small.
pub const VIDEO_480P_FORMAT: &str = "bv*[height<=480]+ba/best[height<=480]";

/// Top search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_secs: Option<u64>,
    pub views: Option<u64>,
    /// Channel or uploader name.
    pub author: Option<String>,
}

impl VideoInfo {
    /// `m:ss` or `h:mm:ss`.
    pub fn duration_label(&self) -> String {
        match self.duration_secs {
            Some(secs) => {
                let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
                if h > 0 {
                    format!("{}:{:02}:{:02}", h, m, s)
                } else {
                    format!("{}:{:02}", m, s)
                }
            }
            None => "Unknown".to_string(),
        }
    }

    /// Thousands-separated view count.
    pub fn views_label(&self) -> String {
        match self.views {
            Some(views) => {
                let digits = views.to_string();
                let mut out = String::with_capacity(digits.len() + digits.len() / 3);
                for (i, c) in digits.chars().enumerate() {
                    if i > 0 && (digits.len() - i) % 3 == 0 {
                        out.push(',');
                    }
                    out.push(c);
                }
                out
            }
            None => "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadKind {
    /// Extract audio to mp3.
    Audio,
    /// Download with the given yt-dlp format selector, merged to mp4.
    Video { format: String },
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output: PathBuf,
    pub kind: DownloadKind,
}

/// Search and download backend.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// First search result for `query`, if any.
    async fn search(&self, query: &str) -> Result<Option<VideoInfo>, String>;

    /// Download to `request.output`. Ok means the file exists.
    async fn download(&self, request: &DownloadRequest) -> Result<(), String>;
}

/// A download slot: a private directory under the temp dir holding one output file.
///
/// Dropping it removes the whole directory, so yt-dlp's intermediates
/// (`<name>.f137.mp4`, `<name>.f140.m4a.part`, ...) go too.
#[derive(Debug)]
pub struct TempMedia {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TempMedia {
    /// Reserve `<dir>/dl-XXXX/<stem>.<ext>`, creating `dir` if needed.
    pub fn reserve(dir: &Path, stem: &str, ext: &str) -> Result<Self, String> {
        std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create {:?}: {e}", dir))?;
        let slot = tempfile::Builder::new()
            .prefix("dl-")
            .tempdir_in(dir)
            .map_err(|e| format!("Failed to create download dir in {:?}: {e}", dir))?;
        let path = slot.path().join(format!("{}.{}", stem.replace(' ', "_"), ext));
        Ok(Self { dir: Some(slot), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Result<u64, String> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| format!("Failed to stat {:?}: {e}", self.path))
    }

    pub async fn read(&self) -> Result<Vec<u8>, String> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| format!("Failed to read {:?}: {e}", self.path))
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!("🗑️ Removed {:?}", path),
            Err(e) => warn!("Failed to remove {:?}: {e}", path),
        }
    }
}

/// File-name-safe version of a title: ASCII word chars, whitespace, `.` and `-`.
pub fn safe_file_stem(title: &str, max_chars: usize, fallback: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-' || *c == ' ')
        .take(max_chars)
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Where a `.short` link points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    TikTok,
    Instagram,
    Facebook,
    YouTube,
    Generic,
}

static TIKTOK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)tiktok\.com").expect("static regex"));
static INSTAGRAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)instagram\.com").expect("static regex"));
static FACEBOOK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)facebook\.com|fb\.watch").expect("static regex"));
static YT_SHORTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)youtube\.com/shorts").expect("static regex"));
static HTTP_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^https?://\S+$").expect("static regex"));

impl Platform {
    pub fn detect(url: &str) -> Self {
        if TIKTOK.is_match(url) {
            Platform::TikTok
        } else if INSTAGRAM.is_match(url) {
            Platform::Instagram
        } else if FACEBOOK.is_match(url) {
            Platform::Facebook
        } else if YT_SHORTS.is_match(url) {
            Platform::YouTube
        } else {
            Platform::Generic
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::YouTube => "youtube",
            Platform::Generic => "generic",
        }
    }

    /// YouTube serves split streams; the short-video sites serve progressive mp4.
    pub fn format(self) -> &'static str {
        match self {
            Platform::YouTube => VIDEO_480P_FORMAT,
            _ => "best",
        }
    }
}

pub fn is_http_url(text: &str) -> bool {
    HTTP_URL.is_match(text)
}
