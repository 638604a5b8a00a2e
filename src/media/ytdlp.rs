//! yt-dlp wrapper: YouTube search and downloads via a child process.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{DownloadKind, DownloadRequest, MediaSource, VideoInfo};

/// Stderr fragments meaning retrying will not help.
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is private",
    "Sign in to confirm your age",
    "members-only",
    "removed by the uploader",
    "blocked it in your country",
    "copyright",
    "ERROR: Unsupported URL",
    "is not a valid URL",
    "HTTP Error 403",
    "HTTP Error 404",
];

/// Stderr fragments for transient failures.
const RETRYABLE_ERROR_PATTERNS: &[&str] = &[
    "Connection reset",
    "Connection timed out",
    "Unable to download webpage",
    "HTTP Error 429",
    "HTTP Error 503",
    "Read timed out",
    "Temporary failure in name resolution",
];

/// How a failed run should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Fatal,
    Retryable,
    Unknown,
}

pub fn classify_failure(stderr: &str) -> FailureClass {
    if FATAL_ERROR_PATTERNS.iter().any(|p| stderr.contains(p)) {
        FailureClass::Fatal
    } else if RETRYABLE_ERROR_PATTERNS.iter().any(|p| stderr.contains(p)) {
        FailureClass::Retryable
    } else {
        FailureClass::Unknown
    }
}

/// One line of `yt-dlp -j --flat-playlist` output.
#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
}

impl SearchEntry {
    fn into_info(self) -> VideoInfo {
        let url = self
            .webpage_url
            .or(self.url.filter(|u| u.starts_with("http")))
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id));
        VideoInfo {
            title: self.title.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            url,
            duration_secs: self.duration.filter(|d| *d >= 0.0).map(|d| d.round() as u64),
            views: self.view_count,
            author: self.channel.or(self.uploader),
        }
    }
}

/// Parse the first JSON line of a search run.
pub fn parse_search_output(stdout: &str) -> Result<Option<VideoInfo>, String> {
    let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(None);
    };
    let entry: SearchEntry =
        serde_json::from_str(line).map_err(|e| format!("Failed to parse yt-dlp output: {e}"))?;
    Ok(Some(entry.into_info()))
}

pub struct YtDlp {
    binary: String,
    ffmpeg: String,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: String, ffmpeg: String, timeout: Duration) -> Self {
        Self { binary, ffmpeg, timeout }
    }

    pub fn search_args(query: &str) -> Vec<String> {
        vec![
            format!("ytsearch1:{}", query),
            "-j".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
        ]
    }

    pub fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args: Vec<String> = match &request.kind {
            DownloadKind::Audio => vec!["-x".into(), "--audio-format".into(), "mp3".into()],
            DownloadKind::Video { format } => vec![
                "-f".into(),
                format.clone(),
                "--merge-output-format".into(),
                "mp4".into(),
            ],
        };
        args.extend([
            "--no-playlist".to_string(),
            "--ffmpeg-location".to_string(),
            self.ffmpeg.clone(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "-o".to_string(),
            request.output.to_string_lossy().into_owned(),
            request.url.clone(),
        ]);
        args
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output, String> {
        debug!("Running {} {:?}", self.binary, args);
        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to run {}: {e}", self.binary))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| format!("Failed to wait for {}: {e}", self.binary)),
            Err(_) => Err(format!("{} timed out after {}s", self.binary, self.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn search(&self, query: &str) -> Result<Option<VideoInfo>, String> {
        info!("🔎 Searching: {}", query);
        let output = self.run(&Self::search_args(query)).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("yt-dlp search failed ({}): {}", output.status, stderr.trim()));
        }

        let result = parse_search_output(&String::from_utf8_lossy(&output.stdout))?;
        if let Some(ref video) = result {
            info!("🔎 Found \"{}\" ({})", video.title, video.url);
        }
        Ok(result)
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), String> {
        info!("📥 Downloading {} -> {:?}", request.url, request.output);
        let output = self.run(&self.download_args(request)).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let class = classify_failure(&stderr);
            warn!("yt-dlp failed ({:?}, {}): {}", class, output.status, stderr.trim());
            return Err(format!("yt-dlp exited with {}", output.status));
        }
        if !request.output.exists() {
            return Err("yt-dlp produced no file".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ytdlp() -> YtDlp {
        YtDlp::new("yt-dlp".into(), "/usr/bin/ffmpeg".into(), Duration::from_secs(30))
    }

    #[test]
    fn test_search_args() {
        assert_eq!(
            YtDlp::search_args("burna boy last last"),
            vec!["ytsearch1:burna boy last last", "-j", "--flat-playlist", "--no-warnings"]
        );
    }

    #[test]
    fn test_audio_args() {
        let request = DownloadRequest {
            url: "https://www.youtube.com/watch?v=abc".into(),
            output: PathBuf::from("tmp/1.mp3"),
            kind: DownloadKind::Audio,
        };
        let args = ytdlp().download_args(&request);
        assert_eq!(&args[..3], ["-x", "--audio-format", "mp3"]);
        assert!(args.windows(2).any(|w| w == ["--ffmpeg-location", "/usr/bin/ffmpeg"]));
        assert!(args.windows(2).any(|w| w == ["-o", "tmp/1.mp3"]));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn test_video_args() {
        let request = DownloadRequest {
            url: "https://youtu.be/abc".into(),
            output: PathBuf::from("tmp/1.mp4"),
            kind: DownloadKind::Video { format: "best".into() },
        };
        let args = ytdlp().download_args(&request);
        assert_eq!(&args[..4], ["-f", "best", "--merge-output-format", "mp4"]);
    }

    #[test]
    fn test_parse_search_output() {
        let stdout = r#"{"id": "abc123", "title": "Artist - Song", "url": "https://www.youtube.com/watch?v=abc123", "duration": 215.0, "view_count": 1500000, "channel": "ArtistVEVO"}
"#;
        let info = parse_search_output(stdout).unwrap().unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.title, "Artist - Song");
        assert_eq!(info.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(info.duration_secs, Some(215));
        assert_eq!(info.views, Some(1500000));
        assert_eq!(info.author.as_deref(), Some("ArtistVEVO"));
    }

    #[test]
    fn test_parse_search_output_builds_url_from_id() {
        let info = parse_search_output(r#"{"id": "xyz", "url": "xyz"}"#).unwrap().unwrap();
        assert_eq!(info.url, "https://www.youtube.com/watch?v=xyz");
        assert_eq!(info.title, "xyz");
        assert_eq!(info.duration_secs, None);
    }

    #[test]
    fn test_parse_empty_output() {
        assert_eq!(parse_search_output("\n").unwrap(), None);
        assert!(parse_search_output("not json").is_err());
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure("ERROR: [youtube] abc: Private video"), FailureClass::Fatal);
        assert_eq!(classify_failure("ERROR: HTTP Error 429: Too Many Requests"), FailureClass::Retryable);
        assert_eq!(classify_failure("something else"), FailureClass::Unknown);
    }

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let ytdlp = YtDlp::new(
            "/nonexistent/yt-dlp".into(),
            "ffmpeg".into(),
            Duration::from_secs(5),
        );
        let err = ytdlp.search("anything").await.unwrap_err();
        assert!(err.contains("Failed to run"));
    }
}
