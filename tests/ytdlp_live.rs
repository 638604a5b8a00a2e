//! Live tests against the real `yt-dlp` binary.
//!
//! These tests require:
//! 1. `yt-dlp` on PATH (or YTDLP_PATH)
//! 2. `ffmpeg` on PATH (or FFMPEG_PATH)
//! 3. Network access
//!
//! Run with: cargo test --features integ_test --test ytdlp_live

#[cfg(feature = "integ_test")]
mod tests {
    use std::time::Duration;
    use tempfile::TempDir;
    use websbot::media::{DownloadKind, DownloadRequest, MediaSource, TempMedia, YtDlp};

    fn ytdlp() -> YtDlp {
        YtDlp::new(
            std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn test_search_finds_a_video() {
        let info = ytdlp()
            .search("rick astley never gonna give you up")
            .await
            .expect("search failed")
            .expect("no result");

        assert!(!info.id.is_empty());
        assert!(info.url.starts_with("https://"));
        println!("Found: {} ({}) {}", info.title, info.duration_label(), info.url);
    }

    #[tokio::test]
    async fn test_audio_download_produces_mp3() {
        let dir = TempDir::new().unwrap();
        let source = ytdlp();
        let info = source.search("me at the zoo").await.unwrap().unwrap();

        let file = TempMedia::reserve(dir.path(), "zoo", "mp3").unwrap();
        let request = DownloadRequest {
            url: info.url.clone(),
            output: file.path().to_path_buf(),
            kind: DownloadKind::Audio,
        };
        source.download(&request).await.expect("download failed");

        assert!(file.size().unwrap() > 0);
        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists(), "temp file should be removed on drop");
    }

    #[tokio::test]
    async fn test_unavailable_video_fails() {
        let dir = TempDir::new().unwrap();
        let request = DownloadRequest {
            url: "https://www.youtube.com/watch?v=00000000000".to_string(),
            output: dir.path().join("missing.mp4"),
            kind: DownloadKind::Video { format: "best".to_string() },
        };
        assert!(ytdlp().download(&request).await.is_err());
    }
}
