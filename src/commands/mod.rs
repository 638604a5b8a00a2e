//! Command handlers. Each replies to the triggering message; an `Err` is
//! reported by the router as a generic internal error.

pub mod info;
pub mod lyrics;
pub mod play;
pub mod premium;
pub mod short;
pub mod spotify;
pub mod video;
pub mod view_once;

use tracing::warn;

use crate::bot::BotState;
use crate::entitlement::QuotaKind;
use crate::media::{DownloadKind, DownloadRequest, TempMedia};

pub const BUSY_TEXT: &str = "⏳ Please wait, a download is already running in this chat…";

pub fn limit_reached_text(state: &BotState, kind: QuotaKind) -> String {
    let limit = state.entitlements.limits().for_kind(kind);
    format!(
        "🚫 Daily {} download limit reached ({}/day).\n\n{}",
        kind.label(),
        limit,
        state.config.upgrade_notice
    )
}

/// Result of downloading into the temp dir.
pub enum Fetched {
    File(TempMedia),
    /// yt-dlp failed or produced nothing; details are already logged.
    Failed,
    /// Over the upload cap; the file has been removed.
    TooLarge(u64),
}

/// Run one download into `<tmp_dir>`, enforcing `size_cap` when given.
pub async fn fetch_to_temp(
    state: &BotState,
    url: &str,
    kind: DownloadKind,
    stem: &str,
    ext: &str,
    size_cap: Option<u64>,
) -> Result<Fetched, String> {
    let file = TempMedia::reserve(&state.config.tmp_dir, stem, ext)?;
    let request = DownloadRequest {
        url: url.to_string(),
        output: file.path().to_path_buf(),
        kind,
    };

    if let Err(e) = state.media.download(&request).await {
        warn!("Download of {} failed: {e}", url);
        return Ok(Fetched::Failed);
    }

    if let Some(cap) = size_cap {
        let size = file.size()?;
        if size > cap {
            warn!("Download of {} is {} bytes, over the {} byte cap", url, size, cap);
            return Ok(Fetched::TooLarge(size));
        }
    }
    Ok(Fetched::File(file))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::media::{VIDEO_480P_FORMAT, YtDlp};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Stand-in for yt-dlp that leaves split-stream leftovers, then fails.
    fn failing_ytdlp(dir: &Path) -> String {
        let script = dir.join("yt-dlp");
        std::fs::write(
            &script,
            r#"#!/bin/sh
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
base="${out%.mp4}"
echo video > "$base.f137.mp4"
echo audio > "$base.f140.m4a.part"
echo "ERROR: unable to download video data: HTTP Error 403: Forbidden" >&2
exit 1
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_failed_split_stream_download_leaves_nothing() {
        let root = TempDir::new().unwrap();
        let bin_dir = TempDir::new().unwrap();
        let config = Arc::new(Config::for_tests(root.path()));
        let ytdlp = YtDlp::new(failing_ytdlp(bin_dir.path()), "ffmpeg".into(), Duration::from_secs(10));
        let state = BotState::with_media(config.clone(), Arc::new(ytdlp)).unwrap();

        let kind = DownloadKind::Video { format: VIDEO_480P_FORMAT.to_string() };
        let fetched = fetch_to_temp(&state, "https://youtu.be/abc", kind, "clip", "mp4", Some(1024))
            .await
            .unwrap();

        assert!(matches!(fetched, Fetched::Failed));
        let left: Vec<_> = std::fs::read_dir(&config.tmp_dir).unwrap().collect();
        assert!(left.is_empty(), "tmp not empty: {left:?}");
    }
}
