//! `.video <query>`: search and send a 480p mp4.

use tracing::info;

use super::{BUSY_TEXT, Fetched, fetch_to_temp, limit_reached_text};
use crate::bot::{BotState, ChatMessage, Messenger, Outgoing};
use crate::entitlement::QuotaKind;
use crate::media::{DownloadKind, VIDEO_480P_FORMAT, safe_file_stem};

pub async fn run(
    state: &BotState,
    messenger: &dyn Messenger,
    msg: &ChatMessage,
    query: &str,
) -> Result<(), String> {
    let Some(_busy) = state.busy.try_acquire(&msg.chat_jid) else {
        messenger.reply_text(msg, BUSY_TEXT).await?;
        return Ok(());
    };

    if query.is_empty() {
        messenger.reply_text(msg, "🎬 Usage: .video song name").await?;
        return Ok(());
    }

    if !state
        .entitlements
        .check_limit_or_premium(&msg.sender_jid, QuotaKind::Video)
        .is_allowed()
    {
        messenger
            .reply_text(msg, &limit_reached_text(state, QuotaKind::Video))
            .await?;
        return Ok(());
    }

    let Some(video) = state.media.search(query).await? else {
        messenger.reply_text(msg, "❌ No video results found.").await?;
        return Ok(());
    };

    let safe_title = safe_file_stem(&video.title, 50, "video");
    let progress = format!(
        "🎬 Downloading video:\n*{}*\n⏱️ Duration: {}\n👀 Views: {}\n\n⏳ Please wait...",
        video.title,
        video.duration_label(),
        video.views_label()
    );
    messenger.reply_text(msg, &progress).await?;

    let kind = DownloadKind::Video { format: VIDEO_480P_FORMAT.to_string() };
    let cap = Some(state.config.max_upload_bytes);
    let file = match fetch_to_temp(state, &video.url, kind, &safe_title, "mp4", cap).await? {
        Fetched::File(file) => file,
        Fetched::Failed => {
            messenger.reply_text(msg, "❌ Video download failed.").await?;
            return Ok(());
        }
        Fetched::TooLarge(_) => {
            messenger
                .reply_text(msg, "⚠️ Video too large for WhatsApp.\nTry a shorter video.")
                .await?;
            return Ok(());
        }
    };

    let data = file.read().await?;
    info!("🎬 Sending \"{}\" ({} bytes) to {}", video.title, data.len(), msg.chat_jid);
    messenger
        .reply(
            msg,
            Outgoing::Document {
                data,
                mimetype: "video/mp4".to_string(),
                file_name: format!("{}.mp4", safe_title),
                caption: Some(format!("🎬 {}", video.title)),
            },
        )
        .await?;
    Ok(())
}
