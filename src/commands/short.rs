//! `.short <url>`: TikTok / Instagram / Facebook / YouTube Shorts downloads.

use tracing::info;

use super::{BUSY_TEXT, Fetched, fetch_to_temp};
use crate::bot::{BotState, ChatMessage, Messenger, Outgoing};
use crate::media::{DownloadKind, Platform, is_http_url};

const USAGE: &str = "📱 Usage:\n.short <tiktok / instagram / facebook / yt shorts link>";

pub async fn run(
    state: &BotState,
    messenger: &dyn Messenger,
    msg: &ChatMessage,
    url: &str,
) -> Result<(), String> {
    let Some(_busy) = state.busy.try_acquire(&msg.chat_jid) else {
        messenger.reply_text(msg, BUSY_TEXT).await?;
        return Ok(());
    };

    if url.is_empty() || !is_http_url(url) {
        messenger.reply_text(msg, USAGE).await?;
        return Ok(());
    }

    let platform = Platform::detect(url);
    let label = platform.name().to_uppercase();
    messenger
        .reply_text(msg, &format!("📥 Downloading {} short...\n⏳ Please wait", label))
        .await?;

    let kind = DownloadKind::Video { format: platform.format().to_string() };
    let cap = Some(state.config.max_upload_bytes);
    let file = match fetch_to_temp(state, url, kind, platform.name(), "mp4", cap).await? {
        Fetched::File(file) => file,
        Fetched::Failed => {
            messenger
                .reply_text(msg, &format!("❌ Failed to download {} short.", platform.name()))
                .await?;
            return Ok(());
        }
        Fetched::TooLarge(_) => {
            messenger.reply_text(msg, "⚠️ Video too large for WhatsApp.").await?;
            return Ok(());
        }
    };

    let data = file.read().await?;
    info!("📱 Sending {} short ({} bytes) to {}", platform.name(), data.len(), msg.chat_jid);
    let file_name = format!("{}_{}.mp4", platform.name(), chrono::Utc::now().timestamp_millis());
    messenger
        .reply(
            msg,
            Outgoing::Document {
                data,
                mimetype: "video/mp4".to_string(),
                file_name,
                caption: Some(format!("📱 {} short", label)),
            },
        )
        .await?;
    Ok(())
}
