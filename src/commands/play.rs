//! `.play <query>`: search a song and send it back as an mp3 document.

use tracing::info;

use super::{BUSY_TEXT, Fetched, fetch_to_temp, limit_reached_text};
use crate::bot::{BotState, ChatMessage, Messenger, Outgoing};
use crate::entitlement::QuotaKind;
use crate::media::{DownloadKind, safe_file_stem};

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
        messenger.reply_text(msg, "🎵 Usage: .play song name").await?;
        return Ok(());
    }

    let decision = state
        .entitlements
        .check_limit_or_premium(&msg.sender_jid, QuotaKind::Song);
    if !decision.is_allowed() {
        messenger
            .reply_text(msg, &limit_reached_text(state, QuotaKind::Song))
            .await?;
        return Ok(());
    }

    let Some(video) = state.media.search(query).await? else {
        messenger.reply_text(msg, "❌ No results found.").await?;
        return Ok(());
    };

    let progress = format!(
        "⏳ Downloading: *{}*\n⏱️ Duration: {}\n👀 Views: {}",
        video.title,
        video.duration_label(),
        video.views_label()
    );
    messenger.reply_text(msg, &progress).await?;

    let file = match fetch_to_temp(state, &video.url, DownloadKind::Audio, "song", "mp3", None).await? {
        Fetched::File(file) => file,
        Fetched::Failed | Fetched::TooLarge(_) => {
            messenger
                .reply_text(msg, "❌ Download failed. Try again later.")
                .await?;
            return Ok(());
        }
    };

    let data = file.read().await?;
    info!("🎵 Sending \"{}\" ({} bytes) to {}", video.title, data.len(), msg.chat_jid);
    messenger
        .reply(
            msg,
            Outgoing::Document {
                data,
                mimetype: "audio/mpeg".to_string(),
                file_name: format!("{}.mp3", safe_file_stem(&video.title, 100, "audio")),
                caption: None,
            },
        )
        .await?;
    Ok(())
}
