//! `.spotify <track url>`

use tracing::{info, warn};

use super::{BUSY_TEXT, limit_reached_text};
use crate::bot::{BotState, ChatMessage, Messenger, Outgoing};
use crate::entitlement::QuotaKind;
use crate::media::safe_file_stem;
use crate::media::spotify::find_track_url;

const EXAMPLE: &str = "Example: .spotify https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC";
const FAILED_TEXT: &str = "Failed to download from Spotify. Make sure the URL is valid and public.";

pub async fn run(
    state: &BotState,
    messenger: &dyn Messenger,
    msg: &ChatMessage,
    args: &str,
) -> Result<(), String> {
    let Some(_busy) = state.busy.try_acquire(&msg.chat_jid) else {
        messenger.reply_text(msg, BUSY_TEXT).await?;
        return Ok(());
    };

    if args.is_empty() {
        messenger
            .reply_text(msg, &format!("Usage: .spotify <Spotify track URL>\n{}", EXAMPLE))
            .await?;
        return Ok(());
    }
    let Some(track_url) = find_track_url(args) else {
        messenger
            .reply_text(msg, &format!("Please provide a valid Spotify track URL.\n{}", EXAMPLE))
            .await?;
        return Ok(());
    };

    if !state
        .entitlements
        .check_limit_or_premium(&msg.sender_jid, QuotaKind::Song)
        .is_allowed()
    {
        messenger
            .reply_text(msg, &limit_reached_text(state, QuotaKind::Song))
            .await?;
        return Ok(());
    }

    messenger.reply_text(msg, "🎵 Downloading from Spotify...").await?;

    let track = match state.spotify.resolve(track_url).await {
        Ok(track) => track,
        Err(e) => {
            warn!("[SPOTIFY] {e}");
            messenger.reply_text(msg, FAILED_TEXT).await?;
            return Ok(());
        }
    };
    let data = match state
        .spotify
        .fetch_audio(&track.audio_url, state.config.max_upload_bytes)
        .await
    {
        Ok(Some(data)) => data,
        Ok(None) => {
            messenger.reply_text(msg, "⚠️ Track too large for WhatsApp.").await?;
            return Ok(());
        }
        Err(e) => {
            warn!("[SPOTIFY] {e}");
            messenger.reply_text(msg, FAILED_TEXT).await?;
            return Ok(());
        }
    };

    info!("🎵 Sending Spotify track \"{}\" ({} bytes)", track.title, data.len());
    messenger
        .reply(
            msg,
            Outgoing::Document {
                data,
                mimetype: "audio/mpeg".to_string(),
                file_name: format!("{}.mp3", safe_file_stem(&track.title, 100, "spotify")),
                caption: Some(format!("🎵 {}\n👤 {}", track.title, track.artist)),
            },
        )
        .await?;
    Ok(())
}
