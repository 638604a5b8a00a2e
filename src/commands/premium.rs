//! `.mystatus`, `.addpremium`, `.delpremium`

use chrono::Utc;
use tracing::info;

use crate::bot::{BotState, ChatMessage, Messenger};
use crate::entitlement::{Standing, jid_from_input};

const ADMIN_ONLY_TEXT: &str = "⛔ Only admins can manage premium.";

pub async fn my_status(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage) -> Result<(), String> {
    let text = match state.entitlements.standing_at(&msg.sender_jid, Utc::now()) {
        Standing::Admin => "👑 You are an admin: unlimited downloads.".to_string(),
        Standing::Premium(entry) => {
            let until = entry
                .expires()
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!("💎 Premium active: unlimited downloads.\n⏳ Expires: {}", until)
        }
        Standing::Free { songs_left, videos_left, limits: (songs, videos) } => format!(
            "📊 Downloads left today:\n🎵 Songs: {}/{}\n🎬 Videos: {}/{}\n\n{}",
            songs_left, songs, videos_left, videos, state.config.upgrade_notice
        ),
    };
    messenger.reply_text(msg, &text).await?;
    Ok(())
}

pub async fn add(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage, args: &str) -> Result<(), String> {
    if !state.entitlements.is_admin(&msg.sender_jid) {
        messenger.reply_text(msg, ADMIN_ONLY_TEXT).await?;
        return Ok(());
    }
    let Some(jid) = jid_from_input(args) else {
        messenger
            .reply_text(msg, "💎 Usage: .addpremium <phone number or JID>")
            .await?;
        return Ok(());
    };

    let entry = state.entitlements.premium().add(&jid, Utc::now())?;
    let until = entry
        .expires()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    info!("💎 {} granted premium to {}", msg.sender_jid, jid);
    messenger
        .reply_text(msg, &format!("💎 Premium added for {}\n⏳ Expires: {}", jid, until))
        .await?;
    Ok(())
}

pub async fn remove(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage, args: &str) -> Result<(), String> {
    if !state.entitlements.is_admin(&msg.sender_jid) {
        messenger.reply_text(msg, ADMIN_ONLY_TEXT).await?;
        return Ok(());
    }
    let Some(jid) = jid_from_input(args) else {
        messenger
            .reply_text(msg, "💎 Usage: .delpremium <phone number or JID>")
            .await?;
        return Ok(());
    };

    let text = if state.entitlements.premium().remove(&jid)? {
        info!("{} revoked premium from {}", msg.sender_jid, jid);
        format!("🗑️ Premium removed for {}", jid)
    } else {
        format!("ℹ️ {} has no premium.", jid)
    };
    messenger.reply_text(msg, &text).await?;
    Ok(())
}
