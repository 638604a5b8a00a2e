//! `.vv`: re-send the quoted view-once image or video as a normal message.

use tracing::info;

use crate::bot::{BotState, ChatMessage, MediaKind, Messenger, Outgoing};

const CAPTION: &str = "👁 ViewOnce revealed";

pub async fn run(_state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage) -> Result<(), String> {
    let Some(ref media) = msg.quoted_media else {
        messenger
            .reply_text(msg, "❗ Reply to a ViewOnce image/video.")
            .await?;
        return Ok(());
    };

    let data = messenger.download_media(media).await?;
    info!("👁 Revealing {:?} ({} bytes) in {}", media.kind, data.len(), msg.chat_jid);

    let caption = Some(CAPTION.to_string());
    let content = match media.kind {
        MediaKind::Image => Outgoing::Image { data, caption },
        MediaKind::Video => Outgoing::Video { data, caption },
    };
    messenger.reply(msg, content).await?;
    Ok(())
}
