//! `.lyrics <query>`

use tracing::warn;

use crate::bot::{BotState, ChatMessage, Messenger};
use crate::media::lyrics::{MAX_LYRICS_CHARS, split_artist_title, truncate_lyrics};

const FAILED_TEXT: &str = "❌ Failed to fetch lyrics. Try another song.";

pub async fn run(
    state: &BotState,
    messenger: &dyn Messenger,
    msg: &ChatMessage,
    query: &str,
) -> Result<(), String> {
    if query.is_empty() {
        messenger.reply_text(msg, "📄 Usage: .lyrics song name").await?;
        return Ok(());
    }

    // The search result gives a cleaner artist/title than the raw query.
    let video = match state.media.search(query).await {
        Ok(Some(video)) => video,
        Ok(None) => {
            messenger.reply_text(msg, "❌ Song not found.").await?;
            return Ok(());
        }
        Err(e) => {
            warn!("LYRICS search failed: {e}");
            messenger.reply_text(msg, FAILED_TEXT).await?;
            return Ok(());
        }
    };

    let (artist, song) = split_artist_title(&video.title, video.author.as_deref());
    messenger
        .reply_text(msg, &format!("📄 Fetching lyrics for:\n*{}* — {}", song, artist))
        .await?;

    match state.lyrics.fetch(&artist, &song).await {
        Ok(Some(lyrics)) => {
            let text = format!(
                "📄 *Lyrics for: {} - {}*\n\n{}\n\n🎤 Powered by lyrics.ovh",
                song,
                artist,
                truncate_lyrics(&lyrics, MAX_LYRICS_CHARS)
            );
            messenger.reply_text(msg, &text).await?;
        }
        Ok(None) => {
            messenger.reply_text(msg, "❌ Lyrics not found.").await?;
        }
        Err(e) => {
            warn!("LYRICS ERROR: {e}");
            messenger.reply_text(msg, FAILED_TEXT).await?;
        }
    }
    Ok(())
}
