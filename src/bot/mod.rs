//! Bot core: inbound message model, command routing and the transport seam.

pub mod locks;
pub mod message;
pub mod messenger;
pub mod router;


use std::sync::Arc;

use crate::config::Config;
use crate::entitlement::Entitlements;
use crate::media::{LyricsClient, MediaSource, SpotifyClient, YtDlp};

pub use locks::ChatLocks;
pub use message::{ChatMessage, Command};
pub use messenger::{MediaKind, Messenger, Outgoing, QuotedMedia};
pub use router::handle_message;

/// Shared state every command handler sees.
pub struct BotState {
    pub config: Arc<Config>,
    pub entitlements: Entitlements,
    pub media: Arc<dyn MediaSource>,
    pub lyrics: LyricsClient,
    pub spotify: SpotifyClient,
    /// Chats with a download in flight.
    pub busy: ChatLocks,
}

impl BotState {
    pub fn new(config: Arc<Config>) -> Result<Self, String> {
        let media = Arc::new(YtDlp::new(
            config.ytdlp_path.clone(),
            config.ffmpeg_path.clone(),
            config.download_timeout,
        ));
        Self::with_media(config, media)
    }

    pub fn with_media(config: Arc<Config>, media: Arc<dyn MediaSource>) -> Result<Self, String> {
        Ok(Self {
            entitlements: Entitlements::from_config(&config),
            lyrics: LyricsClient::new(config.lyrics_api_url.clone())?,
            spotify: SpotifyClient::new(config.spotify_api_url.clone())?,
            media,
            busy: ChatLocks::new(),
            config,
        })
    }
}
