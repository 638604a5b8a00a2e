//! Transport seam: everything command handlers need from the chat client.

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::message::ChatMessage;

/// A message the bot sends.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Text(String),
    /// Sent as a file attachment so the platform doesn't recompress it.
    Document {
        data: Vec<u8>,
        mimetype: String,
        file_name: String,
        caption: Option<String>,
    },
    Image { data: Vec<u8>, caption: Option<String> },
    Video { data: Vec<u8>, caption: Option<String> },
}

impl Outgoing {
    pub fn text(text: impl Into<String>) -> Self {
        Outgoing::Text(text.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Media inside a quoted message. `payload` is only meaningful to the transport that produced it.
#[derive(Clone)]
pub struct QuotedMedia {
    pub kind: MediaKind,
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for QuotedMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotedMedia").field("kind", &self.kind).finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send to `chat_jid`, quoting `quoted` when given. Returns the new message id.
    async fn send(
        &self,
        chat_jid: &str,
        content: Outgoing,
        quoted: Option<&ChatMessage>,
    ) -> Result<String, String>;

    /// Fetch and decrypt quoted media.
    async fn download_media(&self, media: &QuotedMedia) -> Result<Vec<u8>, String>;

    /// Reply in the message's chat, quoting it.
    async fn reply(&self, msg: &ChatMessage, content: Outgoing) -> Result<String, String> {
        self.send(&msg.chat_jid, content, Some(msg)).await
    }

    async fn reply_text(&self, msg: &ChatMessage, text: &str) -> Result<String, String> {
        self.reply(msg, Outgoing::text(text)).await
    }
}
