//! Inbound messages and command parsing.

use chrono::{DateTime, Utc};

use super::messenger::QuotedMedia;

/// Commands start with this character.
pub const PREFIX: char = '.';

/// A transport-neutral inbound message.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub message_id: String,
    /// Group JID (`...@g.us`) or the peer's JID for direct chats.
    pub chat_jid: String,
    /// Participant in groups, otherwise same as `chat_jid`.
    pub sender_jid: String,
    pub push_name: String,
    pub timestamp: DateTime<Utc>,
    /// Conversation text or media caption; empty if none.
    pub text: String,
    /// Image/video in the message this one replies to.
    pub quoted_media: Option<QuotedMedia>,
}

impl ChatMessage {
    pub fn is_group(&self) -> bool {
        self.chat_jid.ends_with("@g.us")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Menu,
    Alive,
    Developer,
    Play,
    Video,
    Short,
    Spotify,
    Lyrics,
    ViewOnce,
    MyStatus,
    AddPremium,
    DelPremium,
}

/// `(command, name, menu icon, admin only)`, in menu order.
const COMMANDS: &[(Command, &str, &str, bool)] = &[
    (Command::Ping, "ping", "⚙️", false),
    (Command::Menu, "menu", "📜", false),
    (Command::Alive, "alive", "✅", false),
    (Command::Play, "play", "▶️", false),
    (Command::Spotify, "spotify", "🎧", false),
    (Command::Lyrics, "lyrics", "🎵", false),
    (Command::Video, "video", "🎥", false),
    (Command::Short, "short", "📱", false),
    (Command::ViewOnce, "vv", "👁", false),
    (Command::MyStatus, "mystatus", "💎", false),
    (Command::Developer, "developer", "👤", false),
    (Command::AddPremium, "addpremium", "➕", true),
    (Command::DelPremium, "delpremium", "➖", true),
];

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        COMMANDS
            .iter()
            .find(|(_, n, _, _)| *n == name)
            .map(|(c, _, _, _)| *c)
    }

    pub fn name(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|(c, _, _, _)| *c == self)
            .map(|(_, n, _, _)| *n)
            .unwrap_or("?")
    }

    /// Split `.play  some song` into `(Play, "some song")`.
    ///
    /// Only an exact command word matches: `.playlist` is not `.play`.
    pub fn parse(text: &str) -> Option<(Command, &str)> {
        let text = text.trim_start();
        let rest = text.strip_prefix(PREFIX)?;
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let command = Command::from_name(&rest[..word_end])?;
        Some((command, rest[word_end..].trim()))
    }

    /// `(icon, name)` for the menu.
    pub fn menu_entries(include_admin: bool) -> impl Iterator<Item = (&'static str, &'static str)> {
        COMMANDS
            .iter()
            .filter(move |(_, _, _, admin)| include_admin || !*admin)
            .map(|(_, name, icon, _)| (*icon, *name))
    }
}
