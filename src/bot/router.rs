//! Command dispatch.

use tracing::{error, info, warn};

use super::message::{ChatMessage, Command};
use super::messenger::Messenger;
use super::BotState;
use crate::commands;

pub const INTERNAL_ERROR_TEXT: &str = "❌ An internal error occurred.";

/// Route one inbound message. Non-command text is ignored.
pub async fn handle_message(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage) {
    let Some((command, args)) = Command::parse(&msg.text) else {
        return;
    };

    let args_preview: String = args.chars().take(80).collect();
    let place = if msg.is_group() { "group" } else { "DM" };
    info!(
        "📨 .{} from {} ({}) in {} {}: \"{}\"",
        command.name(),
        msg.push_name,
        msg.sender_jid,
        place,
        msg.chat_jid,
        args_preview
    );

    let result = match command {
        Command::Ping => commands::info::ping(state, messenger, msg).await,
        Command::Menu => commands::info::menu(state, messenger, msg).await,
        Command::Alive => commands::info::alive(state, messenger, msg).await,
        Command::Developer => commands::info::developer(state, messenger, msg).await,
        Command::Play => commands::play::run(state, messenger, msg, args).await,
        Command::Video => commands::video::run(state, messenger, msg, args).await,
        Command::Short => commands::short::run(state, messenger, msg, args).await,
        Command::Spotify => commands::spotify::run(state, messenger, msg, args).await,
        Command::Lyrics => commands::lyrics::run(state, messenger, msg, args).await,
        Command::ViewOnce => commands::view_once::run(state, messenger, msg).await,
        Command::MyStatus => commands::premium::my_status(state, messenger, msg).await,
        Command::AddPremium => commands::premium::add(state, messenger, msg, args).await,
        Command::DelPremium => commands::premium::remove(state, messenger, msg, args).await,
    };

    if let Err(e) = result {
        error!("COMMAND ERROR (.{}): {}", command.name(), e);
        if let Err(e) = messenger.reply_text(msg, INTERNAL_ERROR_TEXT).await {
            warn!("Failed to report error: {e}");
        }
    }
}
