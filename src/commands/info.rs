//! Static replies: `.ping`, `.menu`, `.alive`, `.developer`.

use crate::bot::{BotState, ChatMessage, Command, Messenger};

pub async fn ping(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage) -> Result<(), String> {
    let text = format!(
        "╭─「 *{} STATUS* 」\n│⚡ Speed: Fast\n│🟢 Status: Online\n╰─────────────",
        state.config.bot_name.to_uppercase()
    );
    messenger.reply_text(msg, &text).await?;
    Ok(())
}

pub async fn menu(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage) -> Result<(), String> {
    let text = menu_text(&state.config.bot_name, state.entitlements.is_admin(&msg.sender_jid));
    messenger.reply_text(msg, &text).await?;
    Ok(())
}

pub async fn alive(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage) -> Result<(), String> {
    let text = format!("✅ {} is alive and running!", state.config.bot_name);
    messenger.reply_text(msg, &text).await?;
    Ok(())
}

pub async fn developer(state: &BotState, messenger: &dyn Messenger, msg: &ChatMessage) -> Result<(), String> {
    messenger.reply_text(msg, &state.config.developer).await?;
    Ok(())
}

pub fn menu_text(bot_name: &str, include_admin: bool) -> String {
    let mut text = format!("┏━━〔 🤖 *{} Menu* 〕━━┓\n", bot_name);
    for (icon, name) in Command::menu_entries(include_admin) {
        text.push_str(&format!("┃ {} .{}\n", icon, name));
    }
    text.push_str("┗━━━━━━━━━━━━━━━━━━━━━━┛");
    text
}
