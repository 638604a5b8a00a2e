//! One in-flight download per chat.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone, Default)]
pub struct ChatLocks {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Held while a chat's download runs; releases the chat on drop.
pub struct ChatGuard {
    active: Arc<Mutex<HashSet<String>>>,
    chat_jid: String,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if the chat is already busy.
    pub fn try_acquire(&self, chat_jid: &str) -> Option<ChatGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(chat_jid.to_string()) {
            debug!("Chat {} busy", chat_jid);
            return None;
        }
        Some(ChatGuard {
            active: self.active.clone(),
            chat_jid: chat_jid.to_string(),
        })
    }

    pub fn is_busy(&self, chat_jid: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(chat_jid)
    }
}

impl Drop for ChatGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.chat_jid);
    }
}
