//! Forward the bot's own log lines to a WhatsApp chat.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::bot::{Messenger, Outgoing};

const FLUSH_EVERY: Duration = Duration::from_secs(5);
const MAX_BUFFERED_LINES: usize = 50;
const MAX_MESSAGE_CHARS: usize = 4000;
/// Lines held before the session connects (or while sends lag); newer ones are dropped.
const MAX_BACKLOG: usize = 1000;

/// Log message with priority.
#[derive(Debug, PartialEq)]
enum LogMessage {
    /// WARN/ERROR - send immediately
    Urgent(String),
    /// INFO - batch and send periodically
    Info(String),
}

/// Only events from this crate are forwarded, never the client library's.
pub struct ChatLogLayer {
    tx: mpsc::Sender<LogMessage>,
}

/// Receiving end, held until the session is connected. Lines queue up meanwhile.
pub struct ChatLogSink {
    rx: mpsc::Receiver<LogMessage>,
    chat_jid: String,
}

impl ChatLogLayer {
    pub fn new(chat_jid: String) -> (Self, ChatLogSink) {
        Self::with_backlog(chat_jid, MAX_BACKLOG)
    }

    fn with_backlog(chat_jid: String, backlog: usize) -> (Self, ChatLogSink) {
        let (tx, rx) = mpsc::channel(backlog);
        (Self { tx }, ChatLogSink { rx, chat_jid })
    }
}

impl ChatLogSink {
    /// Start forwarding through `messenger`.
    pub fn attach(self, messenger: Arc<dyn Messenger>) {
        tokio::spawn(forward(self.rx, messenger, self.chat_jid));
    }
}

async fn forward(
    mut rx: mpsc::Receiver<LogMessage>,
    messenger: Arc<dyn Messenger>,
    chat_jid: String,
) {
    let mut info_buffer: Vec<String> = Vec::new();
    let mut interval = tokio::time::interval(FLUSH_EVERY);

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(LogMessage::Urgent(text)) => {
                        send_log(messenger.as_ref(), &chat_jid, &text).await;
                    }
                    Some(LogMessage::Info(text)) => {
                        info_buffer.push(text);
                        if info_buffer.len() >= MAX_BUFFERED_LINES {
                            flush_buffer(messenger.as_ref(), &chat_jid, &mut info_buffer).await;
                        }
                    }
                    None => {
                        flush_buffer(messenger.as_ref(), &chat_jid, &mut info_buffer).await;
                        break;
                    }
                }
            }
            _ = interval.tick() => {
                flush_buffer(messenger.as_ref(), &chat_jid, &mut info_buffer).await;
            }
        }
    }
}

async fn send_log(messenger: &dyn Messenger, chat_jid: &str, text: &str) {
    let text = if text.chars().count() > MAX_MESSAGE_CHARS {
        let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    };
    // eprintln, not tracing: a failed send must not feed back into this layer
    if let Err(e) = messenger.send(chat_jid, Outgoing::Text(text), None).await {
        eprintln!("Failed to send log to WhatsApp: {e}");
    }
}

async fn flush_buffer(messenger: &dyn Messenger, chat_jid: &str, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(messenger, chat_jid, &combined).await;
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for ChatLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();
        if level > Level::INFO || !metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let msg = match level {
            Level::ERROR => LogMessage::Urgent(format!("❌ {}", visitor.message)),
            Level::WARN => LogMessage::Urgent(format!("⚠️ {}", visitor.message)),
            _ => LogMessage::Info(visitor.message),
        };

        match self.tx.try_send(msg) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("Log channel closed, message dropped");
            }
        }
    }
}
