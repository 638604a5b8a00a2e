//! WhatsApp session via `whatsapp-rust`.
//!
//! Pairs by QR code, keeps credentials in `<data_dir>/session.db`, converts
//! inbound messages to [`ChatMessage`] and implements [`Messenger`] for replies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use async_trait::async_trait;
use qrcode::QrCode;
use qrcode::render::{svg, unicode};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};
use wacore::types::events::Event;
use wacore::types::message::MessageInfo;
use wacore_binary::jid::Jid;
use waproto::whatsapp as wa;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

use crate::bot::{BotState, ChatMessage, MediaKind, Messenger, Outgoing, QuotedMedia, handle_message};
use crate::chat_log::ChatLogSink;

const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Why a session run ended.
enum SessionEnd {
    LoggedOut,
    Dropped(String),
}

/// `Messenger` over the currently connected client.
#[derive(Clone, Default)]
pub struct WhatsAppMessenger {
    client: Arc<RwLock<Option<Arc<Client>>>>,
}

impl WhatsAppMessenger {
    async fn client(&self) -> Result<Arc<Client>, String> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| "WhatsApp client not connected".to_string())
    }

    async fn set_client(&self, client: Option<Arc<Client>>) {
        *self.client.write().await = client;
    }
}

#[async_trait]
impl Messenger for WhatsAppMessenger {
    async fn send(
        &self,
        chat_jid: &str,
        content: Outgoing,
        quoted: Option<&ChatMessage>,
    ) -> Result<String, String> {
        let client = self.client().await?;
        let jid: Jid = chat_jid
            .parse()
            .map_err(|e| format!("Invalid JID '{chat_jid}': {e:?}"))?;
        let context = quoted.map(quote_context);

        let message = match content {
            Outgoing::Text(text) => match context {
                Some(context_info) => wa::Message {
                    extended_text_message: Some(Box::new(wa::message::ExtendedTextMessage {
                        text: Some(text),
                        context_info: Some(context_info),
                        ..Default::default()
                    })),
                    ..Default::default()
                },
                None => wa::Message {
                    conversation: Some(text),
                    ..Default::default()
                },
            },
            Outgoing::Document { data, mimetype, file_name, caption } => {
                let upload = client
                    .upload(data, MediaType::Document)
                    .await
                    .map_err(|e| format!("Document upload failed: {e}"))?;
                wa::Message {
                    document_message: Some(Box::new(wa::message::DocumentMessage {
                        mimetype: Some(mimetype),
                        title: Some(file_name.clone()),
                        file_name: Some(file_name),
                        caption,
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        context_info: context,
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
            Outgoing::Image { data, caption } => {
                let upload = client
                    .upload(data, MediaType::Image)
                    .await
                    .map_err(|e| format!("Image upload failed: {e}"))?;
                wa::Message {
                    image_message: Some(Box::new(wa::message::ImageMessage {
                        mimetype: Some("image/jpeg".to_string()),
                        caption,
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        context_info: context,
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
            Outgoing::Video { data, caption } => {
                let upload = client
                    .upload(data, MediaType::Video)
                    .await
                    .map_err(|e| format!("Video upload failed: {e}"))?;
                wa::Message {
                    video_message: Some(Box::new(wa::message::VideoMessage {
                        mimetype: Some("video/mp4".to_string()),
                        caption,
                        url: Some(upload.url),
                        direct_path: Some(upload.direct_path),
                        media_key: Some(upload.media_key),
                        file_enc_sha256: Some(upload.file_enc_sha256),
                        file_sha256: Some(upload.file_sha256),
                        file_length: Some(upload.file_length),
                        context_info: context,
                        ..Default::default()
                    })),
                    ..Default::default()
                }
            }
        };

        client
            .send_message(jid, message)
            .await
            .map_err(|e| format!("Failed to send to {chat_jid}: {e}"))
    }

    async fn download_media(&self, media: &QuotedMedia) -> Result<Vec<u8>, String> {
        let client = self.client().await?;
        let result = match media.kind {
            MediaKind::Image => {
                let image = media
                    .payload
                    .downcast_ref::<wa::message::ImageMessage>()
                    .ok_or("Quoted media is not an image")?;
                client.download(image).await
            }
            MediaKind::Video => {
                let video = media
                    .payload
                    .downcast_ref::<wa::message::VideoMessage>()
                    .ok_or("Quoted media is not a video")?;
                client.download(video).await
            }
        };
        result.map_err(|e| format!("Media download failed: {e}"))
    }
}

/// Reply metadata pointing at `msg`.
fn quote_context(msg: &ChatMessage) -> Box<wa::ContextInfo> {
    Box::new(wa::ContextInfo {
        stanza_id: Some(msg.message_id.clone()),
        participant: Some(msg.sender_jid.clone()),
        quoted_message: Some(Box::new(wa::Message {
            conversation: Some(msg.text.clone()),
            ..Default::default()
        })),
        ..Default::default()
    })
}

/// Strip `ephemeral` / `device_sent` wrappers.
fn unwrap_message(msg: &wa::Message) -> &wa::Message {
    msg.device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| msg.ephemeral_message.as_ref().and_then(|e| e.message.as_deref()))
        .unwrap_or(msg)
}

/// Conversation, extended text, image caption, video caption.
pub fn message_text(msg: &wa::Message) -> String {
    let msg = unwrap_message(msg);
    msg.conversation
        .as_deref()
        .or_else(|| msg.extended_text_message.as_ref().and_then(|e| e.text.as_deref()))
        .or_else(|| msg.image_message.as_ref().and_then(|i| i.caption.as_deref()))
        .or_else(|| msg.video_message.as_ref().and_then(|v| v.caption.as_deref()))
        .unwrap_or("")
        .to_string()
}

/// Image or video in the message `msg` replies to, looking through view-once wrappers.
pub fn quoted_media(msg: &wa::Message) -> Option<QuotedMedia> {
    let quoted = unwrap_message(msg)
        .extended_text_message
        .as_ref()?
        .context_info
        .as_ref()?
        .quoted_message
        .as_deref()?;

    let inner = quoted
        .view_once_message
        .as_ref()
        .and_then(|v| v.message.as_deref())
        .or_else(|| quoted.view_once_message_v2.as_ref().and_then(|v| v.message.as_deref()))
        .unwrap_or(quoted);

    if let Some(image) = &inner.image_message {
        return Some(QuotedMedia {
            kind: MediaKind::Image,
            payload: Arc::new(image.as_ref().clone()),
        });
    }
    inner.video_message.as_ref().map(|video| QuotedMedia {
        kind: MediaKind::Video,
        payload: Arc::new(video.as_ref().clone()),
    })
}

fn to_chat_message(msg: &wa::Message, info: &MessageInfo) -> Option<ChatMessage> {
    if info.source.is_from_me {
        return None;
    }
    let text = message_text(msg);
    if text.trim().is_empty() {
        return None;
    }
    Some(ChatMessage {
        message_id: info.id.clone(),
        chat_jid: info.source.chat.to_string(),
        sender_jid: info.source.sender.to_string(),
        push_name: info.push_name.clone(),
        timestamp: info.timestamp,
        text,
        quoted_media: quoted_media(msg),
    })
}

/// Print the pairing QR to the terminal and save it as SVG.
fn show_qr(code: &str, path: &std::path::Path) {
    let qr = match QrCode::new(code.as_bytes()) {
        Ok(qr) => qr,
        Err(e) => {
            warn!("Failed to encode pairing QR: {e}");
            return;
        }
    };
    let terminal = qr
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();
    println!("\n{terminal}\n");

    let image = qr.render::<svg::Color>().min_dimensions(300, 300).build();
    match std::fs::write(path, image) {
        Ok(()) => info!("📱 Scan the QR code to pair (also saved to {:?})", path),
        Err(e) => warn!("Failed to save QR to {:?}: {e}", path),
    }
}

/// Connect and serve until logged out. Dropped connections are retried with backoff.
pub async fn run(state: Arc<BotState>, log_sink: Option<ChatLogSink>) -> anyhow::Result<()> {
    let messenger = WhatsAppMessenger::default();
    let log_sink = Arc::new(StdMutex::new(log_sink));
    let mut delay: Option<Duration> = None;

    loop {
        let connected = Arc::new(AtomicBool::new(false));
        let outcome = run_once(&state, &messenger, &log_sink, &connected).await;
        let wait = reconnect_delay(delay, connected.load(Ordering::Relaxed));
        delay = Some(wait);

        match outcome {
            Ok(SessionEnd::LoggedOut) => {
                error!(
                    "🚪 Logged out. Delete {:?} and restart to pair again.",
                    state.config.session_db_path()
                );
                return Err(anyhow!("WhatsApp session logged out"));
            }
            Ok(SessionEnd::Dropped(reason)) => {
                warn!("🔌 Connection closed ({reason}), reconnecting in {}s", wait.as_secs());
            }
            Err(e) => {
                warn!("🔌 Session failed: {e:#}, retrying in {}s", wait.as_secs());
            }
        }
        messenger.set_client(None).await;
        tokio::time::sleep(wait).await;
    }
}

/// Wait before the next attempt: doubles from 2s up to 60s while attempts keep
/// failing, back to 2s after a session that reached `Connected`.
fn reconnect_delay(previous: Option<Duration>, connected: bool) -> Duration {
    match previous {
        Some(prev) if !connected => (prev * 2).min(MAX_BACKOFF),
        _ => INITIAL_BACKOFF,
    }
}

async fn run_once(
    state: &Arc<BotState>,
    messenger: &WhatsAppMessenger,
    log_sink: &Arc<StdMutex<Option<ChatLogSink>>>,
    connected: &Arc<AtomicBool>,
) -> anyhow::Result<SessionEnd> {
    let db_path = state.config.session_db_path();
    let backend = Arc::new(
        SqliteStore::new(&db_path.to_string_lossy())
            .await
            .with_context(|| format!("Failed to open session store {:?}", db_path))?,
    );

    let (end_tx, mut end_rx) = mpsc::unbounded_channel::<SessionEnd>();
    let qr_path = state.config.qr_path();
    let event_state = state.clone();
    let event_messenger = messenger.clone();
    let event_sink = log_sink.clone();
    let event_connected = connected.clone();

    let mut bot = Bot::builder()
        .with_backend(backend)
        .with_transport_factory(TokioWebSocketTransportFactory::new())
        .with_http_client(UreqHttpClient::new())
        .on_event(move |event, client| {
            let state = event_state.clone();
            let messenger = event_messenger.clone();
            let sink = event_sink.clone();
            let end_tx = end_tx.clone();
            let qr_path = qr_path.clone();
            let connected = event_connected.clone();
            async move {
                match event {
                    Event::PairingQrCode { code, .. } => show_qr(&code, &qr_path),
                    Event::PairSuccess(_) => info!("🔗 Pairing successful"),
                    Event::Connected(_) => {
                        connected.store(true, Ordering::Relaxed);
                        messenger.set_client(Some(client)).await;
                        info!("✅ Connected to WhatsApp as {}", state.config.bot_name);
                        let pending = sink.lock().ok().and_then(|mut s| s.take());
                        if let Some(pending) = pending {
                            pending.attach(Arc::new(messenger.clone()));
                        }
                    }
                    Event::LoggedOut(_) => {
                        messenger.set_client(None).await;
                        let _ = end_tx.send(SessionEnd::LoggedOut);
                    }
                    Event::Disconnected(_) => {
                        debug!("Disconnected, client library will retry");
                    }
                    Event::Message(msg, info) => {
                        let Some(chat_msg) = to_chat_message(&msg, &info) else {
                            return;
                        };
                        tokio::spawn(async move {
                            handle_message(&state, &messenger, &chat_msg).await;
                        });
                    }
                    _ => {}
                }
            }
        })
        .build()
        .await
        .context("Failed to build WhatsApp client")?;

    let mut handle = bot.run().await.context("Failed to start WhatsApp client")?;
    info!("🚀 WhatsApp session started (store: {:?})", db_path);

    tokio::select! {
        end = end_rx.recv() => {
            handle.abort();
            Ok(end.unwrap_or(SessionEnd::Dropped("event channel closed".to_string())))
        }
        result = &mut handle => {
            let reason = match result {
                Ok(()) => "client stopped".to_string(),
                Err(e) => format!("client task failed: {e}"),
            };
            Ok(SessionEnd::Dropped(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(text: &str) -> wa::Message {
        wa::Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_precedence() {
        let mut msg = text_message(".ping");
        msg.image_message = Some(Box::new(wa::message::ImageMessage {
            caption: Some("caption".to_string()),
            ..Default::default()
        }));
        assert_eq!(message_text(&msg), ".ping");

        msg.conversation = None;
        assert_eq!(message_text(&msg), "caption");

        let video = wa::Message {
            video_message: Some(Box::new(wa::message::VideoMessage {
                caption: Some(".vv".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        };
        assert_eq!(message_text(&video), ".vv");
        assert_eq!(message_text(&wa::Message::default()), "");
    }

    #[test]
    fn test_extended_text() {
        let msg = wa::Message {
            extended_text_message: Some(Box::new(wa::message::ExtendedTextMessage {
                text: Some(".menu".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        };
        assert_eq!(message_text(&msg), ".menu");
        assert!(quoted_media(&msg).is_none());
    }

    #[test]
    fn test_quoted_view_once_image() {
        let view_once = wa::Message {
            view_once_message: Some(Box::new(wa::message::FutureProofMessage {
                message: Some(Box::new(wa::Message {
                    image_message: Some(Box::new(wa::message::ImageMessage {
                        direct_path: Some("/v/t62/abc".to_string()),
                        ..Default::default()
                    })),
                    ..Default::default()
                })),
                ..Default::default()
            })),
            ..Default::default()
        };
        let reply = wa::Message {
            extended_text_message: Some(Box::new(wa::message::ExtendedTextMessage {
                text: Some(".vv".to_string()),
                context_info: Some(Box::new(wa::ContextInfo {
                    quoted_message: Some(Box::new(view_once)),
                    ..Default::default()
                })),
                ..Default::default()
            })),
            ..Default::default()
        };

        let media = quoted_media(&reply).unwrap();
        assert_eq!(media.kind, MediaKind::Image);
        let image = media.payload.downcast_ref::<wa::message::ImageMessage>().unwrap();
        assert_eq!(image.direct_path.as_deref(), Some("/v/t62/abc"));
    }

    #[test]
    fn test_reconnect_delay_doubles_until_cap() {
        let mut delay = None;
        let mut seen = Vec::new();
        for _ in 0..7 {
            let wait = reconnect_delay(delay, false);
            seen.push(wait.as_secs());
            delay = Some(wait);
        }
        assert_eq!(seen, vec![2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_reconnect_delay_resets_after_connected_session() {
        assert_eq!(reconnect_delay(Some(MAX_BACKOFF), true), INITIAL_BACKOFF);
        assert_eq!(reconnect_delay(Some(Duration::from_secs(8)), true), INITIAL_BACKOFF);
        assert_eq!(reconnect_delay(Some(INITIAL_BACKOFF), false), Duration::from_secs(4));
    }

    #[test]
    fn test_quote_context_points_at_message() {
        let msg = ChatMessage {
            message_id: "ABC".to_string(),
            chat_jid: "1@g.us".to_string(),
            sender_jid: "2@s.whatsapp.net".to_string(),
            push_name: String::new(),
            timestamp: chrono::Utc::now(),
            text: ".play x".to_string(),
            quoted_media: None,
        };
        let context = quote_context(&msg);
        assert_eq!(context.stanza_id.as_deref(), Some("ABC"));
        assert_eq!(context.participant.as_deref(), Some("2@s.whatsapp.net"));
    }
}
