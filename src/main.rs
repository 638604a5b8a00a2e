use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::prelude::*;

use websbot::bot::BotState;
use websbot::chat_log::ChatLogLayer;
use websbot::config::Config;
use websbot::whatsapp;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "websbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    for dir in [&config.data_dir, &config.tmp_dir, &config.log_dir()] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create {:?}: {e}", dir);
            std::process::exit(1);
        }
    }

    // Setup logging
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_dir().join("websbot.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    let log_sink = if let Some(ref chat_jid) = config.log_chat_jid {
        let (layer, sink) = ChatLogLayer::new(chat_jid.clone());
        registry.with(layer).init();
        Some(sink)
    } else {
        registry.init();
        None
    };

    info!("🚀 Starting {}...", config.bot_name);
    info!("Loaded config from {config_path}");
    info!("Admins: {:?}", config.admin_jids);
    info!(
        "Daily limits: {} songs, {} videos; premium lasts {} days",
        config.daily_song_limit, config.daily_video_limit, config.premium_days
    );

    let state = match BotState::new(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = whatsapp::run(state, log_sink).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
