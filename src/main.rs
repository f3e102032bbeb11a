mod config;
mod cursor;
mod error;
mod media;
mod outbound;
mod poller;
mod render;
mod server;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::ServiceExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::cursor::CursorStore;
use crate::media::MediaStore;
use crate::outbound::Outbound;
use crate::poller::UpdatePoller;
use crate::server::TelegramBridge;
use crate::telegram::{HttpTelegramApi, TelegramApi};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP stream, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tgbridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        info!("Loading configuration from: {}", path.display());
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  API: {}", config.telegram.api_base_url);
    info!(
        "  Default chat: {}",
        config.telegram.default_chat_id.as_deref().unwrap_or("(none)")
    );
    info!("  State directory: {}", config.storage.state_dir.display());

    let api: Arc<dyn TelegramApi> = Arc::new(HttpTelegramApi::new(
        &config.telegram.api_base_url,
        &config.telegram.bot_token,
    ));

    match api.get_me().await {
        Ok(me) => info!(
            "Authenticated as @{}",
            me.username.as_deref().unwrap_or(&me.first_name)
        ),
        Err(e) => warn!("Could not verify bot token: {}", e),
    }

    let poller = UpdatePoller::open(
        api.clone(),
        CursorStore::new(config.storage.cursor_path()),
        MediaStore::new(config.storage.downloads_dir()),
    )
    .await;
    let outbound = Outbound::new(api, config.telegram.default_chat_id.clone());

    info!("Serving MCP over stdio...");
    let service = TelegramBridge::new(outbound, poller)
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server")?;

    service.waiting().await.context("MCP server error")?;

    info!("MCP client disconnected, shutting down");
    Ok(())
}
