mod bot;
mod command;
mod config;
mod frame_api;
mod paths;
mod platform;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::FrameBot;
use crate::config::Config;
use crate::frame_api::FrameApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,animeframebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: animeframebot <config.toml>")?;

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Bot name: @{}", config.bot.username());
    info!("  Frame API: {}", config.bot.api_base());
    info!("  Temp dir: {}", config.bot.tmp_dir.display());
    info!("  Request timeout: {}s", config.bot.request_timeout_secs);

    let api = FrameApiClient::new(&config.bot)?;
    let frame_bot = Arc::new(FrameBot::new(config.bot.clone(), api));
    let bot = teloxide::Bot::new(&config.telegram.bot_token);

    info!("Bot is starting...");
    platform::telegram::run(frame_bot, bot).await?;

    Ok(())
}
