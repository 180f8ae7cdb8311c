use anyhow::{Context, Result};
use assistant_bot::bot::{self, BotContext};
use assistant_bot::bot_config::{BotConfig, LogFormat};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_tracing(config.log_format);

    info!("Starting Assistant Telegram Bot");

    let bot = Bot::new(&config.telegram_token);
    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    info!(username = ?me.username, "Authorized as bot");

    let ctx = Arc::new(
        BotContext::open(&config)
            .await?
            .with_bot_username(me.username.clone()),
    );

    if let Err(e) = bot
        .set_my_commands(bot::create_command_menu(&ctx.localizer))
        .await
    {
        warn!(error = %e, "Failed to publish command menu");
    }

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry().branch(Update::filter_message().endpoint(bot::message_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::clone(&ctx)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down");
    ctx.close().await;

    Ok(())
}
