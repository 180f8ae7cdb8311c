//! Message Handler module: adapts Telegram updates to the dialogue manager

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use tracing::{debug, warn};

use super::context::BotContext;
use super::dialogue_manager::handle_event;
use super::messenger::{Inbound, InboundContent, Messenger, Photo};

/// `Messenger` backed by the Telegram Bot API
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .context("Failed to send message")?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, photo: Photo, caption: &str) -> Result<()> {
        let file = match photo {
            Photo::Url(url) => {
                let url = reqwest::Url::parse(&url)
                    .with_context(|| format!("Invalid image URL: {url}"))?;
                InputFile::url(url)
            }
            Photo::Bytes(bytes) => InputFile::memory(bytes).file_name("image.png"),
        };

        self.bot
            .send_photo(ChatId(chat_id), file)
            .caption(caption)
            .await
            .context("Failed to send photo")?;
        Ok(())
    }

    async fn download_image(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .context("Failed to look up file")?;
        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );

        let bytes = reqwest::get(&url)
            .await
            .context("Failed to download file")?
            .error_for_status()
            .context("Telegram refused file download")?
            .bytes()
            .await
            .context("Failed to read file body")?;

        debug!(image_bytes = bytes.len(), "Image downloaded");
        Ok(bytes.to_vec())
    }
}

/// Convert a Telegram message into an inbound event. Messages without a
/// sender (channel posts) are skipped.
pub fn inbound_from_message(msg: &Message, bot_username: Option<&str>) -> Option<Inbound> {
    let user = msg.from.as_ref()?;

    let content = if let Some(text) = msg.text() {
        InboundContent::from_text(text, bot_username)
    } else if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
        InboundContent::Image {
            file_id: largest_photo.file.id.0.clone(),
        }
    } else {
        InboundContent::Other
    };

    Some(Inbound {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id.0,
        username: user.username.clone(),
        content,
    })
}

pub async fn message_handler(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let Some(event) = inbound_from_message(&msg, ctx.bot_username.as_deref()) else {
        warn!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    let messenger = TelegramMessenger::new(bot);
    handle_event(&ctx, &messenger, event).await
}
