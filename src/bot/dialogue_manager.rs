//! Dialogue Manager module: routes each inbound event by session state and
//! content, calls the generation client, and records usage.

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::context::BotContext;
use super::messenger::{Command, Inbound, InboundContent, Messenger, Photo};
use crate::session::{ConversationState, Session};

/// Free-form text asking for a picture
static IMAGE_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)картинка|изображение").expect("Image intent pattern should be valid")
});

/// Whether free-form text should be answered with a generated image
pub fn wants_image(text: &str) -> bool {
    IMAGE_INTENT.is_match(text)
}

/// Handle one inbound event end to end.
///
/// The user's session stays locked until the reply is sent, so events from
/// the same user never interleave.
pub async fn handle_event(ctx: &BotContext, messenger: &dyn Messenger, event: Inbound) -> Result<()> {
    let Inbound {
        user_id,
        chat_id,
        username,
        content,
    } = event;

    let mut guard = ctx.sessions.lock(user_id).await;
    let session: &mut Session = &mut guard;
    debug!(user_id, state = session.state.name(), "Handling inbound event");

    match content {
        InboundContent::Command(command) => {
            handle_command(ctx, messenger, user_id, chat_id, username.as_deref(), session, command)
                .await
        }
        InboundContent::Text(text) => match &mut session.state {
            ConversationState::Idle => {
                handle_free_text(ctx, messenger, user_id, chat_id, session, &text).await
            }
            ConversationState::AwaitingImagePrompt => {
                handle_image_prompt(ctx, messenger, chat_id, session, &text).await
            }
            ConversationState::AwaitingBackgroundPrompt { image } => {
                let image = std::mem::take(image);
                handle_background_prompt(ctx, messenger, chat_id, session, image, &text).await
            }
            ConversationState::AwaitingVariationImage | ConversationState::AwaitingBackgroundImage => {
                ignore_off_script(user_id, session, "text");
                Ok(())
            }
        },
        InboundContent::Image { file_id } => match session.state {
            ConversationState::AwaitingVariationImage => {
                handle_variation_image(ctx, messenger, chat_id, session, &file_id).await
            }
            ConversationState::AwaitingBackgroundImage => {
                handle_background_image(ctx, messenger, chat_id, session, &file_id).await
            }
            _ => {
                ignore_off_script(user_id, session, "image");
                Ok(())
            }
        },
        InboundContent::Other => {
            ignore_off_script(user_id, session, "unsupported");
            Ok(())
        }
    }
}

fn ignore_off_script(user_id: i64, session: &Session, kind: &str) {
    debug!(user_id, state = session.state.name(), kind, "Ignoring off-script message");
}

async fn handle_command(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    user_id: i64,
    chat_id: i64,
    username: Option<&str>,
    session: &mut Session,
    command: Command,
) -> Result<()> {
    info!(user_id, command = command.name(), "Received command");

    let (next_state, reply_key) = match command {
        Command::Start => {
            ctx.ledger.register(user_id, username).await?;
            session.clear();
            messenger
                .send_text(chat_id, &ctx.localizer.text("welcome"))
                .await?;
            ctx.ledger.add_usage(user_id, ctx.costs.start).await?;
            return Ok(());
        }
        Command::GenPic => (ConversationState::AwaitingImagePrompt, "ask-image-prompt"),
        Command::Variation => (ConversationState::AwaitingVariationImage, "ask-variation-image"),
        Command::Background => (ConversationState::AwaitingBackgroundImage, "ask-background-image"),
    };

    session.state = next_state;
    messenger
        .send_text(chat_id, &ctx.localizer.text(reply_key))
        .await
}

/// Send either the generated image or the failure text
async fn reply_with_image(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    chat_id: i64,
    image_url: Option<String>,
    caption_key: &str,
    failure_key: &str,
) -> Result<()> {
    match image_url {
        Some(url) => {
            messenger
                .send_photo(chat_id, Photo::Url(url), &ctx.localizer.text(caption_key))
                .await
        }
        None => {
            messenger
                .send_text(chat_id, &ctx.localizer.text(failure_key))
                .await
        }
    }
}

async fn handle_image_prompt(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    chat_id: i64,
    session: &mut Session,
    prompt: &str,
) -> Result<()> {
    session.clear();
    let image_url = ctx.generator.synthesize_image(prompt).await;
    reply_with_image(
        ctx,
        messenger,
        chat_id,
        image_url,
        "caption-generated",
        "error-image-generation",
    )
    .await
}

/// Download the user's photo. On failure the user gets the flow's failure
/// text and `None` comes back; nothing is charged.
async fn download_or_apologize(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    chat_id: i64,
    file_id: &str,
    failure_key: &str,
) -> Result<Option<Vec<u8>>> {
    match messenger.download_image(file_id).await {
        Ok(image) => Ok(Some(image)),
        Err(e) => {
            warn!(chat_id, file_id, error = %e, "Failed to download user image");
            messenger
                .send_text(chat_id, &ctx.localizer.text(failure_key))
                .await?;
            Ok(None)
        }
    }
}

async fn handle_variation_image(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    chat_id: i64,
    session: &mut Session,
    file_id: &str,
) -> Result<()> {
    session.clear();
    let Some(image) =
        download_or_apologize(ctx, messenger, chat_id, file_id, "error-variation").await?
    else {
        return Ok(());
    };

    let image_url = ctx.generator.vary_image(&image).await;
    reply_with_image(
        ctx,
        messenger,
        chat_id,
        image_url,
        "caption-variation",
        "error-variation",
    )
    .await
}

async fn handle_background_image(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    chat_id: i64,
    session: &mut Session,
    file_id: &str,
) -> Result<()> {
    // Idle until the image is in hand; the history survives into the prompt step
    session.state = ConversationState::Idle;
    let Some(image) =
        download_or_apologize(ctx, messenger, chat_id, file_id, "error-background").await?
    else {
        return Ok(());
    };
    debug!(chat_id, image_bytes = image.len(), "Background image stashed");

    session.state = ConversationState::AwaitingBackgroundPrompt { image };
    messenger
        .send_text(chat_id, &ctx.localizer.text("ask-background-prompt"))
        .await
}

async fn handle_background_prompt(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    chat_id: i64,
    session: &mut Session,
    image: Vec<u8>,
    prompt: &str,
) -> Result<()> {
    session.clear();
    let image_url = ctx.generator.edit_image_background(&image, prompt).await;
    reply_with_image(
        ctx,
        messenger,
        chat_id,
        image_url,
        "caption-background",
        "error-background",
    )
    .await
}

/// Idle text: chat completion, or an image when the text asks for one
async fn handle_free_text(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    user_id: i64,
    chat_id: i64,
    session: &mut Session,
    text: &str,
) -> Result<()> {
    session.history.push(format!("User: {text}"));

    let (reply, cost) = if wants_image(text) {
        generate_requested_image(ctx, messenger, chat_id, text).await?
    } else {
        ctx.generator.complete(text).await
    };

    session.history.push(format!("Bot: {reply}"));
    messenger.send_text(chat_id, &reply).await?;

    ctx.ledger.add_usage(user_id, cost).await?;
    debug!(user_id, cost, history = session.history.len(), "Free-form reply sent");
    Ok(())
}

/// Generate, download and send an image; returns the follow-up text and cost
async fn generate_requested_image(
    ctx: &BotContext,
    messenger: &dyn Messenger,
    chat_id: i64,
    prompt: &str,
) -> Result<(String, u32)> {
    let image = match ctx.generator.synthesize_image(prompt).await {
        Some(url) => ctx.generator.fetch_image(&url).await,
        None => None,
    };

    let Some(bytes) = image else {
        return Ok((
            ctx.localizer.text("error-image-generation"),
            ctx.costs.image_failure,
        ));
    };

    messenger
        .send_photo(
            chat_id,
            Photo::Bytes(bytes),
            &ctx.localizer.text("caption-requested"),
        )
        .await?;
    Ok((ctx.localizer.text("image-sent"), ctx.costs.image_success))
}
