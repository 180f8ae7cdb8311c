//! Transport-neutral view of the chat: what comes in, and how replies go out

use anyhow::Result;
use async_trait::async_trait;

/// Bot commands understood in every state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    GenPic,
    Variation,
    Background,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Command::Start,
        Command::GenPic,
        Command::Variation,
        Command::Background,
    ];

    /// Name as typed after the slash
    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::GenPic => "gen_pic",
            Command::Variation => "variation",
            Command::Background => "background",
        }
    }

    /// Parse `/name`, `/name@botname` or `/name args`. A mention must name
    /// this bot (`bot_username`, compared case-insensitively); commands for
    /// other bots and unknown commands yield `None` and are treated as plain
    /// text.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let token = text.trim_start().split_whitespace().next()?;
        let token = token.strip_prefix('/')?;

        let name = match token.split_once('@') {
            Some((name, mention)) => {
                if !bot_username.is_some_and(|own| own.eq_ignore_ascii_case(mention)) {
                    return None;
                }
                name
            }
            None => token,
        };

        Command::ALL.into_iter().find(|command| command.name() == name)
    }
}

/// Payload of an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundContent {
    Command(Command),
    Text(String),
    /// An image attachment, fetched lazily through the messenger
    Image { file_id: String },
    /// Anything else (stickers, voice, ...)
    Other,
}

impl InboundContent {
    /// Classify a text message as command or plain text
    pub fn from_text(text: &str, bot_username: Option<&str>) -> Self {
        match Command::parse(text, bot_username) {
            Some(command) => InboundContent::Command(command),
            None => InboundContent::Text(text.to_string()),
        }
    }
}

/// One inbound event from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub content: InboundContent,
}

/// Where an outbound photo comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Photo {
    Url(String),
    Bytes(Vec<u8>),
}

/// Outbound side of the chat transport
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_photo(&self, chat_id: i64, photo: Photo, caption: &str) -> Result<()>;

    /// Download an image attachment referenced by an inbound event
    async fn download_image(&self, file_id: &str) -> Result<Vec<u8>>;
}
