//! Fakes shared by the integration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use assistant_bot::bot::{BotContext, Messenger, Photo};
use assistant_bot::bot_config::UsageCosts;
use assistant_bot::db::UserLedger;
use assistant_bot::generation::{ChatMessage, Completion, GenerationBackend};
use assistant_bot::generation_errors::GenerationError;
use assistant_bot::localization::Localizer;

pub const IMAGE_URL: &str = "https://images.example/result.png";
pub const BOT_USERNAME: &str = "assistant_bot";

/// One upstream call seen by the fake backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Complete(Vec<ChatMessage>),
    CreateImage(String),
    Variation(Vec<u8>),
    Edit { png: Vec<u8>, prompt: String },
    Fetch(String),
}

/// Scriptable generation backend
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<BackendCall>>,
    pub fail: bool,
    pub fail_fetch: bool,
}

impl FakeBackend {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: BackendCall) -> Result<(), GenerationError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(GenerationError::Api {
                status: 500,
                message: "upstream is down".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        self.record(BackendCall::Complete(messages.to_vec()))?;
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(Completion {
            text: format!("  answer to {prompt}\n"),
            total_tokens: 42,
        })
    }

    async fn create_image(&self, prompt: &str) -> Result<String, GenerationError> {
        self.record(BackendCall::CreateImage(prompt.to_string()))?;
        Ok(IMAGE_URL.to_string())
    }

    async fn create_variation(&self, png: Vec<u8>) -> Result<String, GenerationError> {
        self.record(BackendCall::Variation(png))?;
        Ok(IMAGE_URL.to_string())
    }

    async fn edit_image(&self, png: Vec<u8>, prompt: &str) -> Result<String, GenerationError> {
        self.record(BackendCall::Edit {
            png,
            prompt: prompt.to_string(),
        })?;
        Ok(IMAGE_URL.to_string())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::Fetch(url.to_string()));
        if self.fail_fetch {
            return Err(GenerationError::Http("connection reset".to_string()));
        }
        Ok(b"generated image bytes".to_vec())
    }
}

/// Something the bot sent back
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text(String),
    Photo { photo: Photo, caption: String },
}

/// Messenger that records replies and serves a fixed image for downloads
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(i64, Sent)>>,
    pub image: Vec<u8>,
    pub fail_download: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            image: png_image(4, 2),
            fail_download: false,
        }
    }

    /// Messenger whose attachment downloads always fail
    pub fn failing_downloads() -> Self {
        Self {
            fail_download: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent().last().cloned()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id, Sent::Text(text.to_string())));
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, photo: Photo, caption: &str) -> Result<()> {
        self.sent.lock().unwrap().push((
            chat_id,
            Sent::Photo {
                photo,
                caption: caption.to_string(),
            },
        ));
        Ok(())
    }

    async fn download_image(&self, file_id: &str) -> Result<Vec<u8>> {
        if self.fail_download {
            anyhow::bail!("Telegram file {file_id} is unavailable");
        }
        Ok(self.image.clone())
    }
}

/// Opaque PNG of the given size
pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 120, 30, 255]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// Context over an in-memory ledger and the given backend
pub async fn test_context(backend: Arc<FakeBackend>) -> BotContext {
    let ledger = UserLedger::connect("sqlite::memory:").await.unwrap();
    let localizer = Localizer::new("ru").unwrap();
    BotContext::new(ledger, backend, localizer, UsageCosts::default())
        .with_bot_username(Some(BOT_USERNAME.to_string()))
}
