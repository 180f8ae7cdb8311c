//! # Generation Client Module
//!
//! `GenerationBackend` is the raw upstream contract (one call, one result or
//! error). `GenerationClient` wraps a backend and is the failure boundary the
//! dialogue code talks to: upstream errors are logged here and turned into an
//! apology text or `None`, never propagated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::generation_errors::GenerationError;
use crate::imaging;

/// System prompt sent ahead of every completion
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// One message of a chat completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Text returned by a completion together with its token usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: u32,
}

/// Upstream generative API
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Chat completion over `messages`
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError>;

    /// Create one image from a prompt, returning its URL
    async fn create_image(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Create one variation of a PNG image, returning its URL
    async fn create_variation(&self, png: Vec<u8>) -> Result<String, GenerationError>;

    /// Edit a square PNG image according to `prompt`, returning its URL
    async fn edit_image(&self, png: Vec<u8>, prompt: &str) -> Result<String, GenerationError>;

    /// Download the bytes behind an image URL
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GenerationError>;
}

/// Failure boundary around a `GenerationBackend`
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    apology: String,
}

impl GenerationClient {
    /// `apology` is returned in place of completion text when upstream fails
    pub fn new(backend: Arc<dyn GenerationBackend>, apology: impl Into<String>) -> Self {
        Self {
            backend,
            apology: apology.into(),
        }
    }

    /// Answer `prompt`. On failure returns the apology and a cost of 0.
    pub async fn complete(&self, prompt: &str) -> (String, u32) {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        match self.backend.complete(&messages).await {
            Ok(completion) => {
                debug!(tokens = completion.total_tokens, "Completion received");
                (completion.text.trim().to_string(), completion.total_tokens)
            }
            Err(e) => {
                error!(error = %e, "Error in completion API call");
                (self.apology.clone(), 0)
            }
        }
    }

    /// Generate an image from `prompt`
    pub async fn synthesize_image(&self, prompt: &str) -> Option<String> {
        match self.backend.create_image(prompt).await {
            Ok(url) => Some(url),
            Err(e) => {
                error!(error = %e, "Error in image generation API call");
                None
            }
        }
    }

    /// Create a variation of `image`, given in any decodable format
    pub async fn vary_image(&self, image: &[u8]) -> Option<String> {
        let result = match imaging::to_png(image) {
            Ok(png) => self.backend.create_variation(png).await,
            Err(e) => Err(GenerationError::from(e)),
        };

        match result {
            Ok(url) => Some(url),
            Err(e) => {
                error!(error = %e, "Error in image variation API call");
                None
            }
        }
    }

    /// Pad `image` to a transparent square and replace its background
    /// according to `prompt`
    pub async fn edit_image_background(&self, image: &[u8], prompt: &str) -> Option<String> {
        let result = match imaging::pad_to_square(image) {
            Ok(png) => self.backend.edit_image(png, prompt).await,
            Err(e) => Err(GenerationError::from(e)),
        };

        match result {
            Ok(url) => Some(url),
            Err(e) => {
                error!(error = %e, "Error in image edit API call");
                None
            }
        }
    }

    /// Download a generated image
    pub async fn fetch_image(&self, url: &str) -> Option<Vec<u8>> {
        match self.backend.fetch_image(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(error = %e, url = %url, "Failed to download generated image");
                None
            }
        }
    }
}
