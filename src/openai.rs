//! OpenAI REST implementation of `GenerationBackend`

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bot_config::GenerationConfig;
use crate::generation::{ChatMessage, Completion, GenerationBackend};
use crate::generation_errors::GenerationError;

/// Images requested per call
const IMAGE_COUNT: u8 = 1;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl TryFrom<ChatResponse> for Completion {
    type Error = GenerationError;

    fn try_from(response: ChatResponse) -> Result<Self, Self::Error> {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no completion choices".into()))?;
        let total_tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(Completion { text, total_tokens })
    }
}

impl ImageResponse {
    fn into_first_url(self) -> Result<String, GenerationError> {
        self.data
            .into_iter()
            .next()
            .and_then(|data| data.url)
            .ok_or_else(|| GenerationError::InvalidResponse("no image URL in response".into()))
    }
}

/// Client for the OpenAI (or compatible) REST API
pub struct OpenAiBackend {
    client: Client,
    config: GenerationConfig,
}

impl OpenAiBackend {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn image_form(&self, png: Vec<u8>) -> Result<Form, GenerationError> {
        let part = Part::bytes(png).file_name("image.png").mime_str("image/png")?;
        Ok(Form::new()
            .part("image", part)
            .text("n", IMAGE_COUNT.to_string())
            .text("size", self.config.image_size.clone()))
    }

    async fn post_multipart(&self, path: &str, form: Form) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        parse_response::<ImageResponse>(response)
            .await?
            .into_first_url()
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))
}

/// Pull the human-readable message out of an API error body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, GenerationError> {
        debug!(model = %self.config.chat_model, messages = messages.len(), "Requesting completion");

        let request = ChatRequest {
            model: &self.config.chat_model,
            messages,
        };
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        parse_response::<ChatResponse>(response).await?.try_into()
    }

    async fn create_image(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(prompt_length = prompt.len(), "Requesting image generation");

        let request = ImageRequest {
            prompt,
            n: IMAGE_COUNT,
            size: &self.config.image_size,
        };
        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        parse_response::<ImageResponse>(response)
            .await?
            .into_first_url()
    }

    async fn create_variation(&self, png: Vec<u8>) -> Result<String, GenerationError> {
        debug!(image_bytes = png.len(), "Requesting image variation");

        let form = self.image_form(png)?;
        self.post_multipart("images/variations", form).await
    }

    async fn edit_image(&self, png: Vec<u8>, prompt: &str) -> Result<String, GenerationError> {
        debug!(image_bytes = png.len(), prompt_length = prompt.len(), "Requesting image edit");

        let form = self.image_form(png)?.text("prompt", prompt.to_string());
        self.post_multipart("images/edits", form).await
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
