//! # Bot Configuration Module
//!
//! This module defines the runtime configuration of the bot: credentials,
//! upstream endpoints, storage location, and the fixed usage costs charged
//! for each kind of interaction.

use anyhow::{Context, Result};
use std::env;

// Defaults for optional settings
pub const DEFAULT_DATABASE_URL: &str = "sqlite://users.db";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
pub const DEFAULT_LOCALE: &str = "ru";

/// Number of history entries kept per session
pub const HISTORY_LIMIT: usize = 10;

/// Usage units charged for each kind of interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCosts {
    /// Charged on every `/start`
    pub start: u32,
    /// Free-form image request that produced a picture
    pub image_success: u32,
    /// Free-form image request that failed upstream
    pub image_failure: u32,
}

impl Default for UsageCosts {
    fn default() -> Self {
        Self {
            start: 10,
            image_success: 50,
            image_failure: 10,
        }
    }
}

/// Settings for the generation backend
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub chat_model: String,
    /// Size requested for every generated image
    pub image_size: String,
}

impl GenerationConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub database_url: String,
    pub locale: String,
    pub log_format: LogFormat,
    pub generation: GenerationConfig,
    pub costs: UsageCosts,
}

impl BotConfig {
    /// Build the configuration from process environment variables.
    ///
    /// `TELEGRAM_BOT_TOKEN` and `OPENAI_API_KEY` are required; everything else
    /// falls back to a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let generation = GenerationConfig {
            api_key: required("OPENAI_API_KEY")?,
            base_url: optional("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            chat_model: optional("OPENAI_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            image_size: optional("OPENAI_IMAGE_SIZE", DEFAULT_IMAGE_SIZE),
        };

        Ok(Self {
            telegram_token: required("TELEGRAM_BOT_TOKEN")?,
            database_url: optional("DATABASE_URL", DEFAULT_DATABASE_URL),
            locale: optional("BOT_LOCALE", DEFAULT_LOCALE),
            log_format: LogFormat::parse(&optional("LOG_FORMAT", "pretty")),
            generation,
            costs: UsageCosts::default(),
        })
    }
}
