//! Shared state handed to every handler

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::bot_config::{BotConfig, UsageCosts};
use crate::db::UserLedger;
use crate::generation::{GenerationBackend, GenerationClient};
use crate::localization::Localizer;
use crate::openai::OpenAiBackend;
use crate::session::SessionStore;

/// Everything a handler needs: storage, upstream client, sessions and texts.
///
/// Opened once at startup and closed when the dispatcher stops.
pub struct BotContext {
    pub ledger: UserLedger,
    pub generator: GenerationClient,
    pub sessions: SessionStore,
    pub localizer: Localizer,
    pub costs: UsageCosts,
    /// Our own username; commands mentioning any other bot are plain text
    pub bot_username: Option<String>,
}

impl BotContext {
    pub fn new(
        ledger: UserLedger,
        backend: Arc<dyn GenerationBackend>,
        localizer: Localizer,
        costs: UsageCosts,
    ) -> Self {
        let generator = GenerationClient::new(backend, localizer.text("error-completion"));
        Self {
            ledger,
            generator,
            sessions: SessionStore::new(),
            localizer,
            costs,
            bot_username: None,
        }
    }

    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    /// Open the ledger and build the OpenAI backend described by `config`
    pub async fn open(config: &BotConfig) -> Result<Self> {
        let ledger = UserLedger::connect(&config.database_url).await?;
        let localizer = Localizer::new(&config.locale)?;
        let backend = Arc::new(OpenAiBackend::new(config.generation.clone()));

        info!(
            locale = %localizer.locale(),
            model = %config.generation.chat_model,
            "Bot context ready"
        );
        Ok(Self::new(ledger, backend, localizer, config.costs.clone()))
    }

    /// Release the ledger connection
    pub async fn close(&self) {
        self.ledger.close().await;
    }
}
