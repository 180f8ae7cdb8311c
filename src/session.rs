//! Conversation session module: per-user dialogue state and short history.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::bot_config::HISTORY_LIMIT;

/// Where a user currently is in the conversation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingImagePrompt,
    AwaitingVariationImage,
    AwaitingBackgroundImage,
    /// The image to edit is held until the background description arrives
    AwaitingBackgroundPrompt {
        image: Vec<u8>,
    },
}

impl ConversationState {
    /// Short name for logging; never includes the stashed image
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingImagePrompt => "awaiting_image_prompt",
            ConversationState::AwaitingVariationImage => "awaiting_variation_image",
            ConversationState::AwaitingBackgroundImage => "awaiting_background_image",
            ConversationState::AwaitingBackgroundPrompt { .. } => "awaiting_background_prompt",
        }
    }
}

/// Rolling message history, oldest entries dropped first
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: VecDeque<String>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push_back(entry.into());
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Per-user transient conversation data
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub state: ConversationState,
    pub history: History,
}

impl Session {
    /// Forget everything: back to idle with an empty history
    pub fn clear(&mut self) {
        *self = Session::default();
    }
}

/// In-memory sessions keyed by user id.
///
/// Each session sits behind its own mutex; holding the guard for the whole
/// handling of an event serialises events from the same user.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the session of `user_id`, creating an idle one if needed
    pub async fn lock(&self, user_id: i64) -> OwnedMutexGuard<Session> {
        let session = {
            let mut sessions = self.sessions.lock().await;
            Arc::clone(sessions.entry(user_id).or_default())
        };
        session.lock_owned().await
    }

    /// Snapshot of a user's session, if one exists
    pub async fn snapshot(&self, user_id: i64) -> Option<Session> {
        let session = self.sessions.lock().await.get(&user_id).cloned()?;
        let guard = session.lock().await;
        Some(guard.clone())
    }
}
