// Per-chat session state and its storage port.
//
// The pipeline only ever asks one question here: is moderation switched on
// for this chat? Admins flip the flag with /start and /finish.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Per-chat configuration. A chat the store has never seen is inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub is_active: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { is_active: false }
    }
}

/// Trait for persisting per-chat configuration, keyed by chat id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, chat_id: i64) -> Result<Option<ChatConfig>, SessionError>;

    async fn set(&self, chat_id: i64, config: ChatConfig) -> Result<(), SessionError>;

    /// Convenience read: unknown chats are inactive.
    async fn is_active(&self, chat_id: i64) -> Result<bool, SessionError> {
        Ok(self
            .get(chat_id)
            .await?
            .map(|config| config.is_active)
            .unwrap_or(false))
    }
}
