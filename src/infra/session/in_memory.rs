// In-memory implementation of SessionStore.
//
// Useful for tests and for running without a database; chats fall back to
// inactive after a restart, which just means an admin runs /start again.

use crate::core::session::{ChatConfig, SessionError, SessionStore};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemorySessionStore {
    configs: DashMap<i64, ChatConfig>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            configs: DashMap::new(),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, chat_id: i64) -> Result<Option<ChatConfig>, SessionError> {
        Ok(self.configs.get(&chat_id).map(|entry| *entry.value()))
    }

    async fn set(&self, chat_id: i64, config: ChatConfig) -> Result<(), SessionError> {
        self.configs.insert(chat_id, config);
        Ok(())
    }
}
