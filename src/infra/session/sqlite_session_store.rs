// SQLite-backed session store so chat activation survives restarts.
//
// Tables:
// - chat_sessions: Per-chat activation flag

use crate::core::session::{ChatConfig, SessionError, SessionStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteSessionStore {
    pool: Pool<Sqlite>,
}

impl SqliteSessionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                chat_id INTEGER PRIMARY KEY,
                is_active BOOLEAN NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, chat_id: i64) -> Result<Option<ChatConfig>, SessionError> {
        let row = sqlx::query("SELECT is_active FROM chat_sessions WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::StorageError(e.to_string()))?;

        Ok(row.map(|r| ChatConfig {
            is_active: r.get("is_active"),
        }))
    }

    async fn set(&self, chat_id: i64, config: ChatConfig) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (chat_id, is_active)
            VALUES (?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                is_active = excluded.is_active
            "#,
        )
        .bind(chat_id)
        .bind(config.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, SqliteSessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        let store = SqliteSessionStore::new(pool);
        store.migrate().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_unknown_chat_is_absent() {
        let (_dir, store) = store().await;
        assert_eq!(store.get(-42).await.unwrap(), None);
        assert!(!store.is_active(-42).await.unwrap());
    }

    #[tokio::test]
    async fn test_activation_round_trips_and_updates() {
        let (_dir, store) = store().await;

        store.set(-42, ChatConfig { is_active: true }).await.unwrap();
        assert!(store.is_active(-42).await.unwrap());

        store.set(-42, ChatConfig { is_active: false }).await.unwrap();
        assert_eq!(
            store.get(-42).await.unwrap(),
            Some(ChatConfig { is_active: false })
        );
    }
}
