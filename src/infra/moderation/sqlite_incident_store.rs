// SQLite-backed incident store for repeat-offense tracking.
//
// Tables:
// - incidents: One row per actionable classified message

use crate::core::moderation::{IncidentStore, ModerationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteIncidentStore {
    pool: Pool<Sqlite>,
}

impl SqliteIncidentStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS incidents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                score REAL NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_incidents_chat_user
                ON incidents(chat_id, user_id, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl IncidentStore for SqliteIncidentStore {
    async fn record_incident(
        &self,
        chat_id: i64,
        user_id: u64,
        score: f64,
        at: DateTime<Utc>,
    ) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO incidents (chat_id, user_id, score, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(chat_id)
        .bind(user_id as i64)
        .bind(score)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn count_recent(
        &self,
        chat_id: i64,
        user_id: u64,
        since: DateTime<Utc>,
    ) -> Result<u32, ModerationError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM incidents
            WHERE chat_id = ? AND user_id = ? AND created_at >= ?
            "#,
        )
        .bind(chat_id)
        .bind(user_id as i64)
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let count: i64 = row.get("n");
        Ok(count as u32)
    }

    async fn cleanup_old_records(&self, older_than: DateTime<Utc>) -> Result<u64, ModerationError> {
        let result = sqlx::query("DELETE FROM incidents WHERE created_at < ?")
            .bind(older_than.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, SqliteIncidentStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incidents.db");
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        let store = SqliteIncidentStore::new(pool);
        store.migrate().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_counts_are_scoped_to_chat_user_and_window() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        let old = now - chrono::Duration::days(3);
        let since = now - chrono::Duration::days(1);

        store.record_incident(-1, 2, 0.6, now).await.unwrap();
        store.record_incident(-1, 2, 0.7, old).await.unwrap(); // outside window
        store.record_incident(-1, 9, 0.6, now).await.unwrap(); // other user
        store.record_incident(-5, 2, 0.6, now).await.unwrap(); // other chat

        assert_eq!(store.count_recent(-1, 2, since).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_drops_only_stale_rows() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        let old = now - chrono::Duration::days(3);

        store.record_incident(-1, 2, 0.6, now).await.unwrap();
        store.record_incident(-1, 2, 0.7, old).await.unwrap();

        let removed = store
            .cleanup_old_records(now - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count_recent(-1, 2, old).await.unwrap(), 1);
    }
}
