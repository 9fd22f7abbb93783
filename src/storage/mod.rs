use anyhow::{Context as _, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the server indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// A persisted task. Timestamps are RFC 3339 strings in UTC.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: String,
    pub name: String,
    pub description: String,
    /// NULL for rows written before the deadline default existed —
    /// display falls back to `created_at`.
    pub deadline: Option<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open the task store from a SQLite connection string and run migrations.
    ///
    /// The connection is established once at process start; any failure here
    /// is treated as fatal by the caller. `slow_query_ms` > 0 logs statements
    /// exceeding that threshold at WARN level.
    pub async fn connect(db_url: &str, slow_query_ms: u64) -> Result<Self> {
        let mut opts = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("invalid database URL '{db_url}'"))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts)
            .await
            .with_context(|| format!("failed to open task store at '{db_url}'"))?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Create the tasks table (idempotent).
    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT NOT NULL,
                deadline    TEXT,
                completed   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Creating tasks table")?;
        Ok(())
    }

    /// Insert a task, assigning id / created_at / updated_at.
    ///
    /// `deadline` is already resolved by the service layer — the schema
    /// carries no default for it.
    pub async fn insert_task(
        &self,
        name: &str,
        description: &str,
        deadline: &str,
    ) -> Result<TaskRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO tasks (id, name, description, deadline, completed, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(description)
        .bind(deadline)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_task(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("task not found after insert"))
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// All tasks in insertion order. Display ordering is a presentation concern.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM tasks ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    /// Set the completed flag, bumping updated_at.
    /// Returns `None` when no task has the given id.
    pub async fn update_task(&self, id: &str, completed: bool) -> Result<Option<TaskRow>> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE tasks SET completed = ?, updated_at = ? WHERE id = ?")
            .bind(completed)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_task(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A pool over `sqlite::memory:` gives every pooled connection its own
    // database, so tests use a throwaway file-backed store instead.
    async fn test_storage() -> Storage {
        let dir = tempfile::tempdir().unwrap().keep();
        let url = format!("sqlite://{}/todos.db", dir.display());
        Storage::connect(&url, 0).await.unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let storage = test_storage().await;
        let row = storage
            .insert_task("Write spec", "finish doc", "2025-01-01T10:00:00+00:00")
            .await
            .unwrap();
        assert!(!row.id.is_empty());
        assert!(!row.completed);
        assert_eq!(row.created_at, row.updated_at);
    }

    #[tokio::test]
    async fn update_unknown_id_returns_none() {
        let storage = test_storage().await;
        let updated = storage.update_task("no-such-id", true).await.unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn update_bumps_updated_at_only() {
        let storage = test_storage().await;
        let row = storage
            .insert_task("a", "b", "2025-01-01T10:00:00+00:00")
            .await
            .unwrap();
        let updated = storage.update_task(&row.id, true).await.unwrap().unwrap();
        assert!(updated.completed);
        assert_eq!(updated.id, row.id);
        assert_eq!(updated.created_at, row.created_at);
    }
}
