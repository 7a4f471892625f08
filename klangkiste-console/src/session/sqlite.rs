//! SQLite-backed session store
//!
//! Wizard progress lives in a small SQLite file so it survives a console
//! restart. Sessions are stored as one JSON payload per scan key.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use super::SessionStore;
use crate::models::WizardSession;
use klangkiste_common::Result;

#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at `db_path`
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("connecting to session database: {}", db_url);
        let pool = SqlitePool::connect(&db_url).await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    /// Build a store over an existing pool (tests)
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wizard_sessions (
                scan_key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("session database tables initialized (wizard_sessions)");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, key: &str) -> Result<Option<WizardSession>> {
        let row = sqlx::query("SELECT data FROM wizard_sessions WHERE scan_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.get("data");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &WizardSession) -> Result<()> {
        let data = serde_json::to_string(session)?;
        sqlx::query(
            r#"
            INSERT INTO wizard_sessions (scan_key, data, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(scan_key) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&session.key)
        .bind(&data)
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM wizard_sessions WHERE scan_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
