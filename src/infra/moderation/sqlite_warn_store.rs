// SQLite-backed warn ledger.
//
// Tables:
// - warn_entries: one row per warning, in append order (rowid)

use crate::core::guild_config::StoreError;
use crate::core::moderation::{WarnEntry, WarnStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteWarnStore {
    pool: Pool<Sqlite>,
}

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqliteWarnStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warn_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_warn_entries_guild_user
                ON warn_entries(guild_id, user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }
}

#[async_trait]
impl WarnStore for SqliteWarnStore {
    async fn add_warn(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<u32, StoreError> {
        let entry = WarnEntry::now(reason);
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO warn_entries (guild_id, user_id, reason, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(&entry.reason)
        .bind(entry.timestamp.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        // Count inside the same transaction so it reflects this append
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM warn_entries WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        let total: i64 = row.get("total");
        Ok(total as u32)
    }

    async fn get_warns(&self, guild_id: u64, user_id: u64) -> Result<Vec<WarnEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT reason, timestamp
            FROM warn_entries
            WHERE guild_id = ? AND user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut warns = Vec::with_capacity(rows.len());
        for row in rows {
            let reason: String = row.get("reason");
            let timestamp_str: String = row.get("timestamp");
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            warns.push(WarnEntry { reason, timestamp });
        }
        Ok(warns)
    }

    async fn clear_warns(&self, guild_id: u64, user_id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM warn_entries WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
