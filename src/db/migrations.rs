//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;

use super::Database;

/// Latest schema version this build knows how to create
const SCHEMA_VERSION: i64 = 1;

const ENTRIES_TABLE: &str = r#"
    CREATE TABLE entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        feed_name TEXT NOT NULL,
        resource_id TEXT NOT NULL,
        title TEXT NOT NULL,
        link TEXT NOT NULL DEFAULT '',
        author_name TEXT NOT NULL DEFAULT '',
        author_uri TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        thumbnail_url TEXT NOT NULL DEFAULT '',
        published INTEGER NOT NULL,
        updated INTEGER NOT NULL,
        file_path TEXT NOT NULL,
        duration_secs INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        UNIQUE(feed_name, resource_id)
    )
"#;

const ENTRIES_INDEX: &str =
    "CREATE INDEX idx_entries_feed_published ON entries(feed_name, published DESC, id DESC)";

// No foreign key to `entries`: a marker outlives its entry.
const PROCESSED_TABLE: &str = r#"
    CREATE TABLE processed (
        feed_name TEXT NOT NULL,
        resource_id TEXT NOT NULL,
        processed_at INTEGER NOT NULL,
        PRIMARY KEY (feed_name, resource_id)
    )
"#;

fn connection_failed(context: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::Database(DatabaseError::ConnectionFailed(format!("{context}: {e}")))
}

fn migration_failed(context: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::Database(DatabaseError::MigrationFailed(format!("{context}: {e}")))
}

impl Database {
    /// Open (creating if missing) the store at `path` and bring its schema
    /// up to date
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                )))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(connection_failed("Failed to parse database path"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(connection_failed("Failed to connect to database"))?;

        let db = Self { pool };
        db.run_migrations().await?;

        tracing::debug!(path = %path.display(), "Entry store opened");
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(migration_failed("Failed to create schema_version table"))?;

        let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to query schema version: {e}"
                )))
            })?;

        if current >= SCHEMA_VERSION {
            return Ok(());
        }

        tracing::info!(from = current, to = SCHEMA_VERSION, "Migrating entry store");

        // dropping the transaction on error rolls back, leaving no half schema
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(migration_failed("Failed to begin migration"))?;

        if current < 1 {
            for (statement, what) in [
                (ENTRIES_TABLE, "entries table"),
                (ENTRIES_INDEX, "entries index"),
                (PROCESSED_TABLE, "processed table"),
            ] {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to create {what}: {e}"
                        )))
                    })?;
            }
            record_version(&mut tx, 1).await?;
        }

        tx.commit()
            .await
            .map_err(migration_failed("Failed to commit migration"))?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn record_version(tx: &mut Transaction<'_, Sqlite>, version: i64) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
        .bind(version)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut **tx)
        .await
        .map_err(migration_failed("Failed to record schema version"))?;
    Ok(())
}
