use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod attempt_repo;
mod bookmark_repo;
mod exam_repo;
mod mapping;
mod migrate;

/// Exams, their attempt history and bookmarks in one `SQLite` database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// Deleting an exam relies on `ON DELETE CASCADE` for its questions.
    #[error("foreign key enforcement is off for this connection")]
    ForeignKeysDisabled,

    #[error("database schema version {found} is newer than the supported {supported}")]
    SchemaTooNew { found: i64, supported: i64 },
}

impl SqliteRepository {
    /// Open the exam database at `database_url`, creating the file if needed.
    ///
    /// Every pooled connection enforces foreign keys and uses WAL with a
    /// five second busy timeout, so the CLI and a running session can share
    /// one file.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::Sqlx` for a malformed URL or a failed
    /// connection, and `SqliteInitError::ForeignKeysDisabled` if the
    /// connection ignores `PRAGMA foreign_keys`.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        let enforced: i64 = sqlx::query_scalar("PRAGMA foreign_keys;")
            .fetch_one(&pool)
            .await?;
        if enforced != 1 {
            return Err(SqliteInitError::ForeignKeysDisabled);
        }
        tracing::debug!(url = database_url, "exam database connected");
        Ok(Self { pool })
    }

    /// Bring the exam schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration fails or the file was written
    /// by a newer schema.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Exam, attempt and bookmark stores sharing one migrated `SQLite` pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self {
            exams: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            bookmarks: Arc::new(repo),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connections_enforce_foreign_keys() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_pragmas?mode=memory&cache=shared")
            .await
            .unwrap();
        let enforced: i64 = sqlx::query_scalar("PRAGMA foreign_keys;")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(enforced, 1);
    }

    #[tokio::test]
    async fn newer_schema_is_refused() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_future?mode=memory&cache=shared")
            .await
            .unwrap();
        repo.migrate().await.unwrap();
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (99, 'later')")
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.migrate().await.unwrap_err();
        assert!(matches!(
            err,
            SqliteInitError::SchemaTooNew {
                found: 99,
                supported: 1
            }
        ));
    }
}
