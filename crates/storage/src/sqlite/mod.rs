use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{EvaluationPersistence, ProgressRepository, QuizRepository, Storage};

mod evaluation_repo;
mod mapping;
mod migrate;
mod progress_repo;
mod quiz_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("invalid pool settings: {0}")]
    InvalidSettings(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection pool tuning. Evaluations hold a write transaction briefly, so a
/// small pool with a generous busy timeout is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl PoolSettings {
    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    fn validate(&self) -> Result<(), SqliteInitError> {
        if self.max_connections == 0 {
            return Err(SqliteInitError::InvalidSettings(
                "max_connections must be at least 1",
            ));
        }
        Ok(())
    }
}

impl SqliteRepository {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or no connection can be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with(database_url, PoolSettings::default()).await
    }

    /// Connect with foreign keys enforced, WAL journaling, and a busy timeout on
    /// every pooled connection.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the settings or URL are invalid, or no
    /// connection can be opened.
    pub async fn connect_with(
        database_url: &str,
        settings: PoolSettings,
    ) -> Result<Self, SqliteInitError> {
        settings.validate()?;
        let options = SqliteConnectOptions::from_str(database_url)?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(settings.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await?;
        tracing::debug!(
            max_connections = settings.max_connections,
            "sqlite pool ready"
        );
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// `SQLite`-backed storage with default pool settings, migrated and ready.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::sqlite_with(database_url, PoolSettings::default()).await
    }

    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn sqlite_with(
        database_url: &str,
        settings: PoolSettings,
    ) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect_with(database_url, settings).await?;
        repo.migrate().await?;
        Ok(Self {
            quizzes: Arc::new(repo.clone()) as Arc<dyn QuizRepository>,
            progress: Arc::new(repo.clone()) as Arc<dyn ProgressRepository>,
            evaluations: Arc::new(repo) as Arc<dyn EvaluationPersistence>,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn zero_connections_is_rejected() {
        let settings = PoolSettings::default().with_max_connections(0);
        let err = SqliteRepository::connect_with("sqlite::memory:", settings)
            .await
            .err();
        assert!(matches!(err, Some(SqliteInitError::InvalidSettings(_))));
    }

    #[tokio::test]
    async fn pragmas_apply_to_pooled_connections() {
        let repo = SqliteRepository::connect_with(
            "sqlite:file:memdb_pragmas?mode=memory&cache=shared",
            PoolSettings::default().with_max_connections(2),
        )
        .await
        .unwrap();
        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
