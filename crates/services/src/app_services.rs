use std::sync::Arc;

use storage::repository::Storage;
use storage::sqlite::PoolSettings;

use crate::Clock;
use crate::error::AppServicesError;
use crate::evaluation::{DEFAULT_MAX_ATTEMPTS, EvaluationService};
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    evaluation: Arc<EvaluationService>,
    quizzes: Arc<QuizService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, running migrations first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        pool: PoolSettings,
        clock: Clock,
        max_attempts: u32,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite_with(db_url, pool).await?;
        Ok(Self::from_storage(&storage, clock, max_attempts))
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, DEFAULT_MAX_ATTEMPTS)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, max_attempts: u32) -> Self {
        let evaluation = EvaluationService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.evaluations),
        )
        .with_max_attempts(max_attempts);

        Self {
            evaluation: Arc::new(evaluation),
            quizzes: Arc::new(QuizService::new(clock, Arc::clone(&storage.quizzes))),
            progress: Arc::new(ProgressService::new(Arc::clone(&storage.progress))),
        }
    }

    #[must_use]
    pub fn evaluation(&self) -> Arc<EvaluationService> {
        Arc::clone(&self.evaluation)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
