use quiz_core::domains::DomainStats;
use quiz_core::model::{Achievement, CertificationId, UserId, UserProfile, UserProgress};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{
    db, map_achievement_row, map_domain_row, map_profile_row, map_progress_row, ser,
};
use crate::repository::{ProgressRepository, StorageError};

async fn load_domains(
    conn: &mut SqliteConnection,
    user_id: UserId,
    certification_id: CertificationId,
) -> Result<DomainStats, StorageError> {
    let rows = sqlx::query(
        r"
        SELECT domain, seen, correct
        FROM progress_domains
        WHERE user_id = ?1 AND certification_id = ?2
        ",
    )
    .bind(user_id.to_string())
    .bind(certification_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .map_err(db)?;

    let mut stats = DomainStats::new();
    for row in &rows {
        let (domain, accuracy) = map_domain_row(row)?;
        stats.insert(domain, accuracy);
    }
    Ok(stats)
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        certification_id: CertificationId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let row = sqlx::query(
            r"
            SELECT
                user_id, certification_id, total_xp, total_quizzes,
                total_questions_answered, correct_answers, current_difficulty,
                updated_at, version
            FROM user_progress
            WHERE user_id = ?1 AND certification_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(certification_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let domains = load_domains(&mut tx, user_id, certification_id).await?;
        tx.commit().await.map_err(db)?;
        map_progress_row(&row, domains).map(Some)
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let rows = sqlx::query(
            r"
            SELECT
                user_id, certification_id, total_xp, total_quizzes,
                total_questions_answered, correct_answers, current_difficulty,
                updated_at, version
            FROM user_progress
            WHERE user_id = ?1
            ORDER BY updated_at DESC, certification_id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        let mut tracks = Vec::with_capacity(rows.len());
        for row in &rows {
            let certification_id = sqlx::Row::try_get::<String, _>(row, "certification_id")
                .map_err(ser)?
                .parse::<CertificationId>()
                .map_err(ser)?;
            let domains = load_domains(&mut tx, user_id, certification_id).await?;
            tracks.push(map_progress_row(row, domains)?);
        }
        tx.commit().await.map_err(db)?;
        Ok(tracks)
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
        sqlx::query(
            r"
            SELECT user_id, total_xp, current_streak, last_quiz_date, version
            FROM user_profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .as_ref()
        .map(map_profile_row)
        .transpose()
    }

    async fn list_achievements(&self, user_id: UserId) -> Result<Vec<Achievement>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, kind, earned_at
            FROM achievements
            WHERE user_id = ?1
            ORDER BY earned_at DESC, id DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_achievement_row).collect()
    }
}
