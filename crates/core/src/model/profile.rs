use chrono::NaiveDate;
use serde::Serialize;

use crate::model::ids::UserId;

/// XP needed to advance one level.
pub const XP_PER_LEVEL: u64 = 100;

/// `floor(total_xp / 100) + 1`, saturating.
#[must_use]
pub fn level_for_xp(total_xp: u64) -> u32 {
    u32::try_from(total_xp / XP_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

/// Streak after completing a quiz on `today`.
///
/// - last quiz yesterday: streak grows by one
/// - last quiz today: unchanged (never below 1)
/// - anything else (no history, a gap, or a date in the future): restart at 1
#[must_use]
pub fn next_streak(current: u32, last_quiz_date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_quiz_date {
        Some(last) if last == today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    }
}

/// Per-user gamification state: XP, level, and the daily streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    user_id: UserId,
    total_xp: u64,
    level: u32,
    current_streak: u32,
    last_quiz_date: Option<NaiveDate>,
    #[serde(skip)]
    version: u64,
}

impl UserProfile {
    /// Fresh profile for a user who has never completed a quiz.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            total_xp: 0,
            level: 1,
            current_streak: 0,
            last_quiz_date: None,
            version: 0,
        }
    }

    /// Rehydrate a profile from storage. The level is always derived from XP.
    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        total_xp: u64,
        current_streak: u32,
        last_quiz_date: Option<NaiveDate>,
        version: u64,
    ) -> Self {
        Self {
            user_id,
            total_xp,
            level: level_for_xp(total_xp),
            current_streak,
            last_quiz_date,
            version,
        }
    }

    /// Apply one completed quiz: add XP, re-derive level, and roll the streak.
    pub fn record_quiz(&mut self, xp_earned: u32, today: NaiveDate) {
        self.total_xp = self.total_xp.saturating_add(u64::from(xp_earned));
        self.level = level_for_xp(self.total_xp);
        self.current_streak = next_streak(self.current_streak, self.last_quiz_date, today);
        self.last_quiz_date = Some(today);
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn total_xp(&self) -> u64 {
        self.total_xp
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    #[must_use]
    pub fn last_quiz_date(&self) -> Option<NaiveDate> {
        self.last_quiz_date
    }

    /// Optimistic-concurrency token; 0 means "never stored".
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}
