use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown achievement kind: {0}")]
pub struct ParseAchievementKindError(pub String);

/// Every badge the engine knows how to award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    WeekStreak,
    Sharpshooter,
    Centurion,
}

impl AchievementKind {
    pub const ALL: [AchievementKind; 3] = [
        AchievementKind::WeekStreak,
        AchievementKind::Sharpshooter,
        AchievementKind::Centurion,
    ];

    /// Stable identifier, used as the storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementKind::WeekStreak => "week_streak",
            AchievementKind::Sharpshooter => "sharpshooter",
            AchievementKind::Centurion => "centurion",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            AchievementKind::WeekStreak => "7-Day Streak",
            AchievementKind::Sharpshooter => "Sharpshooter",
            AchievementKind::Centurion => "100 Questions",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            AchievementKind::WeekStreak => "Complete a quiz on 7 consecutive days",
            AchievementKind::Sharpshooter => "Reach 90% accuracy on a certification",
            AchievementKind::Centurion => "Answer 100 questions on a certification",
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementKind {
    type Err = ParseAchievementKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseAchievementKindError(s.to_owned()))
    }
}

/// A badge held by a user. At most one per `(user, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    user_id: UserId,
    kind: AchievementKind,
    earned_at: DateTime<Utc>,
}

impl Achievement {
    #[must_use]
    pub fn new(user_id: UserId, kind: AchievementKind, earned_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind,
            earned_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn kind(&self) -> AchievementKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        self.kind.description()
    }

    #[must_use]
    pub fn earned_at(&self) -> DateTime<Utc> {
        self.earned_at
    }
}
