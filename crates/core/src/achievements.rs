//! Rule-table achievement engine.
//!
//! Rules are checked in table order against the state *after* a quiz has been
//! folded in. Kinds the user already holds are skipped, so each unlock is
//! reported exactly once.

use std::collections::HashSet;

use crate::model::{AchievementKind, UserProfile, UserProgress};

pub const WEEK_STREAK_DAYS: u32 = 7;
pub const SHARPSHOOTER_ACCURACY_PERCENT: u32 = 90;
pub const CENTURION_QUESTIONS: u32 = 100;

pub type AchievementPredicate = fn(&UserProfile, &UserProgress) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct AchievementRule {
    pub kind: AchievementKind,
    pub predicate: AchievementPredicate,
}

fn week_streak(profile: &UserProfile, _: &UserProgress) -> bool {
    profile.current_streak() >= WEEK_STREAK_DAYS
}

fn sharpshooter(_: &UserProfile, progress: &UserProgress) -> bool {
    let answered = progress.total_questions_answered();
    answered > 0
        && u64::from(progress.correct_answers()) * 100
            >= u64::from(answered) * u64::from(SHARPSHOOTER_ACCURACY_PERCENT)
}

fn centurion(_: &UserProfile, progress: &UserProgress) -> bool {
    progress.total_questions_answered() >= CENTURION_QUESTIONS
}

pub const DEFAULT_RULES: &[AchievementRule] = &[
    AchievementRule {
        kind: AchievementKind::WeekStreak,
        predicate: week_streak,
    },
    AchievementRule {
        kind: AchievementKind::Sharpshooter,
        predicate: sharpshooter,
    },
    AchievementRule {
        kind: AchievementKind::Centurion,
        predicate: centurion,
    },
];

#[derive(Debug, Clone)]
pub struct AchievementEngine {
    rules: Vec<AchievementRule>,
}

impl Default for AchievementEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AchievementEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }

    #[must_use]
    pub fn with_rules(rules: Vec<AchievementRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[AchievementRule] {
        &self.rules
    }

    /// Newly satisfied kinds, in rule order, each at most once.
    #[must_use]
    pub fn evaluate(
        &self,
        profile: &UserProfile,
        progress: &UserProgress,
        earned: &HashSet<AchievementKind>,
    ) -> Vec<AchievementKind> {
        let mut unlocked = Vec::new();
        for rule in &self.rules {
            if earned.contains(&rule.kind) || unlocked.contains(&rule.kind) {
                continue;
            }
            if (rule.predicate)(profile, progress) {
                unlocked.push(rule.kind);
            }
        }
        unlocked
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domains::DomainStats;
    use crate::model::{CertificationId, Difficulty, UserId};

    fn profile(streak: u32) -> UserProfile {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        UserProfile::from_persisted(UserId::generate(), 0, streak, Some(day), 1)
    }

    fn progress(answered: u32, correct: u32) -> UserProgress {
        UserProgress::from_persisted(
            UserId::generate(),
            CertificationId::generate(),
            0,
            1,
            answered,
            correct,
            Difficulty::Easy,
            DomainStats::new(),
            None,
            1,
        )
        .unwrap()
    }

    #[test]
    fn nothing_unlocks_for_a_fresh_learner() {
        let engine = AchievementEngine::new();
        assert!(
            engine
                .evaluate(&profile(1), &progress(0, 0), &HashSet::new())
                .is_empty()
        );
    }

    #[test]
    fn all_default_rules_in_table_order() {
        let engine = AchievementEngine::new();
        let unlocked = engine.evaluate(&profile(7), &progress(100, 95), &HashSet::new());
        assert_eq!(
            unlocked,
            vec![
                AchievementKind::WeekStreak,
                AchievementKind::Sharpshooter,
                AchievementKind::Centurion
            ]
        );
    }

    #[test]
    fn earned_kinds_are_skipped() {
        let engine = AchievementEngine::new();
        let earned = HashSet::from([AchievementKind::WeekStreak]);
        assert!(engine.evaluate(&profile(8), &progress(3, 1), &earned).is_empty());
    }

    #[test]
    fn sharpshooter_boundary() {
        let engine = AchievementEngine::new();
        let hit = engine.evaluate(&profile(0), &progress(10, 9), &HashSet::new());
        let miss = engine.evaluate(&profile(0), &progress(11, 9), &HashSet::new());
        assert_eq!(hit, vec![AchievementKind::Sharpshooter]);
        assert!(miss.is_empty());
    }

    #[test]
    fn custom_rule_tables() {
        fn always(_: &UserProfile, _: &UserProgress) -> bool {
            true
        }
        let engine = AchievementEngine::with_rules(vec![
            AchievementRule {
                kind: AchievementKind::Centurion,
                predicate: always,
            },
            AchievementRule {
                kind: AchievementKind::Centurion,
                predicate: always,
            },
        ]);
        let unlocked = engine.evaluate(&profile(0), &progress(0, 0), &HashSet::new());
        assert_eq!(unlocked, vec![AchievementKind::Centurion]);
    }
}
