//! Next-tier recommendation from a quiz percentage.

use crate::model::Difficulty;

/// Percentage at or above which the learner moves up a tier.
pub const PROMOTE_AT_PERCENT: u32 = 80;
/// Percentage below which the learner moves down a tier.
pub const DEMOTE_BELOW_PERCENT: u32 = 50;

#[must_use]
pub fn next_difficulty(current: Difficulty, percentage: u32) -> Difficulty {
    if percentage >= PROMOTE_AT_PERCENT {
        current.harder()
    } else if percentage < DEMOTE_BELOW_PERCENT {
        current.easier()
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_at_both_ends() {
        assert_eq!(next_difficulty(Difficulty::Hard, 95), Difficulty::Hard);
        assert_eq!(next_difficulty(Difficulty::Easy, 10), Difficulty::Easy);
    }

    #[test]
    fn moves_one_tier_at_a_time() {
        assert_eq!(next_difficulty(Difficulty::Medium, 85), Difficulty::Hard);
        assert_eq!(next_difficulty(Difficulty::Medium, 30), Difficulty::Easy);
        assert_eq!(next_difficulty(Difficulty::Easy, 100), Difficulty::Medium);
    }

    #[test]
    fn thresholds_are_inclusive_and_exclusive() {
        assert_eq!(next_difficulty(Difficulty::Medium, 80), Difficulty::Hard);
        assert_eq!(next_difficulty(Difficulty::Medium, 79), Difficulty::Medium);
        assert_eq!(next_difficulty(Difficulty::Medium, 50), Difficulty::Medium);
        assert_eq!(next_difficulty(Difficulty::Medium, 49), Difficulty::Easy);
    }
}
