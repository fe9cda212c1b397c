use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use quiz_core::achievements::AchievementEngine;
use quiz_core::difficulty::next_difficulty;
use quiz_core::grading::{GradedQuestion, grade};
use quiz_core::model::{
    Achievement, AchievementKind, QuestionOutcome, QuizAttempt, SubmittedAnswers, UserProfile,
    UserProgress,
};
use quiz_core::scoring::aggregate;
use storage::repository::EvaluationCommit;

use super::view::{EvaluationResult, QuestionResult, UnlockedAchievement};
use crate::error::EvaluationError;

/// State read from storage for one evaluation attempt.
#[derive(Debug, Clone)]
pub(crate) struct LoadedState {
    pub quiz: QuizAttempt,
    pub profile: UserProfile,
    pub progress: UserProgress,
    pub earned: HashSet<AchievementKind>,
}

/// The writes an evaluation needs, and what to report once they land.
#[derive(Debug, Clone)]
pub(crate) struct EvaluationPlan {
    pub commit: EvaluationCommit,
    pub result: EvaluationResult,
}

/// Grade, score, and fold a quiz into the loaded state without touching storage.
pub(crate) fn plan_evaluation(
    state: LoadedState,
    answers: &SubmittedAnswers,
    engine: &AchievementEngine,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Result<EvaluationPlan, EvaluationError> {
    let LoadedState {
        mut quiz,
        mut profile,
        mut progress,
        earned,
    } = state;

    if quiz.is_completed() {
        return Err(EvaluationError::QuizAlreadyEvaluated);
    }

    let mut graded = Vec::with_capacity(quiz.questions().len());
    let mut normalized = Vec::with_capacity(quiz.questions().len());
    for question in quiz.questions() {
        let submitted = answers
            .get(&question.id())
            .ok_or(EvaluationError::MissingAnswer(question.id()))?;
        let result = grade(question.key(), submitted);
        graded.push(GradedQuestion::new(question, result.is_correct));
        normalized.push(result.normalized_answer);
    }

    let score = aggregate(&graded)?;
    let summary = score.summary;

    let outcomes: Vec<QuestionOutcome> = normalized
        .into_iter()
        .zip(&graded)
        .zip(&score.per_question_xp)
        .map(|((submitted, g), xp)| QuestionOutcome {
            submitted,
            is_correct: g.is_correct,
            xp_earned: *xp,
        })
        .collect();

    let prior_difficulty = progress.current_difficulty();
    let weak = progress.record_quiz(&summary, &graded, now);
    let next = next_difficulty(prior_difficulty, summary.percentage);
    progress.set_current_difficulty(next);

    profile.record_quiz(summary.xp_earned, today);

    let unlocked = engine.evaluate(&profile, &progress, &earned);
    tracing::debug!(
        score = summary.score,
        total = summary.total,
        weak = weak.len(),
        ?prior_difficulty,
        ?next,
        "planned evaluation"
    );

    quiz.complete(outcomes, summary, now)?;

    let results = quiz
        .questions()
        .iter()
        .filter_map(|q| {
            q.outcome().map(|outcome| QuestionResult {
                question_id: q.id(),
                is_correct: outcome.is_correct,
                user_answer: outcome.submitted.clone(),
                correct_answer: q.key().expected(),
                explanation: q.explanation().map(str::to_owned),
                xp_earned: outcome.xp_earned,
            })
        })
        .collect();

    let result = EvaluationResult {
        quiz_id: quiz.id(),
        score: summary.score,
        total_questions: summary.total,
        percentage: summary.percentage,
        xp_earned: summary.xp_earned,
        completed_at: now,
        results,
        weak_domains: weak.into_iter().map(|w| w.name).collect(),
        next_difficulty: next,
        newly_unlocked_achievements: unlocked
            .iter()
            .copied()
            .map(UnlockedAchievement::from)
            .collect(),
        total_xp: profile.total_xp(),
        level: profile.level(),
        current_streak: profile.current_streak(),
    };

    let achievements = unlocked
        .into_iter()
        .map(|kind| Achievement::new(profile.user_id(), kind, now))
        .collect();

    Ok(EvaluationPlan {
        commit: EvaluationCommit {
            quiz,
            profile,
            progress,
            achievements,
        },
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{
        AnswerKey, CertificationId, Difficulty, QuestionId, QuestionRecord, QuizId,
        SubmittedAnswer, UserId,
    };
    use quiz_core::time::fixed_now;

    fn question(domain: &str, difficulty: Difficulty) -> QuestionRecord {
        QuestionRecord::new(
            QuestionId::generate(),
            "CloudFront is a CDN.",
            Vec::new(),
            AnswerKey::TrueFalse(true),
            None,
            domain,
            difficulty,
        )
        .unwrap()
    }

    fn state(questions: Vec<QuestionRecord>, difficulty: Difficulty) -> LoadedState {
        let user = UserId::generate();
        let cert = CertificationId::generate();
        let quiz = QuizAttempt::new(
            QuizId::generate(),
            user,
            cert,
            difficulty,
            questions,
            fixed_now(),
        )
        .unwrap();
        LoadedState {
            quiz,
            profile: UserProfile::new(user),
            progress: UserProgress::new(user, cert, difficulty),
            earned: HashSet::new(),
        }
    }

    fn answer_all(quiz: &QuizAttempt, correct: usize) -> SubmittedAnswers {
        quiz.questions()
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id(), SubmittedAnswer::Text(if i < correct { "True" } else { "false" }.into())))
            .collect()
    }

    #[test]
    fn four_of_five_medium_promotes_to_hard() {
        let loaded = state(
            (0..5).map(|_| question("Networking", Difficulty::Medium)).collect(),
            Difficulty::Medium,
        );
        let answers = answer_all(&loaded.quiz, 4);
        let plan = plan_evaluation(
            loaded,
            &answers,
            &AchievementEngine::new(),
            fixed_now(),
            fixed_now().date_naive(),
        )
        .unwrap();

        let r = &plan.result;
        assert_eq!((r.score, r.total_questions, r.percentage, r.xp_earned), (4, 5, 80, 80));
        assert_eq!(r.next_difficulty, Difficulty::Hard);
        assert!(r.weak_domains.is_empty());
        assert_eq!(r.total_xp, 80);
        assert_eq!(r.level, 1);
        assert_eq!(r.current_streak, 1);
        assert_eq!(r.results[0].user_answer, SubmittedAnswer::Flag(true));
        assert_eq!(r.results[0].correct_answer, SubmittedAnswer::Flag(true));
        assert_eq!(r.results[4].xp_earned, 0);

        assert!(plan.commit.quiz.is_completed());
        assert_eq!(plan.commit.progress.current_difficulty(), Difficulty::Hard);
        assert_eq!(plan.commit.progress.total_questions_answered(), 5);
        assert_eq!(plan.commit.profile.version(), 0);
    }

    #[test]
    fn missing_answer_fails_before_anything_changes() {
        let loaded = state(
            vec![question("IAM", Difficulty::Easy), question("IAM", Difficulty::Easy)],
            Difficulty::Easy,
        );
        let missing = loaded.quiz.questions()[1].id();
        let mut answers = answer_all(&loaded.quiz, 2);
        answers.remove(&missing);

        let err = plan_evaluation(
            loaded,
            &answers,
            &AchievementEngine::new(),
            fixed_now(),
            fixed_now().date_naive(),
        )
        .unwrap_err();
        assert!(matches!(err, EvaluationError::MissingAnswer(id) if id == missing));
    }

    #[test]
    fn extra_answers_are_ignored() {
        let loaded = state(vec![question("S3", Difficulty::Hard)], Difficulty::Hard);
        let mut answers = answer_all(&loaded.quiz, 1);
        answers.insert(QuestionId::generate(), SubmittedAnswer::Flag(false));

        let plan = plan_evaluation(
            loaded,
            &answers,
            &AchievementEngine::new(),
            fixed_now(),
            fixed_now().date_naive(),
        )
        .unwrap();
        assert_eq!(plan.result.results.len(), 1);
        assert_eq!(plan.result.xp_earned, 30);
    }

    #[test]
    fn completed_quiz_is_rejected() {
        let loaded = state(vec![question("S3", Difficulty::Easy)], Difficulty::Easy);
        let answers = answer_all(&loaded.quiz, 1);
        let first = plan_evaluation(
            loaded.clone(),
            &answers,
            &AchievementEngine::new(),
            fixed_now(),
            fixed_now().date_naive(),
        )
        .unwrap();

        let again = LoadedState {
            quiz: first.commit.quiz,
            ..loaded
        };
        let err = plan_evaluation(
            again,
            &answers,
            &AchievementEngine::new(),
            fixed_now() + Duration::minutes(1),
            fixed_now().date_naive(),
        )
        .unwrap_err();
        assert!(matches!(err, EvaluationError::QuizAlreadyEvaluated));
    }

    #[test]
    fn failing_quiz_reports_weak_domain_and_demotes() {
        let loaded = state(
            vec![
                question("VPC", Difficulty::Medium),
                question("VPC", Difficulty::Medium),
                question("IAM", Difficulty::Medium),
            ],
            Difficulty::Medium,
        );
        let answers = answer_all(&loaded.quiz, 1);
        let plan = plan_evaluation(
            loaded,
            &answers,
            &AchievementEngine::new(),
            fixed_now(),
            fixed_now().date_naive(),
        )
        .unwrap();

        assert_eq!(plan.result.percentage, 33);
        assert_eq!(plan.result.weak_domains, vec!["IAM".to_owned(), "VPC".to_owned()]);
        assert_eq!(plan.result.next_difficulty, Difficulty::Easy);
    }

    #[test]
    fn unlocked_achievements_become_commit_rows() {
        let loaded = state(vec![question("EC2", Difficulty::Easy)], Difficulty::Easy);
        let answers = answer_all(&loaded.quiz, 1);
        let plan = plan_evaluation(
            loaded,
            &answers,
            &AchievementEngine::new(),
            fixed_now(),
            fixed_now().date_naive(),
        )
        .unwrap();

        let kinds: Vec<_> = plan
            .result
            .newly_unlocked_achievements
            .iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(kinds, vec![AchievementKind::Sharpshooter]);
        assert_eq!(plan.commit.achievements.len(), 1);
        assert_eq!(plan.commit.achievements[0].earned_at(), fixed_now());
    }
}
