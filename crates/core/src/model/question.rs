use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::answer::{AnswerKey, SubmittedAnswer};
use crate::model::ids::QuestionId;
use crate::model::tier::Difficulty;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("unknown question type: {0}")]
    UnknownType(String),

    #[error("malformed {question_type} answer key: {reason}")]
    MalformedKey {
        question_type: QuestionType,
        reason: &'static str,
    },

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question domain cannot be empty")]
    EmptyDomain,

    #[error("{0} question has no options")]
    MissingOptions(QuestionType),
}

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionType {
    SingleSelect,
    MultiSelect,
    TrueFalse,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::SingleSelect => "single_select",
            QuestionType::MultiSelect => "multi_select",
            QuestionType::TrueFalse => "true_false",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // "multiple_choice" is what the generator has always emitted for single answers.
            "single_select" | "multiple_choice" => Ok(QuestionType::SingleSelect),
            "multi_select" => Ok(QuestionType::MultiSelect),
            "true_false" => Ok(QuestionType::TrueFalse),
            other => Err(QuestionError::UnknownType(other.to_owned())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Question exactly as handed over by the quiz generator, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionDraft {
    #[serde(alias = "question_text")]
    pub text: String,
    pub question_type: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Value,
    #[serde(default)]
    pub explanation: Option<String>,
    pub domain: String,
    pub difficulty: Difficulty,
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Grading outcome recorded on a question once its quiz is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub submitted: SubmittedAnswer,
    pub is_correct: bool,
    pub xp_earned: u32,
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// A question belonging to exactly one quiz attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRecord {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    key: AnswerKey,
    explanation: Option<String>,
    domain: String,
    difficulty: Difficulty,
    outcome: Option<QuestionOutcome>,
}

impl QuestionRecord {
    /// Create an unanswered question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if text or domain are blank, or a select question
    /// has no options.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        key: AnswerKey,
        explanation: Option<String>,
        domain: impl Into<String>,
        difficulty: Difficulty,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let domain = domain.into().trim().to_owned();
        if domain.is_empty() {
            return Err(QuestionError::EmptyDomain);
        }
        let question_type = key.question_type();
        if question_type != QuestionType::TrueFalse && options.is_empty() {
            return Err(QuestionError::MissingOptions(question_type));
        }

        Ok(Self {
            id,
            text,
            options,
            key,
            explanation: explanation.filter(|e| !e.trim().is_empty()),
            domain,
            difficulty,
            outcome: None,
        })
    }

    /// Validate a generator draft and assign it the given id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownType` for unsupported types, or any
    /// validation error from [`QuestionRecord::new`].
    pub fn from_draft(id: QuestionId, draft: QuestionDraft) -> Result<Self, QuestionError> {
        let key = AnswerKey::from_parts(&draft.question_type, &draft.correct_answer)?;
        Self::new(
            id,
            draft.text,
            draft.options,
            key,
            draft.explanation,
            draft.domain,
            draft.difficulty,
        )
    }

    /// Rehydrate a question (and its outcome, if graded) from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted fields fail validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        text: String,
        options: Vec<String>,
        key: AnswerKey,
        explanation: Option<String>,
        domain: String,
        difficulty: Difficulty,
        outcome: Option<QuestionOutcome>,
    ) -> Result<Self, QuestionError> {
        let mut question = Self::new(id, text, options, key, explanation, domain, difficulty)?;
        question.outcome = outcome;
        Ok(question)
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.key.question_type()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&QuestionOutcome> {
        self.outcome.as_ref()
    }

    pub(crate) fn set_outcome(&mut self, outcome: QuestionOutcome) {
        self.outcome = Some(outcome);
    }
}
