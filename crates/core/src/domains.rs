//! Weak-domain analysis.
//!
//! Per-certification accuracy is tracked for every domain label a learner has
//! seen. The weak set is never stored; it is recomputed from the counters after
//! each update, so a domain can leave the set again once accuracy recovers.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::grading::GradedQuestion;

/// A domain is weak when its accuracy is strictly below this percentage.
pub const WEAK_THRESHOLD_PERCENT: u32 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("correct answers ({correct}) exceed questions seen ({seen})")]
pub struct DomainAccuracyError {
    pub seen: u32,
    pub correct: u32,
}

/// Cumulative counters for one domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DomainAccuracy {
    seen: u32,
    correct: u32,
}

impl DomainAccuracy {
    /// # Errors
    ///
    /// Returns `DomainAccuracyError` if `correct > seen`.
    pub fn new(seen: u32, correct: u32) -> Result<Self, DomainAccuracyError> {
        if correct > seen {
            return Err(DomainAccuracyError { seen, correct });
        }
        Ok(Self { seen, correct })
    }

    pub fn record(&mut self, is_correct: bool) {
        self.seen = self.seen.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }

    #[must_use]
    pub fn seen(&self) -> u32 {
        self.seen
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Floored accuracy percentage; 0 for an unseen domain.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        if self.seen == 0 {
            return 0;
        }
        let pct = u64::from(self.correct) * 100 / u64::from(self.seen);
        u32::try_from(pct).unwrap_or(100)
    }

    /// `seen >= 1 && correct / seen < 0.60`, compared without floating point.
    #[must_use]
    pub fn is_weak(&self) -> bool {
        self.seen > 0
            && u64::from(self.correct) * 100
                < u64::from(self.seen) * u64::from(WEAK_THRESHOLD_PERCENT)
    }
}

/// A weak domain with its current (floored) accuracy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeakDomain {
    pub name: String,
    pub accuracy: u32,
}

/// Typed domain → accuracy map for one (user, certification) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DomainStats(BTreeMap<String, DomainAccuracy>);

impl DomainStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: impl Into<String>, accuracy: DomainAccuracy) {
        self.0.insert(domain.into(), accuracy);
    }

    pub fn record(&mut self, domain: &str, is_correct: bool) {
        self.0
            .entry(domain.to_owned())
            .or_default()
            .record(is_correct);
    }

    #[must_use]
    pub fn get(&self, domain: &str) -> Option<&DomainAccuracy> {
        self.0.get(domain)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DomainAccuracy)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Weak domains in name order, recomputed from the counters.
    #[must_use]
    pub fn weak_domains(&self) -> Vec<WeakDomain> {
        self.0
            .iter()
            .filter(|(_, acc)| acc.is_weak())
            .map(|(name, acc)| WeakDomain {
                name: name.clone(),
                accuracy: acc.accuracy_percent(),
            })
            .collect()
    }
}

/// Fold a graded quiz into the cumulative map and return the new weak set.
pub fn update(stats: &mut DomainStats, graded: &[GradedQuestion]) -> Vec<WeakDomain> {
    for question in graded {
        stats.record(&question.domain, question.is_correct);
    }
    stats.weak_domains()
}
