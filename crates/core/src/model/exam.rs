use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{ExamId, QuestionId};
use crate::model::question::{Question, QuestionError};
use crate::scoring::div_round_half_up;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam name cannot be empty")]
    EmptyName,

    #[error("exam subject cannot be empty")]
    EmptySubject,

    #[error("time limit must be at least one minute")]
    InvalidTimeLimit,

    #[error("exam has no questions")]
    NoQuestions,

    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(QuestionId),

    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Denormalized attempt statistics kept on each exam.
///
/// Only the catalog updates these, by folding over every recorded attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamStats {
    pub total_attempts: u32,
    pub best_score: u32,
    pub avg_score: u32,
}

impl ExamStats {
    /// Folds attempt percentages into stats.
    ///
    /// `best_score` is 0 when there are no attempts; `avg_score` is the mean
    /// rounded half up.
    #[must_use]
    pub fn from_scores(scores: &[u32]) -> Self {
        let total_attempts = u32::try_from(scores.len()).unwrap_or(u32::MAX);
        let best_score = scores.iter().copied().max().unwrap_or(0);
        let sum: u64 = scores.iter().map(|s| u64::from(*s)).sum();
        let avg = div_round_half_up(sum, scores.len() as u64);
        Self {
            total_attempts,
            best_score,
            avg_score: u32::try_from(avg).unwrap_or(u32::MAX),
        }
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// An exam definition owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    id: ExamId,
    name: String,
    subject: String,
    time_limit_minutes: u32,
    questions: Vec<Question>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    stats: ExamStats,
    #[serde(default)]
    is_bookmarked: bool,
}

impl Exam {
    /// Creates a validated exam with empty stats.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` when the name, subject, time limit or question list
    /// is invalid.
    pub fn new(
        id: ExamId,
        name: impl Into<String>,
        subject: impl Into<String>,
        time_limit_minutes: u32,
        questions: Vec<Question>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ExamError> {
        Self::from_persisted(
            id,
            name,
            subject,
            time_limit_minutes,
            questions,
            created_at,
            ExamStats::default(),
            false,
        )
    }

    /// Rehydrate an exam from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` if the stored definition no longer validates.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ExamId,
        name: impl Into<String>,
        subject: impl Into<String>,
        time_limit_minutes: u32,
        questions: Vec<Question>,
        created_at: DateTime<Utc>,
        stats: ExamStats,
        is_bookmarked: bool,
    ) -> Result<Self, ExamError> {
        let exam = Self {
            id,
            name: name.into(),
            subject: subject.into(),
            time_limit_minutes,
            questions,
            created_at,
            stats,
            is_bookmarked,
        };
        exam.validate()?;
        Ok(exam)
    }

    /// Checks every invariant of the definition.
    ///
    /// Exams can arrive through deserialization, so sessions call this again
    /// before binding one.
    ///
    /// # Errors
    ///
    /// Returns the first `ExamError` found.
    pub fn validate(&self) -> Result<(), ExamError> {
        if self.name.trim().is_empty() {
            return Err(ExamError::EmptyName);
        }
        if self.subject.trim().is_empty() {
            return Err(ExamError::EmptySubject);
        }
        if self.time_limit_minutes == 0 {
            return Err(ExamError::InvalidTimeLimit);
        }
        if self.questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        for (index, question) in self.questions.iter().enumerate() {
            question
                .validate()
                .map_err(|source| ExamError::InvalidQuestion { index, source })?;
            if !seen.insert(question.id()) {
                return Err(ExamError::DuplicateQuestionId(question.id().clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    /// Time limit in seconds, the starting value of the countdown.
    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn stats(&self) -> ExamStats {
        self.stats
    }

    #[must_use]
    pub fn is_bookmarked(&self) -> bool {
        self.is_bookmarked
    }

    /// Returns a copy of this exam under a new id, e.g. after the store assigned one.
    #[must_use]
    pub fn with_id(mut self, id: ExamId) -> Self {
        self.id = id;
        self
    }

    pub fn set_stats(&mut self, stats: ExamStats) {
        self.stats = stats;
    }

    pub fn set_bookmarked(&mut self, bookmarked: bool) {
        self.is_bookmarked = bookmarked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn question(id: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["A".into(), "B".into()],
            "A",
            "General",
            None,
        )
        .unwrap()
    }

    #[test]
    fn new_exam_starts_with_empty_stats() {
        let exam = Exam::new(
            ExamId::new(1),
            "Budgeting",
            "Finance",
            30,
            vec![question("q1"), question("q2")],
            fixed_now(),
        )
        .unwrap();
        assert_eq!(exam.question_count(), 2);
        assert_eq!(exam.time_limit_secs(), 1800);
        assert_eq!(exam.stats(), ExamStats::default());
        assert!(!exam.is_bookmarked());
    }

    #[test]
    fn rejects_empty_question_list() {
        let err = Exam::new(ExamId::new(1), "E", "S", 10, Vec::new(), fixed_now()).unwrap_err();
        assert_eq!(err, ExamError::NoQuestions);
    }

    #[test]
    fn rejects_zero_time_limit() {
        let err = Exam::new(ExamId::new(1), "E", "S", 0, vec![question("q1")], fixed_now())
            .unwrap_err();
        assert_eq!(err, ExamError::InvalidTimeLimit);
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let err = Exam::new(
            ExamId::new(1),
            "E",
            "S",
            10,
            vec![question("q1"), question("q1")],
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ExamError::DuplicateQuestionId(QuestionId::new("q1")));
    }

    #[test]
    fn validate_catches_malformed_deserialized_exam() {
        let json = serde_json::json!({
            "id": 3,
            "name": "Broken",
            "subject": "S",
            "time_limit_minutes": 5,
            "questions": [{
                "id": "q1",
                "text": "?",
                "options": ["A", "B"],
                "correct_answer": "Z",
                "category": "C"
            }],
            "created_at": "2023-11-14T22:13:20Z"
        });
        let exam: Exam = serde_json::from_value(json).unwrap();
        let err = exam.validate().unwrap_err();
        assert!(matches!(
            err,
            ExamError::InvalidQuestion {
                index: 0,
                source: QuestionError::CorrectAnswerNotAnOption
            }
        ));
    }

    #[test]
    fn stats_fold_scores() {
        let stats = ExamStats::from_scores(&[50, 75, 100]);
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.best_score, 100);
        assert_eq!(stats.avg_score, 75);

        // 50 + 51 = 101 / 2 = 50.5 rounds up
        let stats = ExamStats::from_scores(&[50, 51]);
        assert_eq!(stats.avg_score, 51);
    }

    #[test]
    fn stats_for_no_attempts_are_zero() {
        assert_eq!(ExamStats::from_scores(&[]), ExamStats::default());
    }
}
