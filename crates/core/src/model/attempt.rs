use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExamId, QuestionId};
use crate::model::Exam;
use crate::scoring::ExamResults;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("score {0} is outside 0..=100")]
    InvalidScore(u32),

    #[error("answered questions ({answered}) exceed total questions ({total})")]
    AnsweredExceedsTotal { answered: u32, total: u32 },

    #[error("time spent must be a finite, non-negative number of seconds")]
    InvalidTimeSpent,
}

/// The answer recorded for one question at submission time.
///
/// `answer` is `None` when the question was skipped or never answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub answer: Option<String>,
}

/// A completed pass through an exam, as handed to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamAttempt {
    exam_id: ExamId,
    date: DateTime<Utc>,
    score: u32,
    time_spent_secs: f64,
    answered_questions: u32,
    total_questions: u32,
    submitted_answers: Vec<SubmittedAnswer>,
}

impl ExamAttempt {
    /// Builds the attempt record for a submitted exam.
    ///
    /// Skipped questions are submitted as `None` regardless of any answer left
    /// in their slot, matching how they were scored.
    #[must_use]
    pub fn from_results(
        exam: &Exam,
        date: DateTime<Utc>,
        results: &ExamResults,
        answers: &[Option<String>],
        skipped: &[bool],
    ) -> Self {
        let submitted_answers = exam
            .questions()
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let is_skipped = skipped.get(i).copied().unwrap_or(false);
                let answer = if is_skipped {
                    None
                } else {
                    answers.get(i).cloned().flatten()
                };
                SubmittedAnswer {
                    question_id: q.id().clone(),
                    answer,
                }
            })
            .collect();

        Self {
            exam_id: exam.id(),
            date,
            score: results.percentage,
            time_spent_secs: results.time_spent_secs,
            answered_questions: results.answered_count(),
            total_questions: results.max_score,
            submitted_answers,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the stored values are inconsistent.
    pub fn from_persisted(
        exam_id: ExamId,
        date: DateTime<Utc>,
        score: u32,
        time_spent_secs: f64,
        answered_questions: u32,
        total_questions: u32,
        submitted_answers: Vec<SubmittedAnswer>,
    ) -> Result<Self, AttemptError> {
        if score > 100 {
            return Err(AttemptError::InvalidScore(score));
        }
        if answered_questions > total_questions {
            return Err(AttemptError::AnsweredExceedsTotal {
                answered: answered_questions,
                total: total_questions,
            });
        }
        if !time_spent_secs.is_finite() || time_spent_secs < 0.0 {
            return Err(AttemptError::InvalidTimeSpent);
        }
        Ok(Self {
            exam_id,
            date,
            score,
            time_spent_secs,
            answered_questions,
            total_questions,
            submitted_answers,
        })
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Percentage score, 0..=100.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> f64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn answered_questions(&self) -> u32 {
        self.answered_questions
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn submitted_answers(&self) -> &[SubmittedAnswer] {
        &self.submitted_answers
    }
}
