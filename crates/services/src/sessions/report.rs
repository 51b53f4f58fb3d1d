use exam_core::ExamSession;
use exam_core::model::QuestionId;
use exam_core::scoring::{self, AnswerStatus, CategoryPerformance, ExamResults};

use crate::error::SessionError;

/// One row of the answer review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub index: usize,
    pub question_id: QuestionId,
    pub text: String,
    /// `None` when skipped or never answered.
    pub selected: Option<String>,
    pub correct_answer: String,
    pub status: AnswerStatus,
    /// Whole seconds spent on the question, rounded.
    pub time_spent_secs: u64,
}

/// Everything the results screen shows for a submitted session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsReport {
    pub exam_name: String,
    pub results: ExamResults,
    pub questions: Vec<QuestionReview>,
    pub categories: Vec<CategoryPerformance>,
}

impl ResultsReport {
    /// Builds the report for a session on the results screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` unless the session has results.
    pub fn from_session(session: &ExamSession) -> Result<Self, SessionError> {
        let results = session.results().ok_or(SessionError::NotSubmitted)?.clone();
        let exam = session.exam();
        let answers = session.answers();
        let skipped = session.skipped();
        let times = session.time_per_question();

        let questions = exam
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let is_skipped = skipped.get(index).copied().unwrap_or(false);
                let selected = if is_skipped {
                    None
                } else {
                    answers.get(index).cloned().flatten()
                };
                QuestionReview {
                    index,
                    question_id: question.id().clone(),
                    text: question.text().to_owned(),
                    status: scoring::classify(question, selected.as_deref(), is_skipped),
                    selected,
                    correct_answer: question.correct_answer().to_owned(),
                    time_spent_secs: whole_secs(times.get(index).copied().unwrap_or(0.0)),
                }
            })
            .collect();

        let categories = scoring::category_breakdown(exam, answers, skipped)
            .map_err(exam_core::ExamSessionError::from)?;

        Ok(Self {
            exam_name: exam.name().to_owned(),
            results,
            questions,
            categories,
        })
    }

    /// Total time as `M:SS`.
    #[must_use]
    pub fn formatted_time(&self) -> String {
        format_duration(self.results.time_spent_secs)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_secs(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    }
}

/// `M:SS` with unpadded minutes, e.g. `0:07` or `12:30`.
#[must_use]
pub fn format_duration(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
