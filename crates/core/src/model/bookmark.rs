use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ExamId;
use crate::model::{Exam, Question};

/// A question saved for later review, detached from its exam.
///
/// The question is stored as a snapshot so the bookmark survives edits to,
/// or removal of, the exam it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkedQuestion {
    exam_id: ExamId,
    exam_name: String,
    question: Question,
    bookmarked_at: DateTime<Utc>,
}

impl BookmarkedQuestion {
    #[must_use]
    pub fn new(
        exam_id: ExamId,
        exam_name: impl Into<String>,
        question: Question,
        bookmarked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            exam_id,
            exam_name: exam_name.into(),
            question,
            bookmarked_at,
        }
    }

    /// Snapshot of `exam.questions()[index]`, or `None` if out of range.
    #[must_use]
    pub fn from_exam(exam: &Exam, index: usize, bookmarked_at: DateTime<Utc>) -> Option<Self> {
        exam.question(index)
            .map(|q| Self::new(exam.id(), exam.name(), q.clone(), bookmarked_at))
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn exam_name(&self) -> &str {
        &self.exam_name
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    #[must_use]
    pub fn bookmarked_at(&self) -> DateTime<Utc> {
        self.bookmarked_at
    }
}
