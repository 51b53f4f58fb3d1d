use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct answer is not one of the listed options")]
    CorrectAnswerNotAnOption,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question.
///
/// Immutable once built: the exam that owns it never rewrites its options or
/// its correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer: String,
    category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    year: Option<String>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id or text is blank, fewer than two
    /// options are given, an option is blank, or `correct_answer` is not one of
    /// the options.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        category: impl Into<String>,
        year: Option<String>,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            id,
            text: text.into(),
            options,
            correct_answer: correct_answer.into(),
            category: category.into(),
            year,
        };
        question.validate()?;
        Ok(question)
    }

    /// Re-checks the invariants of a question that may have been deserialized.
    ///
    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: self.options.len(),
            });
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if !self.options.contains(&self.correct_answer) {
            return Err(QuestionError::CorrectAnswerNotAnOption);
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
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
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    /// Exact comparison against the correct answer; no trimming or case folding.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }

    #[must_use]
    pub fn has_option(&self, answer: &str) -> bool {
        self.options.iter().any(|o| o == answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into()]
    }

    #[test]
    fn builds_valid_question() {
        let q = Question::new(QuestionId::new("q1"), "Pick B", options(), "B", "Letters", None)
            .unwrap();
        assert_eq!(q.options().len(), 3);
        assert!(q.is_correct("B"));
        assert!(!q.is_correct("b"));
        assert!(q.has_option("C"));
        assert_eq!(q.year(), None);
    }

    #[test]
    fn rejects_answer_outside_options() {
        let err = Question::new(QuestionId::new("q1"), "Pick D", options(), "D", "Letters", None)
            .unwrap_err();
        assert_eq!(err, QuestionError::CorrectAnswerNotAnOption);
    }

    #[test]
    fn rejects_blank_fields() {
        let err =
            Question::new(QuestionId::new(" "), "x", options(), "A", "c", None).unwrap_err();
        assert_eq!(err, QuestionError::EmptyId);

        let err =
            Question::new(QuestionId::new("q"), "  ", options(), "A", "c", None).unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);

        let err = Question::new(
            QuestionId::new("q"),
            "x",
            vec!["A".into(), String::new()],
            "A",
            "c",
            None,
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption { index: 1 });
    }

    #[test]
    fn rejects_single_option() {
        let err = Question::new(QuestionId::new("q"), "x", vec!["A".into()], "A", "c", None)
            .unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { count: 1 });
    }
}
