//! Question files: a JSON array of four-option questions.

use serde::Deserialize;

use exam_core::model::{Question, QuestionId};

use crate::error::ImportError;

/// One entry of a question file, as written by exam authors.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportedQuestion {
    pub question: String,
    pub option_1: String,
    pub option_2: String,
    pub option_3: String,
    pub option_4: String,
    pub correct_answer: String,
    #[serde(default)]
    pub question_year: Option<String>,
}

impl ImportedQuestion {
    fn check(&self, index: usize) -> Result<(), ImportError> {
        let fields = [
            ("question", &self.question),
            ("option_1", &self.option_1),
            ("option_2", &self.option_2),
            ("option_3", &self.option_3),
            ("option_4", &self.option_4),
            ("correct_answer", &self.correct_answer),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ImportError::EmptyField { index, field });
            }
        }
        Ok(())
    }

    /// Converts to a `Question` with a fresh id, filed under `category`.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Question` when the entry does not form a valid question.
    pub fn into_question(self, index: usize, category: &str) -> Result<Question, ImportError> {
        let year = self.question_year.filter(|y| !y.trim().is_empty());
        Question::new(
            QuestionId::generate(),
            self.question,
            vec![self.option_1, self.option_2, self.option_3, self.option_4],
            self.correct_answer,
            category,
            year,
        )
        .map_err(|source| ImportError::Question { index, source })
    }
}

/// Parses and checks a question file without converting it.
///
/// # Errors
///
/// Returns `ImportError::Json` for malformed input, `EmptyField` for a blank
/// required field and `NoQuestions` for an empty array.
pub fn parse_questions(json: &str) -> Result<Vec<ImportedQuestion>, ImportError> {
    let entries: Vec<ImportedQuestion> = serde_json::from_str(json)?;
    if entries.is_empty() {
        return Err(ImportError::NoQuestions);
    }
    for (index, entry) in entries.iter().enumerate() {
        entry.check(index)?;
    }
    Ok(entries)
}

/// Parses a question file into questions categorised by `subject`.
///
/// # Errors
///
/// See [`parse_questions`] and [`ImportedQuestion::into_question`].
pub fn import_questions(json: &str, subject: &str) -> Result<Vec<Question>, ImportError> {
    parse_questions(json)?
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.into_question(index, subject))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "question": "What is 2 + 2?",
            "option_1": "3",
            "option_2": "4",
            "option_3": "5",
            "option_4": "22",
            "correct_answer": "4",
            "question_year": "2021"
        },
        {
            "question": "Capital of France?",
            "option_1": "Paris",
            "option_2": "Rome",
            "option_3": "Berlin",
            "option_4": "Madrid",
            "correct_answer": "Paris"
        }
    ]"#;

    #[test]
    fn imports_questions_with_fresh_ids_and_subject_category() {
        let questions = import_questions(SAMPLE, "General").unwrap();
        assert_eq!(questions.len(), 2);
        assert_ne!(questions[0].id(), questions[1].id());
        assert_eq!(questions[0].options().len(), 4);
        assert_eq!(questions[0].correct_answer(), "4");
        assert_eq!(questions[0].year(), Some("2021"));
        assert_eq!(questions[1].year(), None);
        assert!(questions.iter().all(|q| q.category() == "General"));
    }

    #[test]
    fn rejects_blank_fields_with_position() {
        let json = r#"[{"question":"Q","option_1":"a","option_2":" ","option_3":"c","option_4":"d","correct_answer":"a"}]"#;
        let err = import_questions(json, "S").unwrap_err();
        assert!(matches!(
            err,
            ImportError::EmptyField {
                index: 0,
                field: "option_2"
            }
        ));
    }

    #[test]
    fn rejects_empty_list_and_bad_shapes() {
        assert!(matches!(
            import_questions("[]", "S"),
            Err(ImportError::NoQuestions)
        ));
        assert!(matches!(
            import_questions(r#"{"question":"Q"}"#, "S"),
            Err(ImportError::Json(_))
        ));
        assert!(matches!(
            import_questions(r#"[{"question":"Q","option_1":"a"}]"#, "S"),
            Err(ImportError::Json(_))
        ));
    }

    #[test]
    fn rejects_answer_outside_options() {
        let json = r#"[{"question":"Q","option_1":"a","option_2":"b","option_3":"c","option_4":"d","correct_answer":"e"}]"#;
        assert!(matches!(
            import_questions(json, "S"),
            Err(ImportError::Question { index: 0, .. })
        ));
    }
}
