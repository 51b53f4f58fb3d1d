//! Turns recorded answers into a results summary.
//!
//! Everything here is a pure function of its inputs: no clock, no storage, and
//! the exam definition is only ever borrowed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::{Exam, Question};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error(
        "answer sheet does not match the exam: {questions} questions, {answers} answers, {skipped} skip flags"
    )]
    LengthMismatch {
        questions: usize,
        answers: usize,
        skipped: usize,
    },
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// How a single question ended up once the exam was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    /// Explicitly skipped, or never answered at all.
    Skipped,
}

/// Classifies one question.
///
/// An explicit skip wins over a stale answer left in the slot.
#[must_use]
pub fn classify(question: &Question, answer: Option<&str>, skipped: bool) -> AnswerStatus {
    if skipped {
        return AnswerStatus::Skipped;
    }
    match answer {
        Some(answer) if question.is_correct(answer) => AnswerStatus::Correct,
        Some(_) => AnswerStatus::Incorrect,
        None => AnswerStatus::Skipped,
    }
}

//
// ─── MASTERY ───────────────────────────────────────────────────────────────────
//

/// Coarse band derived from the percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MasteryLevel {
    Beginner,
    Basic,
    Intermediate,
    Advanced,
}

impl MasteryLevel {
    /// Lower bounds are inclusive: 80 is `Advanced`, 79 is `Intermediate`.
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            Self::Advanced
        } else if percentage >= 60 {
            Self::Intermediate
        } else if percentage >= 40 {
            Self::Basic
        } else {
            Self::Beginner
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Immutable snapshot produced when an exam is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResults {
    pub score: u32,
    pub max_score: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub skipped_count: u32,
    /// `round_half_up(100 * score / max_score)`.
    pub percentage: u32,
    /// Wall-clock session duration in seconds, not the sum of per-question times.
    pub time_spent_secs: f64,
    pub avg_time_per_question_secs: f64,
    pub mastery_level: MasteryLevel,
}

impl ExamResults {
    /// Questions that received a non-skipped answer, right or wrong.
    #[must_use]
    pub fn answered_count(&self) -> u32 {
        self.correct_count + self.incorrect_count
    }
}

/// Per-category tally used by the results breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPerformance {
    pub category: String,
    pub total: u32,
    pub correct: u32,
    pub percentage: u32,
}

fn check_lengths(exam: &Exam, answers: &[Option<String>], skipped: &[bool]) -> Result<(), ScoringError> {
    let questions = exam.question_count();
    if answers.len() != questions || skipped.len() != questions {
        return Err(ScoringError::LengthMismatch {
            questions,
            answers: answers.len(),
            skipped: skipped.len(),
        });
    }
    Ok(())
}

/// Scores an answer sheet against an exam.
///
/// # Errors
///
/// Returns `ScoringError::LengthMismatch` when `answers` or `skipped` do not
/// have one slot per question.
pub fn score(
    exam: &Exam,
    answers: &[Option<String>],
    skipped: &[bool],
    time_spent_secs: f64,
) -> Result<ExamResults, ScoringError> {
    check_lengths(exam, answers, skipped)?;

    let mut correct_count = 0_u32;
    let mut incorrect_count = 0_u32;
    let mut skipped_count = 0_u32;

    for ((question, answer), skipped) in exam.questions().iter().zip(answers).zip(skipped) {
        match classify(question, answer.as_deref(), *skipped) {
            AnswerStatus::Correct => correct_count += 1,
            AnswerStatus::Incorrect => incorrect_count += 1,
            AnswerStatus::Skipped => skipped_count += 1,
        }
    }

    let max_score = u32::try_from(exam.question_count()).unwrap_or(u32::MAX);
    let percentage = percentage(correct_count, max_score);
    let time_spent_secs = time_spent_secs.max(0.0);

    Ok(ExamResults {
        score: correct_count,
        max_score,
        correct_count,
        incorrect_count,
        skipped_count,
        percentage,
        time_spent_secs,
        avg_time_per_question_secs: time_spent_secs / f64::from(max_score.max(1)),
        mastery_level: MasteryLevel::from_percentage(percentage),
    })
}

/// Correct answers per category, in order of each category's first question.
///
/// # Errors
///
/// Returns `ScoringError::LengthMismatch` on a malformed answer sheet.
pub fn category_breakdown(
    exam: &Exam,
    answers: &[Option<String>],
    skipped: &[bool],
) -> Result<Vec<CategoryPerformance>, ScoringError> {
    check_lengths(exam, answers, skipped)?;

    let mut out: Vec<CategoryPerformance> = Vec::new();
    for ((question, answer), skipped) in exam.questions().iter().zip(answers).zip(skipped) {
        let idx = match out.iter().position(|c| c.category == question.category()) {
            Some(idx) => idx,
            None => {
                out.push(CategoryPerformance {
                    category: question.category().to_owned(),
                    total: 0,
                    correct: 0,
                    percentage: 0,
                });
                out.len() - 1
            }
        };
        let entry = &mut out[idx];
        entry.total += 1;
        if classify(question, answer.as_deref(), *skipped) == AnswerStatus::Correct {
            entry.correct += 1;
        }
    }

    for entry in &mut out {
        entry.percentage = percentage(entry.correct, entry.total);
    }
    Ok(out)
}

/// `round(100 * part / whole)` with ties rounded up; 0 when `whole` is 0.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> u32 {
    let value = div_round_half_up(u64::from(part) * 100, u64::from(whole));
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Integer division rounding halves up; 0 when `den` is 0.
#[must_use]
pub fn div_round_half_up(num: u64, den: u64) -> u64 {
    if den == 0 {
        return 0;
    }
    (num * 2 + den) / (den * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamId, QuestionId};
    use crate::time::fixed_now;

    fn exam(correct: &[(&str, &str)]) -> Exam {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, (answer, category))| {
                Question::new(
                    QuestionId::new(format!("q{i}")),
                    format!("Question {i}"),
                    vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    *answer,
                    *category,
                    None,
                )
                .unwrap()
            })
            .collect();
        Exam::new(ExamId::new(1), "Exam", "Subject", 10, questions, fixed_now()).unwrap()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_owned())
    }

    #[test]
    fn one_of_two_is_fifty_percent_basic() {
        let exam = exam(&[("A", "x"), ("B", "x")]);
        let results = score(&exam, &[some("A"), some("C")], &[false, false], 120.0).unwrap();

        assert_eq!(results.correct_count, 1);
        assert_eq!(results.incorrect_count, 1);
        assert_eq!(results.skipped_count, 0);
        assert_eq!(results.percentage, 50);
        assert_eq!(results.mastery_level, MasteryLevel::Basic);
        assert_eq!(results.max_score, 2);
        assert!((results.avg_time_per_question_secs - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn three_of_four_with_a_skip_is_intermediate() {
        let exam = exam(&[("A", "x"), ("B", "x"), ("C", "x"), ("D", "x")]);
        let results = score(
            &exam,
            &[some("A"), some("B"), some("C"), None],
            &[false, false, false, true],
            0.0,
        )
        .unwrap();

        assert_eq!(results.score, 3);
        assert_eq!(results.skipped_count, 1);
        assert_eq!(results.percentage, 75);
        assert_eq!(results.mastery_level, MasteryLevel::Intermediate);
    }

    #[test]
    fn skip_flag_beats_a_stale_correct_answer() {
        let exam = exam(&[("A", "x")]);
        let results = score(&exam, &[some("A")], &[true], 0.0).unwrap();
        assert_eq!(results.correct_count, 0);
        assert_eq!(results.skipped_count, 1);
    }

    #[test]
    fn unanswered_counts_as_skipped() {
        let exam = exam(&[("A", "x"), ("B", "x")]);
        let results = score(&exam, &[None, some("B")], &[false, false], 0.0).unwrap();
        assert_eq!(results.skipped_count, 1);
        assert_eq!(results.correct_count, 1);
        assert_eq!(results.answered_count(), 1);
    }

    #[test]
    fn free_form_answer_is_incorrect() {
        let exam = exam(&[("A", "x")]);
        let results = score(&exam, &[some("not an option")], &[false], 0.0).unwrap();
        assert_eq!(results.incorrect_count, 1);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn mastery_bands_are_lower_inclusive() {
        assert_eq!(MasteryLevel::from_percentage(100), MasteryLevel::Advanced);
        assert_eq!(MasteryLevel::from_percentage(80), MasteryLevel::Advanced);
        assert_eq!(MasteryLevel::from_percentage(79), MasteryLevel::Intermediate);
        assert_eq!(MasteryLevel::from_percentage(60), MasteryLevel::Intermediate);
        assert_eq!(MasteryLevel::from_percentage(59), MasteryLevel::Basic);
        assert_eq!(MasteryLevel::from_percentage(40), MasteryLevel::Basic);
        assert_eq!(MasteryLevel::from_percentage(39), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::from_percentage(0), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::Advanced.to_string(), "Advanced");
    }

    #[test]
    fn mismatched_sheet_is_rejected() {
        let exam = exam(&[("A", "x"), ("B", "x")]);
        let err = score(&exam, &[None], &[false, false], 0.0).unwrap_err();
        assert_eq!(
            err,
            ScoringError::LengthMismatch {
                questions: 2,
                answers: 1,
                skipped: 2
            }
        );
    }

    #[test]
    fn scoring_is_deterministic() {
        let exam = exam(&[("A", "x"), ("B", "y")]);
        let answers = [some("A"), some("A")];
        let a = score(&exam, &answers, &[false, false], 10.0).unwrap();
        let b = score(&exam, &answers, &[false, false], 10.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn categories_keep_first_appearance_order() {
        let exam = exam(&[("A", "Cash"), ("B", "Budget"), ("C", "Cash")]);
        let breakdown = category_breakdown(
            &exam,
            &[some("A"), some("A"), some("D")],
            &[false, false, false],
        )
        .unwrap();

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].category, "Cash");
        assert_eq!(breakdown[0].total, 2);
        assert_eq!(breakdown[0].correct, 1);
        assert_eq!(breakdown[0].percentage, 50);
        assert_eq!(breakdown[1].category, "Budget");
        assert_eq!(breakdown[1].correct, 0);
    }
}
