//! State machine for a single exam attempt.
//!
//! `start` → `in_progress` → `results`, with `retake` leading back to `start`.
//! Operations take the current time explicitly; the services layer owns the
//! clock and passes `clock.now()` in.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{AttemptId, Exam, ExamError, Question};
use crate::scoring::{self, ExamResults, ScoringError};
use crate::time::elapsed_secs;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamSessionError {
    #[error("invalid exam: {0}")]
    InvalidExam(#[from] ExamError),

    #[error("operation requires the {expected} phase but the session is in {current}")]
    InvalidState { current: Screen, expected: Screen },

    #[error("question index {index} is out of range for {len} questions")]
    InvalidIndex { index: usize, len: usize },

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Which screen the attempt is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    #[default]
    Start,
    InProgress,
    Results,
}

impl Screen {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Start => "start",
            Screen::InProgress => "in_progress",
            Screen::Results => "results",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far through the sheet the attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub skipped: usize,
    pub total: usize,
}

impl Progress {
    /// Questions neither answered nor skipped.
    #[must_use]
    pub fn untouched(&self) -> usize {
        self.total.saturating_sub(self.answered + self.skipped)
    }

    /// Share of questions answered or skipped, rounded half up.
    #[must_use]
    pub fn percent(&self) -> u32 {
        let done = u64::try_from(self.answered + self.skipped).unwrap_or(u64::MAX);
        let total = u64::try_from(self.total).unwrap_or(u64::MAX);
        let value = scoring::div_round_half_up(done.saturating_mul(100), total);
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining_secs: u32 },
    /// The countdown hit zero and the exam was submitted.
    Expired,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Mutable state of one attempt at one exam.
///
/// Per-question slices (`answers`, `skipped`, `time_per_question`) have one
/// slot per question whenever the session is in progress or showing results.
/// Only the active question has a running timer; its start instant lives in
/// `question_started_at` until the next navigation or submission commits it.
///
/// `bookmarked` mirrors the catalog's bookmarks for the bound exam, so it is
/// sized when an exam is bound and survives `start` and `retake`.
#[derive(Debug, Clone)]
pub struct ExamSession {
    screen: Screen,
    exam: Exam,
    current: usize,
    answers: Vec<Option<String>>,
    skipped: Vec<bool>,
    bookmarked: Vec<bool>,
    time_per_question: Vec<f64>,
    question_started_at: Option<DateTime<Utc>>,
    remaining_secs: u32,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    results: Option<ExamResults>,
    recorded: Option<AttemptId>,
}

impl ExamSession {
    /// Binds `exam` to a fresh session on the start screen.
    ///
    /// # Errors
    ///
    /// Returns `ExamSessionError::InvalidExam` if the exam does not validate.
    pub fn new(exam: Exam) -> Result<Self, ExamSessionError> {
        exam.validate()?;
        let bookmarked = vec![false; exam.question_count()];
        let mut session = Self {
            screen: Screen::Start,
            exam,
            current: 0,
            answers: Vec::new(),
            skipped: Vec::new(),
            bookmarked,
            time_per_question: Vec::new(),
            question_started_at: None,
            remaining_secs: 0,
            started_at: None,
            ended_at: None,
            results: None,
            recorded: None,
        };
        session.reset_sheet();
        Ok(session)
    }

    /// Rebinds the session to `exam` and resets the answer sheet and bookmarks.
    ///
    /// The screen does not change.
    ///
    /// # Errors
    ///
    /// Returns `InvalidExam` for a malformed exam and `InvalidState` outside
    /// the start screen.
    pub fn init_exam(&mut self, exam: Exam) -> Result<(), ExamSessionError> {
        self.require(Screen::Start)?;
        exam.validate()?;
        self.bookmarked = vec![false; exam.question_count()];
        self.exam = exam;
        self.reset_sheet();
        Ok(())
    }

    /// Marks question `index` as already bookmarked before the attempt starts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` outside the start screen and `InvalidIndex` if
    /// `index` is out of range.
    pub fn restore_bookmark(&mut self, index: usize) -> Result<(), ExamSessionError> {
        self.require(Screen::Start)?;
        let len = self.bookmarked.len();
        let flag = self
            .bookmarked
            .get_mut(index)
            .ok_or(ExamSessionError::InvalidIndex { index, len })?;
        *flag = true;
        Ok(())
    }

    /// Begins the attempt and starts the timer on the first question.
    ///
    /// The answer sheet is re-initialised from the bound exam, so a session
    /// that went through `retake` starts clean.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is on the start screen.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), ExamSessionError> {
        self.require(Screen::Start)?;
        self.reset_sheet();
        self.screen = Screen::InProgress;
        self.started_at = Some(now);
        self.question_started_at = Some(now);
        Ok(())
    }

    /// Records `option` as the answer to the current question.
    ///
    /// Any string is accepted; only an exact match with the correct answer
    /// scores. Clears a previous skip on the same question.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the exam is in progress.
    pub fn submit_answer(&mut self, option: impl Into<String>) -> Result<(), ExamSessionError> {
        self.require(Screen::InProgress)?;
        self.answers[self.current] = Some(option.into());
        self.skipped[self.current] = false;
        Ok(())
    }

    /// Marks the current question skipped and moves on unless it is the last.
    ///
    /// A previously recorded answer stays in its slot; scoring ignores it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the exam is in progress.
    pub fn skip_question(&mut self, now: DateTime<Utc>) -> Result<(), ExamSessionError> {
        self.require(Screen::InProgress)?;
        self.skipped[self.current] = true;
        if !self.is_last_question() {
            self.navigate_to(self.current + 1, now)?;
        }
        Ok(())
    }

    /// Jumps to `index`, forwards or backwards.
    ///
    /// Time spent on the question being left is committed before the timer
    /// restarts on `index`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the exam is in progress, and
    /// `InvalidIndex` if `index` is out of range.
    pub fn navigate_to(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), ExamSessionError> {
        self.require(Screen::InProgress)?;
        let len = self.exam.question_count();
        if index >= len {
            return Err(ExamSessionError::InvalidIndex { index, len });
        }
        self.commit_current(now);
        self.current = index;
        self.question_started_at = Some(now);
        Ok(())
    }

    /// Flips the bookmark flag on the current question and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the exam is in progress.
    pub fn toggle_bookmark(&mut self) -> Result<bool, ExamSessionError> {
        self.require(Screen::InProgress)?;
        let flag = &mut self.bookmarked[self.current];
        *flag = !*flag;
        Ok(*flag)
    }

    /// Stops the clock, scores the sheet and moves to the results screen.
    ///
    /// One-way: no answer can change afterwards.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the exam is in progress.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<&ExamResults, ExamSessionError> {
        self.require(Screen::InProgress)?;

        let time_spent = self.started_at.map_or(0.0, |start| elapsed_secs(start, now));
        let results = scoring::score(&self.exam, &self.answers, &self.skipped, time_spent)?;

        self.commit_current(now);
        self.ended_at = Some(now);
        self.screen = Screen::Results;
        Ok(self.results.insert(results))
    }

    /// Notes that the submitted attempt has been stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is showing results.
    pub fn mark_recorded(&mut self, id: AttemptId) -> Result<(), ExamSessionError> {
        self.require(Screen::Results)?;
        self.recorded = Some(id);
        Ok(())
    }

    /// One second of countdown; submits the exam when it reaches zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the exam is in progress.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Tick, ExamSessionError> {
        self.require(Screen::InProgress)?;
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.submit(now)?;
            return Ok(Tick::Expired);
        }
        Ok(Tick::Running {
            remaining_secs: self.remaining_secs,
        })
    }

    /// Throws the attempt away and returns to the start screen, keeping the exam.
    ///
    /// Legal from any screen. The per-question slices are emptied; `start`
    /// sizes them again. Bookmarks are kept.
    pub fn retake(&mut self) {
        self.screen = Screen::Start;
        self.current = 0;
        self.answers.clear();
        self.skipped.clear();
        self.time_per_question.clear();
        self.question_started_at = None;
        self.remaining_secs = self.exam.time_limit_secs();
        self.started_at = None;
        self.ended_at = None;
        self.results = None;
        self.recorded = None;
    }

    fn require(&self, expected: Screen) -> Result<(), ExamSessionError> {
        if self.screen == expected {
            Ok(())
        } else {
            Err(ExamSessionError::InvalidState {
                current: self.screen,
                expected,
            })
        }
    }

    fn reset_sheet(&mut self) {
        let n = self.exam.question_count();
        self.current = 0;
        self.answers = vec![None; n];
        self.skipped = vec![false; n];
        self.time_per_question = vec![0.0; n];
        self.question_started_at = None;
        self.remaining_secs = self.exam.time_limit_secs();
        self.started_at = None;
        self.ended_at = None;
        self.results = None;
        self.recorded = None;
    }

    fn commit_current(&mut self, now: DateTime<Utc>) {
        if let Some(started) = self.question_started_at.take() {
            self.time_per_question[self.current] += elapsed_secs(started, now);
        }
    }

    // ─── Read side ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.exam.question_count()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.exam.question(self.current)
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 >= self.exam.question_count()
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    #[must_use]
    pub fn skipped(&self) -> &[bool] {
        &self.skipped
    }

    #[must_use]
    pub fn bookmarked(&self) -> &[bool] {
        &self.bookmarked
    }

    /// Committed seconds per question. The active question's running span is
    /// not included until it is committed; see [`Self::time_on_current`].
    #[must_use]
    pub fn time_per_question(&self) -> &[f64] {
        &self.time_per_question
    }

    /// Live seconds on the active question: committed time plus the running span.
    #[must_use]
    pub fn time_on_current(&self, now: DateTime<Utc>) -> f64 {
        let committed = self
            .time_per_question
            .get(self.current)
            .copied()
            .unwrap_or(0.0);
        let running = self
            .question_started_at
            .map_or(0.0, |started| elapsed_secs(started, now));
        committed + running
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Set exactly when the screen is `Results`.
    #[must_use]
    pub fn results(&self) -> Option<&ExamResults> {
        self.results.as_ref()
    }

    /// Id of the stored attempt once the results have been recorded.
    #[must_use]
    pub fn recorded_attempt(&self) -> Option<AttemptId> {
        self.recorded
    }

    /// Questions holding an answer that is not overridden by a skip.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers
            .iter()
            .zip(&self.skipped)
            .filter(|(a, s)| a.is_some() && !**s)
            .count()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.iter().filter(|s| **s).count()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.answered_count(),
            skipped: self.skipped_count(),
            total: self.question_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamId, QuestionId};
    use crate::scoring::MasteryLevel;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn exam(n: usize, minutes: u32) -> Exam {
        let questions = (0..n)
            .map(|i| {
                Question::new(
                    QuestionId::new(format!("q{i}")),
                    format!("Question {i}"),
                    vec!["A".into(), "B".into(), "C".into()],
                    "A",
                    "General",
                    None,
                )
                .unwrap()
            })
            .collect();
        Exam::new(ExamId::new(1), "Exam", "Subject", minutes, questions, fixed_now()).unwrap()
    }

    fn started(n: usize) -> (ExamSession, DateTime<Utc>) {
        let mut session = ExamSession::new(exam(n, 10)).unwrap();
        let t0 = fixed_now();
        session.start(t0).unwrap();
        (session, t0)
    }

    #[test]
    fn init_sizes_every_slice() {
        let session = ExamSession::new(exam(4, 2)).unwrap();
        assert_eq!(session.screen(), Screen::Start);
        assert_eq!(session.answers(), &[None, None, None, None]);
        assert_eq!(session.skipped(), &[false; 4]);
        assert_eq!(session.time_per_question(), &[0.0; 4]);
        assert_eq!(session.bookmarked().len(), 4);
        assert_eq!(session.remaining_secs(), 120);
        assert!(session.results().is_none());
    }

    #[test]
    fn init_exam_rejects_malformed_exam() {
        let mut session = ExamSession::new(exam(1, 1)).unwrap();
        let broken: Exam = serde_json::from_value(serde_json::json!({
            "id": 2,
            "name": "Broken",
            "subject": "S",
            "time_limit_minutes": 1,
            "questions": [],
            "created_at": "2023-11-14T22:13:20Z"
        }))
        .unwrap();

        let err = session.init_exam(broken).unwrap_err();
        assert_eq!(err, ExamSessionError::InvalidExam(ExamError::NoQuestions));
        assert_eq!(session.exam().id(), ExamId::new(1));
    }

    #[test]
    fn init_exam_rebinds_and_keeps_screen() {
        let mut session = ExamSession::new(exam(1, 1)).unwrap();
        session.init_exam(exam(3, 5)).unwrap();
        assert_eq!(session.screen(), Screen::Start);
        assert_eq!(session.answers().len(), 3);
        assert_eq!(session.remaining_secs(), 300);
    }

    #[test]
    fn init_exam_mid_attempt_is_rejected() {
        let (mut session, _) = started(2);
        session.submit_answer("A").unwrap();

        let err = session.init_exam(exam(3, 5)).unwrap_err();
        assert_eq!(
            err,
            ExamSessionError::InvalidState {
                current: Screen::InProgress,
                expected: Screen::Start
            }
        );
        assert_eq!(session.question_count(), 2);
        assert_eq!(session.answers()[0].as_deref(), Some("A"));
        assert_eq!(session.screen(), Screen::InProgress);
    }

    #[test]
    fn double_start_is_rejected() {
        let (mut session, t0) = started(2);
        let err = session.start(t0).unwrap_err();
        assert_eq!(
            err,
            ExamSessionError::InvalidState {
                current: Screen::InProgress,
                expected: Screen::Start
            }
        );
    }

    #[test]
    fn actions_before_start_are_rejected() {
        let mut session = ExamSession::new(exam(2, 1)).unwrap();
        assert!(matches!(
            session.submit_answer("A"),
            Err(ExamSessionError::InvalidState { current: Screen::Start, .. })
        ));
        assert!(session.navigate_to(1, fixed_now()).is_err());
        assert!(session.submit(fixed_now()).is_err());
        assert!(session.tick(fixed_now()).is_err());
    }

    #[test]
    fn answer_then_skip_keeps_the_answer() {
        let (mut session, t0) = started(3);
        session.submit_answer("B").unwrap();
        session.skip_question(t0).unwrap();

        assert!(session.skipped()[0]);
        assert_eq!(session.answers()[0].as_deref(), Some("B"));
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.skipped_count(), 1);
    }

    #[test]
    fn answering_clears_a_skip() {
        let (mut session, t0) = started(2);
        session.skip_question(t0).unwrap();
        session.navigate_to(0, t0).unwrap();
        session.submit_answer("A").unwrap();
        assert!(!session.skipped()[0]);
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn skip_on_last_question_stays_put() {
        let (mut session, t0) = started(2);
        session.navigate_to(1, t0).unwrap();
        session.skip_question(t0).unwrap();
        assert_eq!(session.current_index(), 1);
        assert!(session.skipped()[1]);
    }

    #[test]
    fn navigation_rejects_out_of_range() {
        let (mut session, t0) = started(2);
        let err = session.navigate_to(2, t0).unwrap_err();
        assert_eq!(err, ExamSessionError::InvalidIndex { index: 2, len: 2 });
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn navigation_accrues_time_per_question() {
        let (mut session, t0) = started(3);

        session.navigate_to(1, t0 + Duration::seconds(10)).unwrap();
        session.navigate_to(0, t0 + Duration::seconds(15)).unwrap();
        session.navigate_to(1, t0 + Duration::seconds(18)).unwrap();
        session.navigate_to(2, t0 + Duration::seconds(20)).unwrap();

        let times = session.time_per_question();
        assert!((times[0] - 13.0).abs() < 1e-9);
        assert!((times[1] - 7.0).abs() < 1e-9);
        assert!(times[2].abs() < f64::EPSILON);
        assert!((session.time_on_current(t0 + Duration::seconds(24)) - 4.0).abs() < 1e-9);

        session.submit(t0 + Duration::seconds(26)).unwrap();
        let total: f64 = session.time_per_question().iter().sum();
        assert!((total - 26.0).abs() < 1e-9);
        let results = session.results().unwrap();
        assert!((results.time_spent_secs - 26.0).abs() < 1e-9);
    }

    #[test]
    fn backwards_clock_never_reduces_time() {
        let (mut session, t0) = started(2);
        session.navigate_to(1, t0 - Duration::seconds(5)).unwrap();
        assert!(session.time_per_question()[0].abs() < f64::EPSILON);
    }

    #[test]
    fn submit_scores_and_locks_the_sheet() {
        let (mut session, t0) = started(2);
        session.submit_answer("A").unwrap();
        session.navigate_to(1, t0 + Duration::seconds(30)).unwrap();
        session.submit_answer("C").unwrap();

        let results = session.submit(t0 + Duration::seconds(60)).unwrap().clone();
        assert_eq!(results.percentage, 50);
        assert_eq!(results.mastery_level, MasteryLevel::Basic);
        assert_eq!(session.screen(), Screen::Results);
        assert_eq!(session.ended_at(), Some(t0 + Duration::seconds(60)));

        assert!(matches!(
            session.submit_answer("A"),
            Err(ExamSessionError::InvalidState { current: Screen::Results, .. })
        ));
        assert!(session.submit(t0 + Duration::seconds(61)).is_err());
        assert_eq!(session.results(), Some(&results));
    }

    #[test]
    fn countdown_expiry_submits() {
        let mut session = ExamSession::new(exam(2, 1)).unwrap();
        let t0 = fixed_now();
        session.start(t0).unwrap();

        for i in 1..60 {
            let tick = session.tick(t0 + Duration::seconds(i)).unwrap();
            assert_eq!(
                tick,
                Tick::Running {
                    remaining_secs: 60 - u32::try_from(i).unwrap()
                }
            );
        }
        assert_eq!(session.remaining_secs(), 1);

        let tick = session.tick(t0 + Duration::seconds(60)).unwrap();
        assert_eq!(tick, Tick::Expired);
        assert_eq!(session.screen(), Screen::Results);
        assert_eq!(session.remaining_secs(), 0);
        assert!(session.results().is_some());
    }

    #[test]
    fn progress_counts_answered_and_skipped() {
        let (mut session, t0) = started(3);
        assert_eq!(session.progress().percent(), 0);
        assert_eq!(session.progress().untouched(), 3);

        session.submit_answer("A").unwrap();
        session.skip_question(t0).unwrap();
        let progress = session.progress();
        assert_eq!(
            progress,
            Progress {
                answered: 1,
                skipped: 1,
                total: 3
            }
        );
        assert_eq!(progress.untouched(), 1);
        assert_eq!(progress.percent(), 67);
    }

    #[test]
    fn restored_bookmarks_survive_start_and_retake() {
        let mut session = ExamSession::new(exam(3, 1)).unwrap();
        session.restore_bookmark(2).unwrap();
        assert_eq!(
            session.restore_bookmark(3).unwrap_err(),
            ExamSessionError::InvalidIndex { index: 3, len: 3 }
        );

        session.start(fixed_now()).unwrap();
        assert_eq!(session.bookmarked(), &[false, false, true]);
        assert!(session.restore_bookmark(0).is_err());

        session.retake();
        session.start(fixed_now()).unwrap();
        assert_eq!(session.bookmarked(), &[false, false, true]);

        session.retake();
        session.init_exam(exam(2, 1)).unwrap();
        assert_eq!(session.bookmarked(), &[false, false]);
    }

    #[test]
    fn recorded_attempt_is_cleared_by_retake() {
        let (mut session, t0) = started(1);
        assert!(session.mark_recorded(AttemptId::new(1)).is_err());

        session.submit(t0).unwrap();
        session.mark_recorded(AttemptId::new(7)).unwrap();
        assert_eq!(session.recorded_attempt(), Some(AttemptId::new(7)));

        session.retake();
        assert_eq!(session.recorded_attempt(), None);
    }

    #[test]
    fn toggle_bookmark_flips_current() {
        let (mut session, _) = started(2);
        assert!(session.toggle_bookmark().unwrap());
        assert!(!session.toggle_bookmark().unwrap());
        assert!(session.toggle_bookmark().unwrap());
        assert_eq!(session.bookmarked(), &[true, false]);
    }

    #[test]
    fn retake_then_start_is_a_fresh_session() {
        let (mut session, t0) = started(3);
        session.submit_answer("A").unwrap();
        session.skip_question(t0 + Duration::seconds(5)).unwrap();
        session.submit(t0 + Duration::seconds(9)).unwrap();

        session.retake();
        assert_eq!(session.screen(), Screen::Start);
        assert!(session.answers().is_empty());
        assert!(session.results().is_none());
        assert!(session.started_at().is_none());

        let t1 = t0 + Duration::minutes(5);
        session.start(t1).unwrap();
        assert_eq!(session.exam().id(), ExamId::new(1));
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answers(), &[None, None, None]);
        assert_eq!(session.skipped(), &[false; 3]);
        assert_eq!(session.time_per_question(), &[0.0; 3]);
        assert_eq!(session.remaining_secs(), 600);
        assert_eq!(session.started_at(), Some(t1));
    }

    #[test]
    fn retake_is_legal_mid_attempt() {
        let (mut session, _) = started(2);
        session.submit_answer("B").unwrap();
        session.retake();
        assert_eq!(session.screen(), Screen::Start);
    }
}
