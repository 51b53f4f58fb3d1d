use std::sync::Arc;

use chrono::{DateTime, Utc};
use exam_core::model::{AttemptId, ExamAttempt, ExamId};
use exam_core::scoring::ExamResults;
use exam_core::{ExamSession, Screen, Tick};

use super::report::ResultsReport;
use crate::Clock;
use crate::catalog_service::ExamCatalogService;
use crate::error::{CatalogError, SessionError};

/// A submitted session and the attempt it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub results: ExamResults,
    pub attempt_id: AttemptId,
    pub attempt: ExamAttempt,
}

/// Result of one countdown tick driven through the service.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Running { remaining_secs: u32 },
    /// Time ran out; the exam was submitted and its attempt recorded.
    Expired(SubmitOutcome),
}

/// Drives `ExamSession` with the service clock and records attempts in the catalog.
#[derive(Clone)]
pub struct ExamSessionService {
    clock: Clock,
    catalog: Arc<ExamCatalogService>,
}

impl ExamSessionService {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<ExamCatalogService>) -> Self {
        Self { clock, catalog }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<ExamCatalogService> {
        Arc::clone(&self.catalog)
    }

    /// Load an exam from the catalog into a fresh session on the start screen.
    ///
    /// Questions the catalog already holds bookmarks for start out bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamNotFound` for an unknown exam,
    /// `SessionError::State` if the stored exam does not validate, and
    /// `SessionError::Catalog` if the catalog cannot be read.
    pub async fn open(&self, exam_id: ExamId) -> Result<ExamSession, SessionError> {
        let exam = self
            .catalog
            .get_exam(exam_id)
            .await?
            .ok_or(SessionError::ExamNotFound(exam_id))?;
        let positions = self.catalog.bookmarked_positions(&exam).await?;
        let mut session = ExamSession::new(exam)?;
        for index in positions {
            session.restore_bookmark(index)?;
        }
        Ok(session)
    }

    /// Start the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` unless the session is on the start screen.
    pub fn start(&self, session: &mut ExamSession) -> Result<(), SessionError> {
        let now = self.clock.now();
        session.start(now)?;
        tracing::info!(
            exam_id = %session.exam().id(),
            questions = session.question_count(),
            time_limit_secs = session.remaining_secs(),
            "exam started"
        );
        Ok(())
    }

    /// Answer the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` unless the exam is in progress.
    pub fn answer(
        &self,
        session: &mut ExamSession,
        option: impl Into<String>,
    ) -> Result<(), SessionError> {
        Ok(session.submit_answer(option)?)
    }

    /// Skip the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` unless the exam is in progress.
    pub fn skip(&self, session: &mut ExamSession) -> Result<(), SessionError> {
        let now = self.now_for(session);
        Ok(session.skip_question(now)?)
    }

    /// Jump to another question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` unless the exam is in progress or the
    /// index is out of range.
    pub fn navigate(&self, session: &mut ExamSession, index: usize) -> Result<(), SessionError> {
        let now = self.now_for(session);
        Ok(session.navigate_to(index, now)?)
    }

    /// Toggle the bookmark on the current question and mirror it in the catalog.
    ///
    /// The session flag is flipped back if the catalog write fails.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` unless the exam is in progress, and
    /// `SessionError::Catalog` if the bookmark cannot be stored.
    pub async fn toggle_bookmark(&self, session: &mut ExamSession) -> Result<bool, SessionError> {
        let bookmarked = session.toggle_bookmark()?;
        if let Err(err) = self.mirror_bookmark(session, bookmarked).await {
            tracing::warn!(exam_id = %session.exam().id(), error = %err, "bookmark not stored");
            session.toggle_bookmark()?;
            return Err(err.into());
        }
        Ok(bookmarked)
    }

    async fn mirror_bookmark(
        &self,
        session: &ExamSession,
        bookmarked: bool,
    ) -> Result<(), CatalogError> {
        let index = session.current_index();
        let exam = session.exam();
        if bookmarked {
            self.catalog.bookmark_question(exam, index).await?;
        } else if let Some(question) = exam.question(index) {
            self.catalog
                .unbookmark_question(exam.id(), question.id())
                .await?;
        }
        Ok(())
    }

    /// Submit the exam and record the attempt.
    ///
    /// If recording fails the session still moves to the results screen;
    /// [`Self::record_attempt`] can be retried.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` unless the exam is in progress, and
    /// `SessionError::Catalog` if the attempt cannot be recorded.
    pub async fn submit(&self, session: &mut ExamSession) -> Result<SubmitOutcome, SessionError> {
        let now = self.now_for(session);
        session.submit(now)?;
        self.record_attempt(session).await
    }

    /// One countdown second; on expiry the exam is submitted and recorded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` unless the exam is in progress, and
    /// `SessionError::Catalog` if the expired attempt cannot be recorded.
    pub async fn tick(&self, session: &mut ExamSession) -> Result<TickOutcome, SessionError> {
        let now = self.now_for(session);
        match session.tick(now)? {
            Tick::Running { remaining_secs } => Ok(TickOutcome::Running { remaining_secs }),
            Tick::Expired => {
                tracing::info!(exam_id = %session.exam().id(), "time expired, exam auto-submitted");
                self.record_attempt(session).await.map(TickOutcome::Expired)
            }
        }
    }

    /// Reset the session for another attempt at the same exam.
    pub fn retake(&self, session: &mut ExamSession) {
        session.retake();
        tracing::debug!(exam_id = %session.exam().id(), "session reset for retake");
    }

    /// Record the attempt of a submitted session.
    ///
    /// Each submission is stored once: after a successful write, further
    /// calls return the stored outcome without touching the catalog.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` unless the session is on the
    /// results screen, and `SessionError::Catalog` if persistence fails.
    pub async fn record_attempt(
        &self,
        session: &mut ExamSession,
    ) -> Result<SubmitOutcome, SessionError> {
        if session.screen() != Screen::Results {
            return Err(SessionError::NotSubmitted);
        }
        let results = session.results().ok_or(SessionError::NotSubmitted)?.clone();
        let date = session.ended_at().unwrap_or_else(|| self.clock.now());
        let attempt = ExamAttempt::from_results(
            session.exam(),
            date,
            &results,
            session.answers(),
            session.skipped(),
        );

        if let Some(attempt_id) = session.recorded_attempt() {
            tracing::debug!(exam_id = %attempt.exam_id(), %attempt_id, "attempt already recorded");
            return Ok(SubmitOutcome {
                results,
                attempt_id,
                attempt,
            });
        }

        let attempt_id = match self.catalog.record_attempt(&attempt).await {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(exam_id = %attempt.exam_id(), error = %err, "attempt could not be recorded");
                return Err(err.into());
            }
        };
        session.mark_recorded(attempt_id)?;

        tracing::info!(
            exam_id = %attempt.exam_id(),
            percentage = results.percentage,
            mastery = %results.mastery_level,
            "exam submitted"
        );
        Ok(SubmitOutcome {
            results,
            attempt_id,
            attempt,
        })
    }

    /// Results report for a submitted session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` unless the session has results.
    pub fn report(&self, session: &ExamSession) -> Result<ResultsReport, SessionError> {
        ResultsReport::from_session(session)
    }

    fn now_for(&self, session: &ExamSession) -> DateTime<Utc> {
        let now = self.clock.now();
        if let Some(started) = session.started_at() {
            if now < started {
                tracing::warn!(%now, %started, "clock is behind the exam start; elapsed time clamps to zero");
            }
        }
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use exam_core::model::{Question, QuestionId};
    use exam_core::scoring::MasteryLevel;
    use exam_core::time::fixed_now;
    use storage::repository::Storage;

    fn questions() -> Vec<Question> {
        ["q1", "q2", "q3", "q4"]
            .iter()
            .map(|id| {
                Question::new(
                    QuestionId::new(*id),
                    format!("Question {id}"),
                    vec!["A".into(), "B".into(), "C".into()],
                    "B",
                    "General",
                    None,
                )
                .unwrap()
            })
            .collect()
    }

    async fn service() -> (ExamSessionService, ExamId) {
        let storage = Storage::in_memory();
        let catalog = ExamCatalogService::from_storage(Clock::fixed(fixed_now()), &storage);
        let exam = catalog
            .create_exam("Workflow", "General", 1, questions())
            .await
            .unwrap();
        let service = ExamSessionService::new(Clock::fixed(fixed_now()), Arc::new(catalog));
        (service, exam.id())
    }

    fn at(service: &ExamSessionService, secs: i64) -> ExamSessionService {
        service
            .clone()
            .with_clock(Clock::fixed(fixed_now() + Duration::seconds(secs)))
    }

    #[tokio::test]
    async fn submit_records_attempt_and_updates_stats() {
        let (service, exam_id) = service().await;
        let mut session = service.open(exam_id).await.unwrap();

        service.start(&mut session).unwrap();
        service.answer(&mut session, "B").unwrap();
        at(&service, 10).skip(&mut session).unwrap();
        at(&service, 15).navigate(&mut session, 2).unwrap();
        service.answer(&mut session, "B").unwrap();
        at(&service, 20).navigate(&mut session, 3).unwrap();
        service.answer(&mut session, "C").unwrap();

        let outcome = at(&service, 40).submit(&mut session).await.unwrap();
        assert_eq!(outcome.results.score, 2);
        assert_eq!(outcome.results.percentage, 50);
        assert_eq!(outcome.results.mastery_level, MasteryLevel::Basic);
        assert!((outcome.results.time_spent_secs - 40.0).abs() < 1e-9);
        assert_eq!(outcome.attempt.answered_questions(), 3);
        assert_eq!(outcome.attempt.submitted_answers()[1].answer, None);
        assert_eq!(session.screen(), Screen::Results);

        let exam = service.catalog().require_exam(exam_id).await.unwrap();
        assert_eq!(exam.stats().total_attempts, 1);
        assert_eq!(exam.stats().best_score, 50);

        let report = service.report(&session).unwrap();
        assert_eq!(report.formatted_time(), "0:40");
    }

    #[tokio::test]
    async fn operations_out_of_phase_are_rejected() {
        let (service, exam_id) = service().await;
        let mut session = service.open(exam_id).await.unwrap();

        assert!(matches!(
            service.answer(&mut session, "B"),
            Err(SessionError::State(_))
        ));
        assert!(matches!(
            service.submit(&mut session).await,
            Err(SessionError::State(_))
        ));
        assert!(matches!(
            service.record_attempt(&mut session).await,
            Err(SessionError::NotSubmitted)
        ));

        service.start(&mut session).unwrap();
        assert!(matches!(
            service.start(&mut session),
            Err(SessionError::State(_))
        ));
        assert!(matches!(
            service.open(ExamId::new(404)).await,
            Err(SessionError::ExamNotFound(_))
        ));
    }

    #[tokio::test]
    async fn tick_expiry_submits_and_records() {
        let (service, exam_id) = service().await;
        let mut session = service.open(exam_id).await.unwrap();
        service.start(&mut session).unwrap();
        service.answer(&mut session, "B").unwrap();

        for expected in (1..60).rev() {
            let outcome = service.tick(&mut session).await.unwrap();
            assert_eq!(
                outcome,
                TickOutcome::Running {
                    remaining_secs: expected
                }
            );
        }

        let TickOutcome::Expired(outcome) = service.tick(&mut session).await.unwrap() else {
            panic!("countdown should expire on the sixtieth tick");
        };
        assert_eq!(outcome.results.correct_count, 1);
        assert_eq!(outcome.results.skipped_count, 3);
        assert_eq!(outcome.results.percentage, 25);
        assert_eq!(session.screen(), Screen::Results);
        assert!(matches!(
            service.tick(&mut session).await,
            Err(SessionError::State(_))
        ));
    }

    #[tokio::test]
    async fn recording_twice_stores_one_attempt() {
        let (service, exam_id) = service().await;
        let mut session = service.open(exam_id).await.unwrap();
        service.start(&mut session).unwrap();
        service.answer(&mut session, "B").unwrap();

        let first = service.submit(&mut session).await.unwrap();
        let again = service.record_attempt(&mut session).await.unwrap();
        assert_eq!(again, first);
        assert_eq!(session.recorded_attempt(), Some(first.attempt_id));

        let stats = service.catalog().require_exam(exam_id).await.unwrap().stats();
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(service.catalog().recent_attempts(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn open_restores_stored_bookmarks() {
        let (service, exam_id) = service().await;
        let exam = service.catalog().require_exam(exam_id).await.unwrap();
        service.catalog().bookmark_question(&exam, 2).await.unwrap();

        let mut session = service.open(exam_id).await.unwrap();
        service.start(&mut session).unwrap();
        assert_eq!(session.bookmarked(), &[false, false, true, false]);

        service.navigate(&mut session, 2).unwrap();
        assert!(!service.toggle_bookmark(&mut session).await.unwrap());
        assert!(service.catalog().list_bookmarks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bookmark_toggle_is_mirrored_in_catalog() {
        let (service, exam_id) = service().await;
        let mut session = service.open(exam_id).await.unwrap();
        service.start(&mut session).unwrap();

        assert!(service.toggle_bookmark(&mut session).await.unwrap());
        assert_eq!(service.catalog().list_bookmarks().await.unwrap().len(), 1);

        assert!(!service.toggle_bookmark(&mut session).await.unwrap());
        assert!(service.catalog().list_bookmarks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retake_allows_a_second_recorded_attempt() {
        let (service, exam_id) = service().await;
        let mut session = service.open(exam_id).await.unwrap();

        service.start(&mut session).unwrap();
        service.submit(&mut session).await.unwrap();
        service.retake(&mut session);
        assert_eq!(session.screen(), Screen::Start);

        service.start(&mut session).unwrap();
        for _ in 0..4 {
            service.answer(&mut session, "B").unwrap();
            if !session.is_last_question() {
                let next = session.current_index() + 1;
                service.navigate(&mut session, next).unwrap();
            }
        }
        let outcome = service.submit(&mut session).await.unwrap();
        assert_eq!(outcome.results.percentage, 100);

        let stats = service.catalog().require_exam(exam_id).await.unwrap().stats();
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.best_score, 100);
        assert_eq!(stats.avg_score, 50);
    }
}
