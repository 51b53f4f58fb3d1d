use std::sync::Arc;
use std::time::Duration;

use exam_core::{ExamSession, Screen};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::workflow::{ExamSessionService, SubmitOutcome, TickOutcome};
use crate::error::SessionError;

/// How urgent the remaining time looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Normal,
    Warning,
    Danger,
}

/// Remaining-time thresholds, inclusive, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownThresholds {
    pub warning_secs: u32,
    pub danger_secs: u32,
}

impl Default for CountdownThresholds {
    fn default() -> Self {
        Self {
            warning_secs: 300,
            danger_secs: 60,
        }
    }
}

impl CountdownThresholds {
    #[must_use]
    pub fn status(&self, remaining_secs: u32) -> TimerStatus {
        if remaining_secs <= self.danger_secs {
            TimerStatus::Danger
        } else if remaining_secs <= self.warning_secs {
            TimerStatus::Warning
        } else {
            TimerStatus::Normal
        }
    }
}

/// `MM:SS`, zero-padded; minutes grow past two digits for long exams.
#[must_use]
pub fn format_countdown(remaining_secs: u32) -> String {
    format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

const TICK: Duration = Duration::from_secs(1);

/// Ticks a shared session once a second until it leaves `in_progress`.
///
/// User actions and ticks take the same lock, so they never interleave.
#[derive(Clone)]
pub struct CountdownDriver {
    sessions: ExamSessionService,
}

impl CountdownDriver {
    #[must_use]
    pub fn new(sessions: ExamSessionService) -> Self {
        Self { sessions }
    }

    /// Runs until the session is submitted or leaves `in_progress`.
    ///
    /// Returns the outcome when the countdown itself submitted the exam, and
    /// `None` when the session was submitted or reset by someone else.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the expired attempt cannot be recorded.
    pub async fn run(
        &self,
        session: Arc<Mutex<ExamSession>>,
    ) -> Result<Option<SubmitOutcome>, SessionError> {
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let mut guard = session.lock().await;
            if guard.screen() != Screen::InProgress {
                tracing::debug!(screen = %guard.screen(), "countdown stopped");
                return Ok(None);
            }
            match self.sessions.tick(&mut guard).await? {
                TickOutcome::Running { remaining_secs } => {
                    if remaining_secs % 60 == 0 {
                        tracing::debug!(remaining = %format_countdown(remaining_secs), "countdown");
                    }
                }
                TickOutcome::Expired(outcome) => return Ok(Some(outcome)),
            }
        }
    }

    /// Runs the countdown on the tokio runtime.
    #[must_use]
    pub fn spawn(
        &self,
        session: Arc<Mutex<ExamSession>>,
    ) -> JoinHandle<Result<Option<SubmitOutcome>, SessionError>> {
        let driver = self.clone();
        tokio::spawn(async move { driver.run(session).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use exam_core::model::{Question, QuestionId};
    use exam_core::time::fixed_now;
    use storage::repository::Storage;

    use crate::Clock;
    use crate::catalog_service::ExamCatalogService;

    #[test]
    fn countdown_formats_and_classifies() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(65), "01:05");
        assert_eq!(format_countdown(7200), "120:00");

        let thresholds = CountdownThresholds::default();
        assert_eq!(thresholds.status(301), TimerStatus::Normal);
        assert_eq!(thresholds.status(300), TimerStatus::Warning);
        assert_eq!(thresholds.status(61), TimerStatus::Warning);
        assert_eq!(thresholds.status(60), TimerStatus::Danger);
        assert_eq!(thresholds.status(0), TimerStatus::Danger);
    }

    async fn started_session() -> (ExamSessionService, Arc<Mutex<ExamSession>>) {
        let storage = Storage::in_memory();
        let catalog = ExamCatalogService::from_storage(Clock::fixed(fixed_now()), &storage);
        let question = Question::new(
            QuestionId::new("q1"),
            "Pick A",
            vec!["A".into(), "B".into()],
            "A",
            "General",
            None,
        )
        .unwrap();
        let exam = catalog
            .create_exam("Timed", "General", 1, vec![question])
            .await
            .unwrap();
        let service = ExamSessionService::new(Clock::fixed(fixed_now()), Arc::new(catalog));
        let mut session = service.open(exam.id()).await.unwrap();
        service.start(&mut session).unwrap();
        (service, Arc::new(Mutex::new(session)))
    }

    #[tokio::test(start_paused = true)]
    async fn driver_submits_when_time_runs_out() {
        let (service, session) = started_session().await;
        {
            let mut guard = session.lock().await;
            service.answer(&mut guard, "A").unwrap();
        }

        let outcome = CountdownDriver::new(service.clone())
            .run(Arc::clone(&session))
            .await
            .unwrap()
            .expect("countdown should submit");

        assert_eq!(outcome.results.percentage, 100);
        let guard = session.lock().await;
        assert_eq!(guard.screen(), Screen::Results);
        assert_eq!(guard.remaining_secs(), 0);

        let stats = service.catalog().require_exam(guard.exam().id()).await.unwrap().stats();
        assert_eq!(stats.total_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_stops_after_manual_submit() {
        let (service, session) = started_session().await;
        let handle = CountdownDriver::new(service.clone()).spawn(Arc::clone(&session));

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        {
            let mut guard = session.lock().await;
            assert_eq!(guard.remaining_secs(), 50);
            service.submit(&mut guard).await.unwrap();
        }

        let finished = handle.await.unwrap().unwrap();
        assert!(finished.is_none());
        assert_eq!(
            service
                .catalog()
                .recent_attempts(10)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
