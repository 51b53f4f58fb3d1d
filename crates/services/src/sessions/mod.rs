mod countdown;
mod report;
mod workflow;

// Public API of the exam session subsystem.
pub use crate::error::SessionError;
pub use countdown::{CountdownDriver, CountdownThresholds, TimerStatus, format_countdown};
pub use report::{QuestionReview, ResultsReport, format_duration};
pub use workflow::{ExamSessionService, SubmitOutcome, TickOutcome};
