mod attempt;
mod bookmark;
mod exam;
mod ids;
mod question;

pub use ids::{AttemptId, BookmarkId, ExamId, ParseIdError, QuestionId};

pub use attempt::{AttemptError, ExamAttempt, SubmittedAnswer};
pub use bookmark::BookmarkedQuestion;
pub use exam::{Exam, ExamError, ExamStats};
pub use question::{Question, QuestionError};
