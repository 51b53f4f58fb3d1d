use thiserror::Error;

use crate::model::{AttemptError, ExamError, QuestionError};
use crate::scoring::ScoringError;
use crate::session::ExamSessionError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Session(#[from] ExamSessionError),
}
