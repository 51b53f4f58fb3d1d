//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ExamError, ExamId, QuestionError};
use exam_core::ExamSessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while reading a question file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("question file is not a valid question list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question {index} has an empty `{field}`")]
    EmptyField { index: usize, field: &'static str },
    #[error("question file contains no questions")]
    NoQuestions,
    #[error("question {index} is invalid: {source}")]
    Question {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

/// Errors emitted by `ExamCatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error("question index {index} is out of range for {len} questions")]
    QuestionOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by exam session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),
    #[error("session has no results to record")]
    NotSubmitted,
    #[error(transparent)]
    State(#[from] ExamSessionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
