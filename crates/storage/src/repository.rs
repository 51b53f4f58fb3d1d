use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{
    AttemptId, BookmarkId, BookmarkedQuestion, Exam, ExamAttempt, ExamId, Question, QuestionId,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for an exam whose id the store assigns.
#[derive(Debug, Clone)]
pub struct NewExamRecord {
    pub name: String,
    pub subject: String,
    pub time_limit_minutes: u32,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl NewExamRecord {
    #[must_use]
    pub fn from_exam(exam: &Exam) -> Self {
        Self {
            name: exam.name().to_owned(),
            subject: exam.subject().to_owned(),
            time_limit_minutes: exam.time_limit_minutes(),
            questions: exam.questions().to_vec(),
            created_at: exam.created_at(),
        }
    }
}

/// A persisted attempt together with its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub attempt: ExamAttempt,
}

/// A persisted bookmark together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkRow {
    pub id: BookmarkId,
    pub bookmark: BookmarkedQuestion,
}

/// Repository contract for exam definitions.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist a new exam and return the id assigned to it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError>;

    /// Persist or replace an exam, including its questions, stats and bookmark flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// Fetch an exam by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing exam is `Ok(None)`.
    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError>;

    /// All exams, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError>;

    /// Remove an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the exam does not exist.
    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError>;
}

/// Repository contract for recorded attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append an attempt and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<AttemptId, StorageError>;

    /// Fetch one attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRow, StorageError>;

    /// Attempts for one exam, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts_for_exam(&self, exam_id: ExamId)
    -> Result<Vec<AttemptRow>, StorageError>;

    /// Newest attempts across all exams, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_recent_attempts(&self, limit: u32) -> Result<Vec<AttemptRow>, StorageError>;

    /// Every attempt, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_attempts(&self) -> Result<Vec<AttemptRow>, StorageError>;

    /// Remove one attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn delete_attempt(&self, id: AttemptId) -> Result<(), StorageError>;

    /// Remove every attempt of an exam and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_attempts_for_exam(&self, exam_id: ExamId) -> Result<u64, StorageError>;
}

/// Repository contract for bookmarked questions.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Store a bookmark and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the same question of the same exam
    /// is already bookmarked.
    async fn add_bookmark(&self, bookmark: &BookmarkedQuestion) -> Result<BookmarkId, StorageError>;

    /// Bookmarks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_bookmarks(&self) -> Result<Vec<BookmarkRow>, StorageError>;

    /// Look up the bookmark for one question of one exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_bookmark(
        &self,
        exam_id: ExamId,
        question_id: &QuestionId,
    ) -> Result<Option<BookmarkRow>, StorageError>;

    /// Remove one bookmark.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StorageError>;

    /// Remove every bookmark taken from an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_bookmarks_for_exam(&self, exam_id: ExamId) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    exams: Arc<Mutex<BTreeMap<ExamId, Exam>>>,
    attempts: Arc<Mutex<BTreeMap<AttemptId, ExamAttempt>>>,
    bookmarks: Arc<Mutex<BTreeMap<BookmarkId, BookmarkedQuestion>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ids are shared across tables, which keeps them unique and increasing
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError> {
        let id = ExamId::new(self.next_id());
        let exam = Exam::new(
            id,
            exam.name,
            exam.subject,
            exam.time_limit_minutes,
            exam.questions,
            exam.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.insert(id, exam);
        Ok(id)
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.insert(exam.id(), exam.clone());
        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<AttemptId, StorageError> {
        let id = AttemptId::new(self.next_id());
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.insert(id, attempt.clone());
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRow, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        guard
            .get(&id)
            .map(|attempt| AttemptRow {
                id,
                attempt: attempt.clone(),
            })
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts_for_exam(
        &self,
        exam_id: ExamId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let mut rows = self.list_all_attempts().await?;
        rows.retain(|row| row.attempt.exam_id() == exam_id);
        Ok(rows)
    }

    async fn list_recent_attempts(&self, limit: u32) -> Result<Vec<AttemptRow>, StorageError> {
        let mut rows = self.list_all_attempts().await?;
        rows.reverse();
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn list_all_attempts(&self) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .map(|(id, attempt)| AttemptRow {
                id: *id,
                attempt: attempt.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.attempt
                .date()
                .cmp(&b.attempt.date())
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn delete_attempt(&self, id: AttemptId) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn delete_attempts_for_exam(&self, exam_id: ExamId) -> Result<u64, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|_, attempt| attempt.exam_id() != exam_id);
        Ok((before - guard.len()) as u64)
    }
}

#[async_trait]
impl BookmarkRepository for InMemoryRepository {
    async fn add_bookmark(&self, bookmark: &BookmarkedQuestion) -> Result<BookmarkId, StorageError> {
        let mut guard = self.bookmarks.lock().map_err(poisoned)?;
        let duplicate = guard.values().any(|b| {
            b.exam_id() == bookmark.exam_id() && b.question().id() == bookmark.question().id()
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        let id = BookmarkId::new(self.next_id());
        guard.insert(id, bookmark.clone());
        Ok(id)
    }

    async fn list_bookmarks(&self) -> Result<Vec<BookmarkRow>, StorageError> {
        let guard = self.bookmarks.lock().map_err(poisoned)?;
        let mut rows: Vec<BookmarkRow> = guard
            .iter()
            .map(|(id, bookmark)| BookmarkRow {
                id: *id,
                bookmark: bookmark.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.bookmark
                .bookmarked_at()
                .cmp(&a.bookmark.bookmarked_at())
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn find_bookmark(
        &self,
        exam_id: ExamId,
        question_id: &QuestionId,
    ) -> Result<Option<BookmarkRow>, StorageError> {
        let guard = self.bookmarks.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .find(|(_, b)| b.exam_id() == exam_id && b.question().id() == question_id)
            .map(|(id, bookmark)| BookmarkRow {
                id: *id,
                bookmark: bookmark.clone(),
            }))
    }

    async fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StorageError> {
        let mut guard = self.bookmarks.lock().map_err(poisoned)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn delete_bookmarks_for_exam(&self, exam_id: ExamId) -> Result<u64, StorageError> {
        let mut guard = self.bookmarks.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|_, b| b.exam_id() != exam_id);
        Ok((before - guard.len()) as u64)
    }
}

/// Aggregates the catalog repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub bookmarks: Arc<dyn BookmarkRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let bookmarks: Arc<dyn BookmarkRepository> = Arc::new(repo);
        Self {
            exams,
            attempts,
            bookmarks,
        }
    }
}
