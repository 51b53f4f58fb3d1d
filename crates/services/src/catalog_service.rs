use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use exam_core::model::{
    AttemptId, BookmarkId, BookmarkedQuestion, Exam, ExamAttempt, ExamId, ExamStats, Question,
    QuestionId,
};
use exam_core::scoring::div_round_half_up;
use storage::repository::{
    AttemptRepository, AttemptRow, BookmarkRepository, BookmarkRow, ExamRepository, NewExamRecord,
    Storage, StorageError,
};

use crate::Clock;
use crate::error::CatalogError;
use crate::import::import_questions;

//
// ─── QUERIES ───────────────────────────────────────────────────────────────────
//

/// Ordering of the exam list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamSort {
    /// Newest first.
    #[default]
    Recent,
    Oldest,
    NameAsc,
    NameDesc,
    /// Most attempted first.
    Attempts,
    /// Highest best score first.
    Score,
}

impl ExamSort {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamSort::Recent => "recent",
            ExamSort::Oldest => "oldest",
            ExamSort::NameAsc => "name-asc",
            ExamSort::NameDesc => "name-desc",
            ExamSort::Attempts => "attempts",
            ExamSort::Score => "score",
        }
    }

    fn compare(self, a: &Exam, b: &Exam) -> Ordering {
        let by_name = || a.name().to_lowercase().cmp(&b.name().to_lowercase());
        let ordering = match self {
            ExamSort::Recent => b.created_at().cmp(&a.created_at()),
            ExamSort::Oldest => a.created_at().cmp(&b.created_at()),
            ExamSort::NameAsc => by_name(),
            ExamSort::NameDesc => by_name().reverse(),
            ExamSort::Attempts => b.stats().total_attempts.cmp(&a.stats().total_attempts),
            ExamSort::Score => b.stats().best_score.cmp(&a.stats().best_score),
        };
        ordering.then_with(|| a.id().cmp(&b.id()))
    }
}

impl fmt::Display for ExamSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSort(pub String);

impl fmt::Display for UnknownSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown sort `{}` (expected recent, oldest, name-asc, name-desc, attempts or score)",
            self.0
        )
    }
}

impl std::error::Error for UnknownSort {}

impl FromStr for ExamSort {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "recent" => Ok(ExamSort::Recent),
            "oldest" => Ok(ExamSort::Oldest),
            "name-asc" => Ok(ExamSort::NameAsc),
            "name-desc" => Ok(ExamSort::NameDesc),
            "attempts" => Ok(ExamSort::Attempts),
            "score" => Ok(ExamSort::Score),
            other => Err(UnknownSort(other.to_owned())),
        }
    }
}

/// Filter and ordering for [`ExamCatalogService::list_exams`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamQuery {
    /// Case-insensitive substring of the exam name; blank matches everything.
    pub search: Option<String>,
    pub sort: ExamSort,
}

impl ExamQuery {
    fn matches(&self, exam: &Exam) -> bool {
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => exam
                .name()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

/// Catalog-wide counters for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_exams: usize,
    pub total_attempts: usize,
    /// Mean attempt percentage, rounded half up; 0 without attempts.
    pub avg_score: u32,
    pub total_bookmarks: usize,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Owns exams, their recorded attempts and bookmarked questions.
#[derive(Clone)]
pub struct ExamCatalogService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    attempts: Arc<dyn AttemptRepository>,
    bookmarks: Arc<dyn BookmarkRepository>,
}

impl ExamCatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        attempts: Arc<dyn AttemptRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
    ) -> Self {
        Self {
            clock,
            exams,
            attempts,
            bookmarks,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.bookmarks),
        )
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // ─── Exams ──────────────────────────────────────────────────────────────

    /// Validate and persist a new exam, returning it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Exam` for validation failures.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn create_exam(
        &self,
        name: impl Into<String>,
        subject: impl Into<String>,
        time_limit_minutes: u32,
        questions: Vec<Question>,
    ) -> Result<Exam, CatalogError> {
        let draft = Exam::new(
            ExamId::new(0),
            name,
            subject,
            time_limit_minutes,
            questions,
            self.clock.now(),
        )?;
        let id = self
            .exams
            .insert_new_exam(NewExamRecord::from_exam(&draft))
            .await?;
        tracing::info!(exam_id = %id, name = draft.name(), "exam created");
        Ok(draft.with_id(id))
    }

    /// Create an exam from a JSON question file; every question is filed under `subject`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Import` when the file is rejected, otherwise as
    /// [`Self::create_exam`].
    pub async fn import_exam(
        &self,
        name: impl Into<String>,
        subject: impl Into<String>,
        time_limit_minutes: u32,
        json: &str,
    ) -> Result<Exam, CatalogError> {
        let subject = subject.into();
        let questions = import_questions(json, &subject)?;
        tracing::debug!(count = questions.len(), "question file parsed");
        self.create_exam(name, subject, time_limit_minutes, questions)
            .await
    }

    /// Fetch an exam by ID; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, CatalogError> {
        Ok(self.exams.get_exam(id).await?)
    }

    /// Fetch an exam that must exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ExamNotFound` when it does not.
    pub async fn require_exam(&self, id: ExamId) -> Result<Exam, CatalogError> {
        self.get_exam(id)
            .await?
            .ok_or(CatalogError::ExamNotFound(id))
    }

    /// Exams matching `query`, in its order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_exams(&self, query: &ExamQuery) -> Result<Vec<Exam>, CatalogError> {
        let mut exams: Vec<Exam> = self
            .exams
            .list_exams()
            .await?
            .into_iter()
            .filter(|exam| query.matches(exam))
            .collect();
        exams.sort_by(|a, b| query.sort.compare(a, b));
        Ok(exams)
    }

    /// Remove an exam together with its attempts and bookmarked questions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ExamNotFound` if the exam does not exist.
    pub async fn remove_exam(&self, id: ExamId) -> Result<(), CatalogError> {
        let attempts = self.attempts.delete_attempts_for_exam(id).await?;
        let bookmarks = self.bookmarks.delete_bookmarks_for_exam(id).await?;
        match self.exams.delete_exam(id).await {
            Ok(()) => {}
            Err(StorageError::NotFound) => return Err(CatalogError::ExamNotFound(id)),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(exam_id = %id, attempts, bookmarks, "exam removed");
        Ok(())
    }

    /// Flag or unflag a whole exam as bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ExamNotFound` if the exam does not exist.
    pub async fn set_exam_bookmarked(
        &self,
        id: ExamId,
        bookmarked: bool,
    ) -> Result<Exam, CatalogError> {
        let mut exam = self.require_exam(id).await?;
        exam.set_bookmarked(bookmarked);
        self.exams.upsert_exam(&exam).await?;
        Ok(exam)
    }

    // ─── Bookmarked questions ───────────────────────────────────────────────

    /// Snapshot question `index` of `exam` into the bookmark list.
    ///
    /// Bookmarking an already bookmarked question returns the existing id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::QuestionOutOfRange` for a bad index.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn bookmark_question(
        &self,
        exam: &Exam,
        index: usize,
    ) -> Result<BookmarkId, CatalogError> {
        let bookmark = BookmarkedQuestion::from_exam(exam, index, self.clock.now()).ok_or(
            CatalogError::QuestionOutOfRange {
                index,
                len: exam.question_count(),
            },
        )?;
        if let Some(existing) = self
            .bookmarks
            .find_bookmark(exam.id(), bookmark.question().id())
            .await?
        {
            return Ok(existing.id);
        }
        let id = self.bookmarks.add_bookmark(&bookmark).await?;
        tracing::debug!(exam_id = %exam.id(), question = %bookmark.question().id(), "question bookmarked");
        Ok(id)
    }

    /// Drop the bookmark on one question; returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn unbookmark_question(
        &self,
        exam_id: ExamId,
        question_id: &QuestionId,
    ) -> Result<bool, CatalogError> {
        match self.bookmarks.find_bookmark(exam_id, question_id).await? {
            Some(row) => {
                self.bookmarks.delete_bookmark(row.id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Positions of the questions of `exam` that have a stored bookmark.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn bookmarked_positions(&self, exam: &Exam) -> Result<Vec<usize>, CatalogError> {
        let mut positions = Vec::new();
        for (index, question) in exam.questions().iter().enumerate() {
            if self
                .bookmarks
                .find_bookmark(exam.id(), question.id())
                .await?
                .is_some()
            {
                positions.push(index);
            }
        }
        Ok(positions)
    }

    /// Remove a bookmark by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` (`NotFound`) if it does not exist.
    pub async fn remove_bookmark(&self, id: BookmarkId) -> Result<(), CatalogError> {
        Ok(self.bookmarks.delete_bookmark(id).await?)
    }

    /// Bookmarked questions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_bookmarks(&self) -> Result<Vec<BookmarkRow>, CatalogError> {
        Ok(self.bookmarks.list_bookmarks().await?)
    }

    // ─── Attempts ───────────────────────────────────────────────────────────

    /// Append an attempt and refresh the exam's stats from all of its attempts.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ExamNotFound` if the attempt's exam is gone.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn record_attempt(&self, attempt: &ExamAttempt) -> Result<AttemptId, CatalogError> {
        let exam = self.require_exam(attempt.exam_id()).await?;
        let id = self.attempts.append_attempt(attempt).await?;
        let stats = self.refresh_stats(exam).await?;
        tracing::info!(
            exam_id = %attempt.exam_id(),
            attempt_id = %id,
            score = attempt.score(),
            best = stats.best_score,
            "attempt recorded"
        );
        Ok(id)
    }

    /// Delete an attempt and refresh its exam's stats.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` (`NotFound`) if the attempt does not exist.
    pub async fn remove_attempt(&self, id: AttemptId) -> Result<(), CatalogError> {
        let row = self.attempts.get_attempt(id).await?;
        self.attempts.delete_attempt(id).await?;
        if let Some(exam) = self.get_exam(row.attempt.exam_id()).await? {
            self.refresh_stats(exam).await?;
        }
        Ok(())
    }

    /// Most recent attempts across all exams.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn recent_attempts(&self, limit: u32) -> Result<Vec<AttemptRow>, CatalogError> {
        Ok(self.attempts.list_recent_attempts(limit).await?)
    }

    /// Attempts of one exam, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn attempts_for_exam(&self, id: ExamId) -> Result<Vec<AttemptRow>, CatalogError> {
        Ok(self.attempts.list_attempts_for_exam(id).await?)
    }

    /// Totals across the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, CatalogError> {
        let total_exams = self.exams.list_exams().await?.len();
        let attempts = self.attempts.list_all_attempts().await?;
        let total_bookmarks = self.bookmarks.list_bookmarks().await?.len();

        let sum: u64 = attempts.iter().map(|r| u64::from(r.attempt.score())).sum();
        let avg = div_round_half_up(sum, attempts.len() as u64);

        Ok(DashboardStats {
            total_exams,
            total_attempts: attempts.len(),
            avg_score: u32::try_from(avg).unwrap_or(100),
            total_bookmarks,
        })
    }

    async fn refresh_stats(&self, mut exam: Exam) -> Result<ExamStats, CatalogError> {
        let scores: Vec<u32> = self
            .attempts
            .list_attempts_for_exam(exam.id())
            .await?
            .iter()
            .map(|row| row.attempt.score())
            .collect();
        let stats = ExamStats::from_scores(&scores);
        exam.set_stats(stats);
        self.exams.upsert_exam(&exam).await?;
        Ok(stats)
    }
}
