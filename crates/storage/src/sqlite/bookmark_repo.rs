use exam_core::model::{BookmarkId, BookmarkedQuestion, ExamId, Question, QuestionId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{bookmark_id_from_i64, conn, exam_id_from_i64, ser, u64_to_i64, write_err};
use crate::repository::{BookmarkRepository, BookmarkRow, StorageError};

#[async_trait::async_trait]
impl BookmarkRepository for SqliteRepository {
    async fn add_bookmark(&self, bookmark: &BookmarkedQuestion) -> Result<BookmarkId, StorageError> {
        let question = serde_json::to_string(bookmark.question()).map_err(ser)?;
        let res = sqlx::query(
            r"
            INSERT INTO bookmarks (exam_id, exam_name, question_id, question, bookmarked_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(u64_to_i64("exam_id", bookmark.exam_id().value())?)
        .bind(bookmark.exam_name())
        .bind(bookmark.question().id().as_str())
        .bind(question)
        .bind(bookmark.bookmarked_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        bookmark_id_from_i64(res.last_insert_rowid())
    }

    async fn list_bookmarks(&self) -> Result<Vec<BookmarkRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, exam_id, exam_name, question, bookmarked_at
            FROM bookmarks
            ORDER BY bookmarked_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(bookmark_from_row).collect()
    }

    async fn find_bookmark(
        &self,
        exam_id: ExamId,
        question_id: &QuestionId,
    ) -> Result<Option<BookmarkRow>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, exam_id, exam_name, question, bookmarked_at
            FROM bookmarks
            WHERE exam_id = ?1 AND question_id = ?2
            ",
        )
        .bind(u64_to_i64("exam_id", exam_id.value())?)
        .bind(question_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(bookmark_from_row).transpose()
    }

    async fn delete_bookmark(&self, id: BookmarkId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM bookmarks WHERE id = ?1")
            .bind(u64_to_i64("bookmark_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_bookmarks_for_exam(&self, exam_id: ExamId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM bookmarks WHERE exam_id = ?1")
            .bind(u64_to_i64("exam_id", exam_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}

fn bookmark_from_row(row: &SqliteRow) -> Result<BookmarkRow, StorageError> {
    let question: Question =
        serde_json::from_str(&row.try_get::<String, _>("question").map_err(ser)?).map_err(ser)?;
    question.validate().map_err(ser)?;

    Ok(BookmarkRow {
        id: bookmark_id_from_i64(row.try_get("id").map_err(ser)?)?,
        bookmark: BookmarkedQuestion::new(
            exam_id_from_i64(row.try_get("exam_id").map_err(ser)?)?,
            row.try_get::<String, _>("exam_name").map_err(ser)?,
            question,
            row.try_get("bookmarked_at").map_err(ser)?,
        ),
    })
}
