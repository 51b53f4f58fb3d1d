use exam_core::model::{AttemptId, ExamAttempt, ExamId, SubmittedAnswer};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    attempt_id_from_i64, conn, exam_id_from_i64, i64_to_u32, ser, u64_to_i64,
};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

const ATTEMPT_COLUMNS: &str =
    "id, exam_id, date, score, time_spent_secs, answered_questions, total_questions, answers";

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &ExamAttempt) -> Result<AttemptId, StorageError> {
        let answers = serde_json::to_string(attempt.submitted_answers()).map_err(ser)?;
        let res = sqlx::query(
            r"
            INSERT INTO attempts (exam_id, date, score, time_spent_secs, answered_questions, total_questions, answers)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(u64_to_i64("exam_id", attempt.exam_id().value())?)
        .bind(attempt.date())
        .bind(i64::from(attempt.score()))
        .bind(attempt.time_spent_secs())
        .bind(i64::from(attempt.answered_questions()))
        .bind(i64::from(attempt.total_questions()))
        .bind(answers)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        attempt_id_from_i64(res.last_insert_rowid())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRow, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(u64_to_i64("attempt_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref()
            .map(attempt_from_row)
            .transpose()?
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts_for_exam(
        &self,
        exam_id: ExamId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE exam_id = ?1 ORDER BY date ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(u64_to_i64("exam_id", exam_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(attempt_from_row).collect()
    }

    async fn list_recent_attempts(&self, limit: u32) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts ORDER BY date DESC, id DESC LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(attempt_from_row).collect()
    }

    async fn list_all_attempts(&self) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts ORDER BY date ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(attempt_from_row).collect()
    }

    async fn delete_attempt(&self, id: AttemptId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM attempts WHERE id = ?1")
            .bind(u64_to_i64("attempt_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_attempts_for_exam(&self, exam_id: ExamId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM attempts WHERE exam_id = ?1")
            .bind(u64_to_i64("exam_id", exam_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}

fn attempt_from_row(row: &SqliteRow) -> Result<AttemptRow, StorageError> {
    let answers: Vec<SubmittedAnswer> =
        serde_json::from_str(&row.try_get::<String, _>("answers").map_err(ser)?).map_err(ser)?;

    let attempt = ExamAttempt::from_persisted(
        exam_id_from_i64(row.try_get("exam_id").map_err(ser)?)?,
        row.try_get("date").map_err(ser)?,
        i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        row.try_get::<f64, _>("time_spent_secs").map_err(ser)?,
        i64_to_u32(
            "answered_questions",
            row.try_get("answered_questions").map_err(ser)?,
        )?,
        i64_to_u32("total_questions", row.try_get("total_questions").map_err(ser)?)?,
        answers,
    )
    .map_err(ser)?;

    Ok(AttemptRow {
        id: attempt_id_from_i64(row.try_get("id").map_err(ser)?)?,
        attempt,
    })
}
