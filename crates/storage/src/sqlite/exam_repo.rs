use exam_core::model::{Exam, ExamId, ExamStats, Question};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, exam_id_from_i64, i64_to_u32, map_question_row, ser, u64_to_i64};
use crate::repository::{ExamRepository, NewExamRecord, StorageError};

async fn insert_questions(
    tx: &mut Transaction<'_, Sqlite>,
    exam_id: i64,
    questions: &[Question],
) -> Result<(), StorageError> {
    for (position, question) in questions.iter().enumerate() {
        let options = serde_json::to_string(question.options()).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO questions (exam_id, position, id, text, options, correct_answer, category, year)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(exam_id)
        .bind(u64_to_i64("position", position as u64)?)
        .bind(question.id().as_str())
        .bind(question.text())
        .bind(options)
        .bind(question.correct_answer())
        .bind(question.category())
        .bind(question.year())
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO exams (name, subject, time_limit_minutes, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(exam.name)
        .bind(exam.subject)
        .bind(i64::from(exam.time_limit_minutes))
        .bind(exam.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let id = res.last_insert_rowid();
        insert_questions(&mut tx, id, &exam.questions).await?;
        tx.commit().await.map_err(conn)?;

        exam_id_from_i64(id)
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let id = u64_to_i64("exam_id", exam.id().value())?;
        let stats = exam.stats();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO exams (id, name, subject, time_limit_minutes, created_at, is_bookmarked, total_attempts, best_score, avg_score)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                subject = excluded.subject,
                time_limit_minutes = excluded.time_limit_minutes,
                is_bookmarked = excluded.is_bookmarked,
                total_attempts = excluded.total_attempts,
                best_score = excluded.best_score,
                avg_score = excluded.avg_score
            ",
        )
        .bind(id)
        .bind(exam.name())
        .bind(exam.subject())
        .bind(i64::from(exam.time_limit_minutes()))
        .bind(exam.created_at())
        .bind(i64::from(exam.is_bookmarked()))
        .bind(i64::from(stats.total_attempts))
        .bind(i64::from(stats.best_score))
        .bind(i64::from(stats.avg_score))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM questions WHERE exam_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        insert_questions(&mut tx, id, exam.questions()).await?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, subject, time_limit_minutes, created_at, is_bookmarked, total_attempts, best_score, avg_score
            FROM exams WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("exam_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => self.exam_from_row(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, subject, time_limit_minutes, created_at, is_bookmarked, total_attempts, best_score, avg_score
            FROM exams
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut exams = Vec::with_capacity(rows.len());
        for row in rows {
            exams.push(self.exam_from_row(&row).await?);
        }
        Ok(exams)
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM exams WHERE id = ?1")
            .bind(u64_to_i64("exam_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

impl SqliteRepository {
    async fn questions_for(&self, exam_id: i64) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, text, options, correct_answer, category, year
            FROM questions
            WHERE exam_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn exam_from_row(&self, row: &SqliteRow) -> Result<Exam, StorageError> {
        let raw_id: i64 = row.try_get("id").map_err(ser)?;
        let questions = self.questions_for(raw_id).await?;
        let stats = ExamStats {
            total_attempts: i64_to_u32(
                "total_attempts",
                row.try_get("total_attempts").map_err(ser)?,
            )?,
            best_score: i64_to_u32("best_score", row.try_get("best_score").map_err(ser)?)?,
            avg_score: i64_to_u32("avg_score", row.try_get("avg_score").map_err(ser)?)?,
        };

        Exam::from_persisted(
            exam_id_from_i64(raw_id)?,
            row.try_get::<String, _>("name").map_err(ser)?,
            row.try_get::<String, _>("subject").map_err(ser)?,
            i64_to_u32(
                "time_limit_minutes",
                row.try_get("time_limit_minutes").map_err(ser)?,
            )?,
            questions,
            row.try_get("created_at").map_err(ser)?,
            stats,
            row.try_get::<i64, _>("is_bookmarked").map_err(ser)? != 0,
        )
        .map_err(ser)
    }
}
