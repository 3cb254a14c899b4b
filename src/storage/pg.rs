use async_trait::async_trait;
use chrono::NaiveDate;
use log::*;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::Storage;
use crate::error::{Error, Result};
use crate::models::*;
use crate::validation::Rejection;

const POLL_COLUMNS: &str = "id, title, description, start_date, end_date";
const QUESTION_COLUMNS: &str = "id, poll_id, question_text, question_type";
const ANSWER_COLUMNS: &str = "id, user_id, poll_id, question_id, choice_id, answer_text";

/**
 * Storage backed by PostgreSQL through a sqlx connection pool
 */
#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /**
     * Create the sqlx connection pool for postgresql
     */
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(PgStorage { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll> {
        let sql = format!(
            "INSERT INTO polls (title, description, start_date, end_date) VALUES ($1, $2, $3, $4) RETURNING {}",
            POLL_COLUMNS
        );
        let created = sqlx::query_as::<_, Poll>(&sql)
            .bind(&poll.title)
            .bind(&poll.description)
            .bind(poll.start_date)
            .bind(poll.end_date)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn poll(&self, id: i64) -> Result<Option<Poll>> {
        let sql = format!("SELECT {} FROM polls WHERE id = $1", POLL_COLUMNS);
        Ok(sqlx::query_as::<_, Poll>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn polls(&self, active_on: Option<NaiveDate>) -> Result<Vec<Poll>> {
        let polls = match active_on {
            Some(day) => {
                let sql = format!(
                    "SELECT {} FROM polls WHERE end_date >= $1 ORDER BY id DESC",
                    POLL_COLUMNS
                );
                sqlx::query_as::<_, Poll>(&sql)
                    .bind(day)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM polls ORDER BY id DESC", POLL_COLUMNS);
                sqlx::query_as::<_, Poll>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(polls)
    }

    async fn update_poll(&self, poll: &Poll) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE polls SET title = $2, description = $3, start_date = $4, end_date = $5 WHERE id = $1",
        )
        .bind(poll.id)
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(poll.start_date)
        .bind(poll.end_date)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_poll(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_question(&self, poll_id: i64, question: &NewQuestion) -> Result<Question> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO questions (poll_id, question_text, question_type) VALUES ($1, $2, $3) RETURNING {}",
            QUESTION_COLUMNS
        );
        let created = sqlx::query_as::<_, Question>(&sql)
            .bind(poll_id)
            .bind(&question.question_text)
            .bind(question.question_type)
            .fetch_one(&mut *tx)
            .await?;

        /*
         * There doesn't seem to be a cleaner way to do a multiple insert with sqlx
         * that doesn't involve some string manipulation
         */
        for choice in question.choices.iter() {
            sqlx::query("INSERT INTO question_choices (question_id, choice_text) VALUES ($1, $2)")
                .bind(created.id)
                .bind(choice)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn question(&self, id: i64) -> Result<Option<Question>> {
        let sql = format!("SELECT {} FROM questions WHERE id = $1", QUESTION_COLUMNS);
        Ok(sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn questions(&self, poll_id: i64) -> Result<Vec<Question>> {
        let sql = format!(
            "SELECT {} FROM questions WHERE poll_id = $1 ORDER BY id ASC",
            QUESTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Question>(&sql)
            .bind(poll_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_question(
        &self,
        question: &Question,
        choices: Option<&[String]>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<QuestionType> =
            sqlx::query_scalar("SELECT question_type FROM questions WHERE id = $1 FOR UPDATE")
                .bind(question.id)
                .fetch_optional(&mut *tx)
                .await?;
        let previous = match previous {
            Some(previous) => previous,
            None => return Ok(false),
        };

        sqlx::query("UPDATE questions SET question_text = $2, question_type = $3 WHERE id = $1")
            .bind(question.id)
            .bind(&question.question_text)
            .bind(question.question_type)
            .execute(&mut *tx)
            .await?;

        if previous.takes_choices() != question.question_type.takes_choices() {
            debug!("Question {} changed kind, dropping its answers", question.id);
            sqlx::query("DELETE FROM answers WHERE question_id = $1")
                .bind(question.id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(choices) = choices {
            sqlx::query("DELETE FROM question_choices WHERE question_id = $1")
                .bind(question.id)
                .execute(&mut *tx)
                .await?;
            for choice in choices.iter() {
                sqlx::query(
                    "INSERT INTO question_choices (question_id, choice_text) VALUES ($1, $2)",
                )
                .bind(question.id)
                .bind(choice)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_question(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn choices(&self, question_ids: &[i64]) -> Result<Vec<QuestionChoice>> {
        Ok(sqlx::query_as::<_, QuestionChoice>(
            "SELECT id, question_id, choice_text FROM question_choices WHERE question_id = ANY($1) ORDER BY id ASC",
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_answer(&self, answer: &NewAnswer) -> Result<Answer> {
        let sql = format!(
            "INSERT INTO answers (user_id, poll_id, question_id, choice_id, answer_text) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ANSWER_COLUMNS
        );
        let created = sqlx::query_as::<_, Answer>(&sql)
            .bind(answer.user_id)
            .bind(answer.poll_id)
            .bind(answer.question_id)
            .bind(answer.choice_id)
            .bind(answer.answer_text.as_deref().unwrap_or(""))
            .fetch_one(&self.pool)
            .await;

        match created {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!("Duplicate answer rejected by constraint: {}", db);
                Err(Rejection::OptionAlreadyChosen.into())
            }
            Err(err) => {
                error!("Failed to insert answer: {:?}", err);
                Err(Error::Database(err))
            }
        }
    }

    async fn answers_for_question(&self, user_id: i64, question_id: i64) -> Result<Vec<Answer>> {
        let sql = format!(
            "SELECT {} FROM answers WHERE user_id = $1 AND question_id = $2 ORDER BY id ASC",
            ANSWER_COLUMNS
        );
        Ok(sqlx::query_as::<_, Answer>(&sql)
            .bind(user_id)
            .bind(question_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn answers_by_user(&self, user_id: i64) -> Result<Vec<UserAnswer>> {
        Ok(sqlx::query_as::<_, UserAnswer>(
            "SELECT p.id AS poll_id, p.title AS poll_title, p.description AS poll_description,
                    q.id AS question_id, q.question_type, q.question_text,
                    a.answer_text, c.choice_text
               FROM answers a
               JOIN polls p ON p.id = a.poll_id
               JOIN questions q ON q.id = a.question_id
               LEFT JOIN question_choices c ON c.id = a.choice_id
              WHERE a.user_id = $1
              ORDER BY p.id DESC, a.id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
