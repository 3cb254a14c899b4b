use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::*;

use crate::config::Settings;
use crate::error::Result;
use crate::models::*;

pub mod memory;
pub mod pg;

pub use memory::MemoryStorage;
pub use pg::PgStorage;

/**
 * Persistence for polls, questions, choices and answers
 *
 * Implementations only store and fetch, every business rule lives in `crate::validation`.
 * Deleting a poll or question cascades to everything which hangs off of it.
 */
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll>;
    async fn poll(&self, id: i64) -> Result<Option<Poll>>;
    /**
     * All polls newest first, limited to those still running on `active_on` when given
     */
    async fn polls(&self, active_on: Option<NaiveDate>) -> Result<Vec<Poll>>;
    /**
     * Returns false when the poll no longer exists
     */
    async fn update_poll(&self, poll: &Poll) -> Result<bool>;
    async fn delete_poll(&self, id: i64) -> Result<bool>;

    /**
     * Insert the question and its choices together
     */
    async fn create_question(&self, poll_id: i64, question: &NewQuestion) -> Result<Question>;
    async fn question(&self, id: i64) -> Result<Option<Question>>;
    async fn questions(&self, poll_id: i64) -> Result<Vec<Question>>;
    /**
     * Update text and type, replacing the choices only when `choices` is given
     *
     * Switching between TEXT and a choice type deletes every answer to the question.
     */
    async fn update_question(&self, question: &Question, choices: Option<&[String]>)
        -> Result<bool>;
    async fn delete_question(&self, id: i64) -> Result<bool>;
    /**
     * Choices of all the given questions, ordered by id
     */
    async fn choices(&self, question_ids: &[i64]) -> Result<Vec<QuestionChoice>>;

    /**
     * A duplicate (user, question, choice) is reported as `Rejection::OptionAlreadyChosen`
     */
    async fn create_answer(&self, answer: &NewAnswer) -> Result<Answer>;
    async fn answers_for_question(&self, user_id: i64, question_id: i64) -> Result<Vec<Answer>>;
    /**
     * Every answer by the user, newest poll first and in submission order within a poll
     */
    async fn answers_by_user(&self, user_id: i64) -> Result<Vec<UserAnswer>>;
}

/**
 * Open the storage backend named by the settings, running migrations for postgres
 */
pub async fn open(settings: &Settings) -> Result<Arc<dyn Storage>> {
    match &settings.database_url {
        Some(url) => {
            let storage = PgStorage::connect(url, settings.max_connections).await?;
            storage.migrate().await?;
            info!("Connected to postgres");
            Ok(Arc::new(storage))
        }
        None => {
            warn!("DATABASE_URL is not set, polls and answers will only be kept in memory");
            Ok(Arc::new(MemoryStorage::default()))
        }
    }
}
