use std::collections::BTreeMap;

use async_std::sync::RwLock;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::Storage;
use crate::error::Result;
use crate::models::*;
use crate::validation::Rejection;

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    polls: BTreeMap<i64, Poll>,
    questions: BTreeMap<i64, Question>,
    choices: BTreeMap<i64, QuestionChoice>,
    answers: BTreeMap<i64, Answer>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn insert_choices(&mut self, question_id: i64, choices: &[String]) {
        for choice_text in choices.iter() {
            let id = self.next_id();
            self.choices.insert(
                id,
                QuestionChoice {
                    id,
                    question_id,
                    choice_text: choice_text.clone(),
                },
            );
        }
    }

    fn remove_choices_of(&mut self, question_id: i64) {
        let removed: Vec<i64> = self
            .choices
            .values()
            .filter(|c| c.question_id == question_id)
            .map(|c| c.id)
            .collect();
        self.choices.retain(|_, c| c.question_id != question_id);
        self.answers
            .retain(|_, a| a.choice_id.map_or(true, |id| !removed.contains(&id)));
    }

    fn remove_question(&mut self, question_id: i64) -> bool {
        if self.questions.remove(&question_id).is_none() {
            return false;
        }
        self.remove_choices_of(question_id);
        self.answers.retain(|_, a| a.question_id != question_id);
        true
    }
}

/**
 * Storage which keeps everything in process memory
 *
 * Used when no DATABASE_URL is configured, and by the tests. Ids come from a single sequence
 * shared by all tables, so they are unique across record kinds.
 */
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let created = Poll {
            id,
            title: poll.title.clone(),
            description: poll.description.clone(),
            start_date: poll.start_date,
            end_date: poll.end_date,
        };
        tables.polls.insert(id, created.clone());
        Ok(created)
    }

    async fn poll(&self, id: i64) -> Result<Option<Poll>> {
        Ok(self.tables.read().await.polls.get(&id).cloned())
    }

    async fn polls(&self, active_on: Option<NaiveDate>) -> Result<Vec<Poll>> {
        let tables = self.tables.read().await;
        Ok(tables
            .polls
            .values()
            .rev()
            .filter(|p| active_on.map_or(true, |day| p.end_date >= day))
            .cloned()
            .collect())
    }

    async fn update_poll(&self, poll: &Poll) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.polls.get_mut(&poll.id) {
            Some(stored) => {
                *stored = poll.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_poll(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.polls.remove(&id).is_none() {
            return Ok(false);
        }
        let questions: Vec<i64> = tables
            .questions
            .values()
            .filter(|q| q.poll_id == id)
            .map(|q| q.id)
            .collect();
        for question_id in questions {
            tables.remove_question(question_id);
        }
        tables.answers.retain(|_, a| a.poll_id != id);
        Ok(true)
    }

    async fn create_question(&self, poll_id: i64, question: &NewQuestion) -> Result<Question> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let created = Question {
            id,
            poll_id,
            question_text: question.question_text.clone(),
            question_type: question.question_type,
        };
        tables.questions.insert(id, created.clone());
        tables.insert_choices(id, &question.choices);
        Ok(created)
    }

    async fn question(&self, id: i64) -> Result<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn questions(&self, poll_id: i64) -> Result<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| q.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn update_question(
        &self,
        question: &Question,
        choices: Option<&[String]>,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let previous = match tables.questions.get_mut(&question.id) {
            Some(stored) => {
                let previous = stored.question_type;
                stored.question_text = question.question_text.clone();
                stored.question_type = question.question_type;
                previous
            }
            None => return Ok(false),
        };
        if previous.takes_choices() != question.question_type.takes_choices() {
            tables.answers.retain(|_, a| a.question_id != question.id);
        }
        if let Some(choices) = choices {
            tables.remove_choices_of(question.id);
            tables.insert_choices(question.id, choices);
        }
        Ok(true)
    }

    async fn delete_question(&self, id: i64) -> Result<bool> {
        Ok(self.tables.write().await.remove_question(id))
    }

    async fn choices(&self, question_ids: &[i64]) -> Result<Vec<QuestionChoice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .choices
            .values()
            .filter(|c| question_ids.contains(&c.question_id))
            .cloned()
            .collect())
    }

    async fn create_answer(&self, answer: &NewAnswer) -> Result<Answer> {
        let mut tables = self.tables.write().await;

        // mirrors the (user_id, question_id, choice_id) unique constraint in postgres
        if answer.choice_id.is_some()
            && tables.answers.values().any(|a| {
                a.user_id == answer.user_id
                    && a.question_id == answer.question_id
                    && a.choice_id == answer.choice_id
            })
        {
            return Err(Rejection::OptionAlreadyChosen.into());
        }

        let id = tables.next_id();
        let created = Answer {
            id,
            user_id: answer.user_id,
            poll_id: answer.poll_id,
            question_id: answer.question_id,
            choice_id: answer.choice_id,
            answer_text: answer.answer_text.clone().unwrap_or_default(),
        };
        tables.answers.insert(id, created.clone());
        Ok(created)
    }

    async fn answers_for_question(&self, user_id: i64, question_id: i64) -> Result<Vec<Answer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .values()
            .filter(|a| a.user_id == user_id && a.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn answers_by_user(&self, user_id: i64) -> Result<Vec<UserAnswer>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<(i64, i64, UserAnswer)> = vec![];

        for answer in tables.answers.values().filter(|a| a.user_id == user_id) {
            let (poll, question) = match (
                tables.polls.get(&answer.poll_id),
                tables.questions.get(&answer.question_id),
            ) {
                (Some(p), Some(q)) => (p, q),
                _ => continue,
            };
            let choice_text = answer
                .choice_id
                .and_then(|id| tables.choices.get(&id))
                .map(|c| c.choice_text.clone());

            rows.push((
                poll.id,
                answer.id,
                UserAnswer {
                    poll_id: poll.id,
                    poll_title: poll.title.clone(),
                    poll_description: poll.description.clone(),
                    question_id: question.id,
                    question_type: question.question_type,
                    question_text: question.question_text.clone(),
                    answer_text: answer.answer_text.clone(),
                    choice_text,
                },
            ));
        }

        rows.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(rows.into_iter().map(|(_, _, row)| row).collect())
    }
}
