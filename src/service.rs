use std::sync::Arc;

use chrono::NaiveDate;
use log::*;

use crate::error::{Error, Result};
use crate::models::*;
use crate::storage::Storage;
use crate::validation::{self, Rejection};

/**
 * A question together with its choices, ordered by id
 */
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionWithChoices {
    pub question: Question,
    pub choices: Vec<QuestionChoice>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PollDetail {
    pub poll: Poll,
    pub questions: Vec<QuestionWithChoices>,
}

/**
 * All of a user's answers within one poll
 */
#[derive(Clone, Debug, PartialEq)]
pub struct PollAnswers {
    pub poll_id: i64,
    pub poll_title: String,
    pub poll_description: String,
    pub answers: Vec<UserAnswer>,
}

/**
 * The use-cases of the polls API, every handler goes through here
 */
#[derive(Clone)]
pub struct PollService {
    storage: Arc<dyn Storage>,
}

impl PollService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        PollService { storage }
    }

    async fn require_poll(&self, id: i64) -> Result<Poll> {
        self.storage
            .poll(id)
            .await?
            .ok_or_else(|| Error::not_found("Poll", id))
    }

    /**
     * Look up a question, treating one which belongs to another poll as missing
     */
    async fn require_question(&self, poll_id: i64, question_id: i64) -> Result<Question> {
        match self.storage.question(question_id).await? {
            Some(question) if question.poll_id == poll_id => Ok(question),
            _ => Err(Error::not_found("Question", question_id)),
        }
    }

    async fn with_choices(&self, questions: Vec<Question>) -> Result<Vec<QuestionWithChoices>> {
        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let mut choices = self.storage.choices(&ids).await?;

        Ok(questions
            .into_iter()
            .map(|question| {
                let (mine, rest): (Vec<_>, Vec<_>) = choices
                    .drain(..)
                    .partition(|c| c.question_id == question.id);
                choices = rest;
                QuestionWithChoices {
                    question,
                    choices: mine,
                }
            })
            .collect())
    }

    pub async fn create_poll(&self, poll: NewPoll) -> Result<Poll> {
        let poll = poll.trimmed();
        validation::check_new_poll(&poll)?;
        let created = self.storage.create_poll(&poll).await?;
        info!("Created poll {}: {:?}", created.id, created.title);
        Ok(created)
    }

    pub async fn poll(&self, id: i64) -> Result<Poll> {
        self.require_poll(id).await
    }

    pub async fn update_poll(&self, id: i64, changes: PollChanges) -> Result<Poll> {
        let current = self.require_poll(id).await?;
        let updated = validation::check_poll_changes(&current, &changes)?;
        if !self.storage.update_poll(&updated).await? {
            return Err(Error::not_found("Poll", id));
        }
        info!("Updated poll {}", id);
        Ok(updated)
    }

    pub async fn delete_poll(&self, id: i64) -> Result<()> {
        if !self.storage.delete_poll(id).await? {
            return Err(Error::not_found("Poll", id));
        }
        info!("Deleted poll {}", id);
        Ok(())
    }

    /**
     * Polls which have not ended as of `today`, newest first
     */
    pub async fn active_polls(&self, today: NaiveDate) -> Result<Vec<Poll>> {
        self.storage.polls(Some(today)).await
    }

    pub async fn all_polls(&self) -> Result<Vec<Poll>> {
        self.storage.polls(None).await
    }

    pub async fn poll_detail(&self, id: i64) -> Result<PollDetail> {
        let poll = self.require_poll(id).await?;
        debug!("Fetching questions for poll {}", id);
        let questions = self.storage.questions(id).await?;
        Ok(PollDetail {
            poll,
            questions: self.with_choices(questions).await?,
        })
    }

    pub async fn questions(&self, poll_id: i64) -> Result<Vec<QuestionWithChoices>> {
        self.require_poll(poll_id).await?;
        let questions = self.storage.questions(poll_id).await?;
        self.with_choices(questions).await
    }

    pub async fn question(&self, poll_id: i64, question_id: i64) -> Result<QuestionWithChoices> {
        let question = self.require_question(poll_id, question_id).await?;
        let mut found = self.with_choices(vec![question]).await?;
        found
            .pop()
            .ok_or_else(|| Error::not_found("Question", question_id))
    }

    pub async fn create_question(
        &self,
        poll_id: i64,
        question: NewQuestion,
    ) -> Result<QuestionWithChoices> {
        self.require_poll(poll_id).await?;
        validation::check_question(&question)?;
        let created = self.storage.create_question(poll_id, &question).await?;
        info!(
            "Created {:?} question {} in poll {}",
            created.question_type, created.id, poll_id
        );
        self.question(poll_id, created.id).await
    }

    /**
     * Replace text, type and choices of a question wholesale
     */
    pub async fn replace_question(
        &self,
        poll_id: i64,
        question_id: i64,
        question: NewQuestion,
    ) -> Result<QuestionWithChoices> {
        let current = self.require_question(poll_id, question_id).await?;
        validation::check_question(&question)?;

        let updated = Question {
            question_text: question.question_text,
            question_type: question.question_type,
            ..current
        };
        if !self
            .storage
            .update_question(&updated, Some(question.choices.as_slice()))
            .await?
        {
            return Err(Error::not_found("Question", question_id));
        }
        info!("Replaced question {} in poll {}", question_id, poll_id);
        self.question(poll_id, question_id).await
    }

    pub async fn update_question(
        &self,
        poll_id: i64,
        question_id: i64,
        changes: QuestionChanges,
    ) -> Result<QuestionWithChoices> {
        let current = self.require_question(poll_id, question_id).await?;
        let existing = self.storage.choices(&[question_id]).await?;
        let (merged, replacement) =
            validation::merge_question_changes(&current, &existing, &changes)?;

        let updated = Question {
            question_text: merged.question_text,
            question_type: merged.question_type,
            ..current
        };
        if !self
            .storage
            .update_question(&updated, replacement.as_deref())
            .await?
        {
            return Err(Error::not_found("Question", question_id));
        }
        info!("Updated question {} in poll {}", question_id, poll_id);
        self.question(poll_id, question_id).await
    }

    pub async fn delete_question(&self, poll_id: i64, question_id: i64) -> Result<()> {
        self.require_question(poll_id, question_id).await?;
        if !self.storage.delete_question(question_id).await? {
            return Err(Error::not_found("Question", question_id));
        }
        info!("Deleted question {} from poll {}", question_id, poll_id);
        Ok(())
    }

    /**
     * Validate and record a single answer
     */
    pub async fn submit_answer(&self, answer: NewAnswer) -> Result<Answer> {
        let poll = self.require_poll(answer.poll_id).await?;
        let question = self
            .storage
            .question(answer.question_id)
            .await?
            .ok_or(Rejection::UnknownQuestion(answer.question_id))?;
        let choices = self.storage.choices(&[question.id]).await?;
        let prior = self
            .storage
            .answers_for_question(answer.user_id, question.id)
            .await?;

        if let Err(rejection) =
            validation::check_answer(&poll, &question, &choices, &prior, &answer)
        {
            debug!(
                "Rejected answer from user {} to question {}: {}",
                answer.user_id, question.id, rejection
            );
            return Err(rejection.into());
        }

        let created = self.storage.create_answer(&answer).await?;
        info!(
            "Recorded answer {} from user {} to question {} in poll {}",
            created.id, created.user_id, created.question_id, created.poll_id
        );
        Ok(created)
    }

    /**
     * Every answer the user has given, grouped per poll with the newest poll first
     */
    pub async fn user_answers(&self, user_id: i64) -> Result<Vec<PollAnswers>> {
        let mut report: Vec<PollAnswers> = vec![];

        for row in self.storage.answers_by_user(user_id).await? {
            match report.last_mut() {
                Some(current) if current.poll_id == row.poll_id => current.answers.push(row),
                _ => report.push(PollAnswers {
                    poll_id: row.poll_id,
                    poll_title: row.poll_title.clone(),
                    poll_description: row.poll_description.clone(),
                    answers: vec![row],
                }),
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn service() -> PollService {
        PollService::new(Arc::new(MemoryStorage::default()))
    }

    fn new_poll() -> NewPoll {
        NewPoll {
            title: " testtitle ".into(),
            description: "testdescription".into(),
            start_date: date("2021-12-26"),
            end_date: date("2022-12-31"),
        }
    }

    fn text_question() -> NewQuestion {
        NewQuestion {
            question_text: "Write your name".into(),
            question_type: QuestionType::Text,
            choices: vec![],
        }
    }

    fn choice_question(question_type: QuestionType) -> NewQuestion {
        NewQuestion {
            question_text: "Choose something".into(),
            question_type,
            choices: vec!["First choice".into(), "Second choice".into()],
        }
    }

    fn rejection(err: Error) -> Rejection {
        match err {
            Error::Rejected(r) => r,
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[async_std::test]
    async fn created_polls_are_trimmed_and_validated() {
        let polls = service();
        let poll = polls.create_poll(new_poll()).await.unwrap();
        assert_eq!(poll.title, "testtitle");

        let bad = NewPoll {
            end_date: date("2021-12-20"),
            ..new_poll()
        };
        assert_eq!(
            rejection(polls.create_poll(bad).await.unwrap_err()),
            Rejection::EndBeforeStart
        );
        assert_eq!(polls.all_polls().await.unwrap().len(), 1);
    }

    #[async_std::test]
    async fn missing_polls_are_not_found() {
        let polls = service();
        assert!(matches!(polls.poll(222).await, Err(Error::NotFound(_))));
        assert!(matches!(polls.delete_poll(222).await, Err(Error::NotFound(_))));
        assert!(matches!(
            polls.create_question(222, text_question()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[async_std::test]
    async fn questions_are_scoped_to_their_poll() {
        let polls = service();
        let one = polls.create_poll(new_poll()).await.unwrap();
        let two = polls.create_poll(new_poll()).await.unwrap();
        let question = polls.create_question(one.id, text_question()).await.unwrap();

        assert!(matches!(
            polls.question(two.id, question.question.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            polls.delete_question(two.id, question.question.id).await,
            Err(Error::NotFound(_))
        ));
        polls.delete_question(one.id, question.question.id).await.unwrap();
        assert!(polls.questions(one.id).await.unwrap().is_empty());
    }

    #[async_std::test]
    async fn poll_detail_groups_choices_under_questions() {
        let polls = service();
        let poll = polls.create_poll(new_poll()).await.unwrap();
        polls.create_question(poll.id, text_question()).await.unwrap();
        polls
            .create_question(poll.id, choice_question(QuestionType::Choice))
            .await
            .unwrap();

        let detail = polls.poll_detail(poll.id).await.unwrap();
        assert_eq!(detail.questions.len(), 2);
        assert!(detail.questions[0].choices.is_empty());
        let texts: Vec<&str> = detail.questions[1]
            .choices
            .iter()
            .map(|c| c.choice_text.as_str())
            .collect();
        assert_eq!(texts, vec!["First choice", "Second choice"]);
    }

    #[async_std::test]
    async fn failed_question_updates_leave_the_question_alone() {
        let polls = service();
        let poll = polls.create_poll(new_poll()).await.unwrap();
        let created = polls
            .create_question(poll.id, choice_question(QuestionType::Choice))
            .await
            .unwrap();

        let bad = NewQuestion {
            question_type: QuestionType::Text,
            ..choice_question(QuestionType::Choice)
        };
        assert_eq!(
            rejection(
                polls
                    .replace_question(poll.id, created.question.id, bad)
                    .await
                    .unwrap_err()
            ),
            Rejection::ChoicesNotAllowed
        );
        assert_eq!(
            polls.question(poll.id, created.question.id).await.unwrap(),
            created
        );
    }

    #[async_std::test]
    async fn answers_follow_the_rules() {
        let polls = service();
        let poll = polls.create_poll(new_poll()).await.unwrap();
        let text = polls.create_question(poll.id, text_question()).await.unwrap();
        let multi = polls
            .create_question(poll.id, choice_question(QuestionType::MultiChoice))
            .await
            .unwrap();

        let text_answer = NewAnswer {
            user_id: 1,
            poll_id: poll.id,
            question_id: text.question.id,
            choice_id: None,
            answer_text: Some("My name is Paul".into()),
        };
        polls.submit_answer(text_answer.clone()).await.unwrap();
        assert_eq!(
            rejection(polls.submit_answer(text_answer).await.unwrap_err()),
            Rejection::AlreadyAnswered
        );

        for choice in multi.choices.iter() {
            polls
                .submit_answer(NewAnswer {
                    user_id: 1,
                    poll_id: poll.id,
                    question_id: multi.question.id,
                    choice_id: Some(choice.id),
                    answer_text: None,
                })
                .await
                .unwrap();
        }
        let again = NewAnswer {
            user_id: 1,
            poll_id: poll.id,
            question_id: multi.question.id,
            choice_id: Some(multi.choices[0].id),
            answer_text: None,
        };
        assert_eq!(
            rejection(polls.submit_answer(again).await.unwrap_err()),
            Rejection::OptionAlreadyChosen
        );

        let unknown = NewAnswer {
            user_id: 1,
            poll_id: poll.id,
            question_id: 999,
            choice_id: None,
            answer_text: Some("?".into()),
        };
        assert_eq!(
            rejection(polls.submit_answer(unknown).await.unwrap_err()),
            Rejection::UnknownQuestion(999)
        );
    }

    #[async_std::test]
    async fn user_answers_are_grouped_per_poll() {
        let polls = service();
        let poll = polls.create_poll(new_poll()).await.unwrap();
        let text = polls.create_question(poll.id, text_question()).await.unwrap();
        let choice = polls
            .create_question(poll.id, choice_question(QuestionType::Choice))
            .await
            .unwrap();

        for (user_id, question, choice_id, answer_text) in vec![
            (1, &text, None, Some("Paul")),
            (1, &choice, Some(choice.choices[0].id), None),
            (2, &choice, Some(choice.choices[0].id), None),
        ] {
            polls
                .submit_answer(NewAnswer {
                    user_id,
                    poll_id: poll.id,
                    question_id: question.question.id,
                    choice_id,
                    answer_text: answer_text.map(String::from),
                })
                .await
                .unwrap();
        }

        let report = polls.user_answers(1).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].poll_title, "testtitle");
        assert_eq!(report[0].answers.len(), 2);
        assert_eq!(
            report[0].answers[1].choice_text.as_deref(),
            Some("First choice")
        );
        assert!(polls.user_answers(3).await.unwrap().is_empty());
    }
}
