/*!
 * The JSON request and response bodies of the API
 *
 * Each are named (hopefully) appropriately, conversions to and from the domain models live
 * next to them.
 */
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{self, QuestionType};
use crate::service::{PollAnswers, PollDetail as DomainPollDetail, QuestionWithChoices};

/**
 * Summary information about a poll
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct Poll {
    pub poll_id: i64,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<models::Poll> for Poll {
    fn from(poll: models::Poll) -> Self {
        Poll {
            poll_id: poll.id,
            title: poll.title,
            description: poll.description,
            start_date: poll.start_date,
            end_date: poll.end_date,
        }
    }
}

/**
 * A poll with all of its questions and their choices
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct PollDetail {
    pub poll_id: i64,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub poll_questions: Vec<Question>,
}

impl From<DomainPollDetail> for PollDetail {
    fn from(detail: DomainPollDetail) -> Self {
        let poll = detail.poll;
        PollDetail {
            poll_id: poll.id,
            title: poll.title,
            description: poll.description,
            start_date: poll.start_date,
            end_date: poll.end_date,
            poll_questions: detail.questions.into_iter().map(Question::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Choice {
    pub choice_id: i64,
    pub choice_text: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Question {
    pub question_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_choice: Vec<Choice>,
}

impl From<QuestionWithChoices> for Question {
    fn from(q: QuestionWithChoices) -> Self {
        Question {
            question_id: q.question.id,
            question_text: q.question.question_text,
            question_type: q.question.question_type,
            question_choice: q
                .choices
                .into_iter()
                .map(|c| Choice {
                    choice_id: c.id,
                    choice_text: c.choice_text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InsertableChoice {
    pub choice_text: String,
}

/**
 * User-provided details to create or fully replace a question
 */
#[derive(Debug, Deserialize)]
pub struct InsertableQuestion {
    pub question_text: String,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub question_choice: Vec<InsertableChoice>,
}

impl From<InsertableQuestion> for models::NewQuestion {
    fn from(q: InsertableQuestion) -> Self {
        models::NewQuestion {
            question_text: q.question_text.trim().to_string(),
            question_type: q.question_type,
            choices: q
                .question_choice
                .into_iter()
                .map(|c| c.choice_text.trim().to_string())
                .collect(),
        }
    }
}

/**
 * Partial update of a question, absent fields keep their stored values
 */
#[derive(Debug, Default, Deserialize)]
pub struct QuestionPatch {
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub question_choice: Option<Vec<InsertableChoice>>,
}

impl From<QuestionPatch> for models::QuestionChanges {
    fn from(q: QuestionPatch) -> Self {
        models::QuestionChanges {
            question_text: q.question_text.map(|t| t.trim().to_string()),
            question_type: q.question_type,
            choices: q.question_choice.map(|choices| {
                choices
                    .into_iter()
                    .map(|c| c.choice_text.trim().to_string())
                    .collect()
            }),
        }
    }
}

/**
 * User-provided answer to a single question
 */
#[derive(Debug, Deserialize)]
pub struct Ballot {
    /**
     * Identifier of the answering user, there are no accounts for end users
     */
    pub user_id: u32,
    pub question: i64,
    #[serde(default)]
    pub choice: Option<i64>,
    #[serde(default)]
    pub answer_text: Option<String>,
}

impl Ballot {
    pub fn into_answer(self, poll_id: i64) -> models::NewAnswer {
        models::NewAnswer {
            user_id: i64::from(self.user_id),
            poll_id,
            question_id: self.question,
            choice_id: self.choice,
            answer_text: self
                .answer_text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Answer {
    pub answer_id: i64,
    pub user_id: i64,
    pub question: i64,
    pub choice: Option<i64>,
    pub answer_text: String,
}

impl From<models::Answer> for Answer {
    fn from(a: models::Answer) -> Self {
        Answer {
            answer_id: a.id,
            user_id: a.user_id,
            question: a.question_id,
            choice: a.choice_id,
            answer_text: a.answer_text,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserAnswer {
    pub question_id: i64,
    pub question_type: QuestionType,
    pub question_text: String,
    pub answer_text: String,
    /**
     * Text of the selected choice, empty for TEXT questions
     */
    pub choice: String,
}

/**
 * A user's answers within a single poll
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct UserPollAnswers {
    pub poll_id: i64,
    pub poll_title: String,
    pub poll_description: String,
    pub user_answers: Vec<UserAnswer>,
}

impl From<PollAnswers> for UserPollAnswers {
    fn from(p: PollAnswers) -> Self {
        UserPollAnswers {
            poll_id: p.poll_id,
            poll_title: p.poll_title,
            poll_description: p.poll_description,
            user_answers: p
                .answers
                .into_iter()
                .map(|a| {
                    let takes_choices = a.question_type.takes_choices();
                    UserAnswer {
                        question_id: a.question_id,
                        question_type: a.question_type,
                        question_text: a.question_text,
                        answer_text: if takes_choices {
                            String::new()
                        } else {
                            a.answer_text
                        },
                        choice: if takes_choices {
                            a.choice_text.unwrap_or_default()
                        } else {
                            String::new()
                        },
                    }
                })
                .collect(),
        }
    }
}

/**
 * Body of every error response
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct Errors {
    pub errors: Vec<String>,
}
