use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Poll {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/**
 * The kind of response a question expects
 *
 * Stored as the `question_type` postgres enum
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "question_type", rename_all = "UPPERCASE")]
pub enum QuestionType {
    Text,
    Choice,
    MultiChoice,
}

impl Default for QuestionType {
    fn default() -> Self {
        QuestionType::Text
    }
}

impl QuestionType {
    /**
     * True for the question types which are answered by picking a predefined choice
     */
    pub fn takes_choices(self) -> bool {
        matches!(self, QuestionType::Choice | QuestionType::MultiChoice)
    }
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub poll_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct QuestionChoice {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Answer {
    pub id: i64,
    pub user_id: i64,
    pub poll_id: i64,
    pub question_id: i64,
    pub choice_id: Option<i64>,
    /**
     * Empty when the answer is a selected choice
     */
    pub answer_text: String,
}

/**
 * One row of a user's answer report, already joined with its poll, question and choice
 */
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct UserAnswer {
    pub poll_id: i64,
    pub poll_title: String,
    pub poll_description: String,
    pub question_id: i64,
    pub question_type: QuestionType,
    pub question_text: String,
    pub answer_text: String,
    pub choice_text: Option<String>,
}

/**
 * User-provided details to create a Poll
 */
#[derive(Clone, Debug, Deserialize)]
pub struct NewPoll {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewPoll {
    pub fn trimmed(self) -> Self {
        NewPoll {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            ..self
        }
    }
}

/**
 * Changes to an existing Poll, absent fields are left untouched
 */
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PollChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<NewPoll> for PollChanges {
    fn from(poll: NewPoll) -> Self {
        PollChanges {
            title: Some(poll.title),
            description: Some(poll.description),
            start_date: Some(poll.start_date),
            end_date: Some(poll.end_date),
        }
    }
}

impl PollChanges {
    /**
     * Produce the poll as it would look after these changes are applied
     */
    pub fn apply_to(&self, poll: &Poll) -> Poll {
        Poll {
            id: poll.id,
            title: self
                .title
                .as_deref()
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| poll.title.clone()),
            description: self
                .description
                .as_deref()
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| poll.description.clone()),
            start_date: self.start_date.unwrap_or(poll.start_date),
            end_date: self.end_date.unwrap_or(poll.end_date),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    /**
     * Just the details of each choice
     */
    pub choices: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuestionChanges {
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub choices: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAnswer {
    pub user_id: i64,
    pub poll_id: i64,
    pub question_id: i64,
    pub choice_id: Option<i64>,
    pub answer_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn question_type_uses_uppercase_on_the_wire() {
        let t: QuestionType = serde_json::from_str("\"MULTICHOICE\"").unwrap();
        assert_eq!(t, QuestionType::MultiChoice);
        assert_eq!(serde_json::to_string(&QuestionType::Choice).unwrap(), "\"CHOICE\"");
        assert!(serde_json::from_str::<QuestionType>("\"multi\"").is_err());
    }

    #[test]
    fn only_choice_types_take_choices() {
        assert!(!QuestionType::Text.takes_choices());
        assert!(QuestionType::Choice.takes_choices());
        assert!(QuestionType::MultiChoice.takes_choices());
        assert_eq!(QuestionType::default(), QuestionType::Text);
    }

    #[test]
    fn poll_changes_keep_untouched_fields() {
        let poll = Poll {
            id: 4,
            title: "testtitle".into(),
            description: "testdescription".into(),
            start_date: date("2021-12-26"),
            end_date: date("2021-12-31"),
        };
        let changes = PollChanges {
            title: Some("  renamed ".into()),
            end_date: Some(date("2021-12-30")),
            ..Default::default()
        };

        let changed = changes.apply_to(&poll);
        assert_eq!(changed.id, 4);
        assert_eq!(changed.title, "renamed");
        assert_eq!(changed.description, "testdescription");
        assert_eq!(changed.start_date, date("2021-12-26"));
        assert_eq!(changed.end_date, date("2021-12-30"));
    }
}
