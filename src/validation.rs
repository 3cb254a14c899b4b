/*!
 * The business rules for polls, questions and answers
 *
 * Every check here is a pure function over records which have already been loaded, the
 * service layer is responsible for fetching them and for persisting anything that passes.
 */
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::*;

pub const MAX_TITLE_CHARS: usize = 50;
pub const MAX_TEXT_CHARS: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("The {0} may not be blank")]
    Blank(&'static str),
    #[error("The {field} may not be longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("The end date cannot be earlier than the start date")]
    EndBeforeStart,
    #[error("The start date of an existing poll cannot be changed")]
    StartDateLocked,
    #[error("Questions of type TEXT cannot have choices")]
    ChoicesNotAllowed,
    #[error("Create at least one choice for this question")]
    ChoicesRequired,
    #[error("No question with id {0} exists")]
    UnknownQuestion(i64),
    #[error("The question does not belong to this poll")]
    QuestionNotInPoll,
    #[error("An answer is either a predefined choice or free text, not both")]
    ChoiceAndText,
    #[error("This question must be answered by selecting a choice")]
    ChoiceRequired,
    #[error("This question must be answered with text")]
    TextRequired,
    #[error("The selected choice does not belong to this question")]
    UnknownChoice,
    #[error("This choice has already been selected")]
    OptionAlreadyChosen,
    #[error("This question has already been answered")]
    AlreadyAnswered,
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), Rejection> {
    if value.trim().is_empty() {
        return Err(Rejection::Blank(field));
    }
    if value.chars().count() > max {
        return Err(Rejection::TooLong { field, max });
    }
    Ok(())
}

/**
 * Validate a poll which is about to be created
 */
pub fn check_new_poll(poll: &NewPoll) -> Result<(), Rejection> {
    check_poll_fields(&poll.title, &poll.description, poll.start_date, poll.end_date)
}

/**
 * Validate `changes` against the stored `current` poll
 *
 * The start date is locked once a poll exists, re-sending the same value is fine.
 */
pub fn check_poll_changes(current: &Poll, changes: &PollChanges) -> Result<Poll, Rejection> {
    if let Some(start) = changes.start_date {
        if start != current.start_date {
            return Err(Rejection::StartDateLocked);
        }
    }
    let updated = changes.apply_to(current);
    check_poll_fields(
        &updated.title,
        &updated.description,
        updated.start_date,
        updated.end_date,
    )?;
    Ok(updated)
}

fn check_poll_fields(
    title: &str,
    description: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), Rejection> {
    check_text("title", title, MAX_TITLE_CHARS)?;
    if description.trim().is_empty() {
        return Err(Rejection::Blank("description"));
    }
    if end < start {
        return Err(Rejection::EndBeforeStart);
    }
    Ok(())
}

/**
 * Validate the shape of a question along with the choices it will carry
 */
pub fn check_question(question: &NewQuestion) -> Result<(), Rejection> {
    check_text("question text", &question.question_text, MAX_TEXT_CHARS)?;

    match (question.question_type.takes_choices(), question.choices.is_empty()) {
        (false, false) => return Err(Rejection::ChoicesNotAllowed),
        (true, true) => return Err(Rejection::ChoicesRequired),
        _ => {}
    }

    for choice in question.choices.iter() {
        check_text("choice text", choice, MAX_TEXT_CHARS)?;
    }
    Ok(())
}

/**
 * Merge a partial question update with what is stored
 *
 * Returns the merged question and, when the stored choices must be replaced, the new set.
 * Omitting choices keeps the stored ones for choice questions and clears them for TEXT.
 */
pub fn merge_question_changes(
    current: &Question,
    existing_choices: &[QuestionChoice],
    changes: &QuestionChanges,
) -> Result<(NewQuestion, Option<Vec<String>>), Rejection> {
    let question_type = changes.question_type.unwrap_or(current.question_type);
    let question_text = changes
        .question_text
        .clone()
        .unwrap_or_else(|| current.question_text.clone());

    let (choices, replacement) = match &changes.choices {
        Some(choices) => (choices.clone(), Some(choices.clone())),
        None if question_type.takes_choices() => (
            existing_choices.iter().map(|c| c.choice_text.clone()).collect(),
            None,
        ),
        None if existing_choices.is_empty() => (vec![], None),
        None => (vec![], Some(vec![])),
    };

    let merged = NewQuestion {
        question_text,
        question_type,
        choices,
    };
    check_question(&merged)?;
    Ok((merged, replacement))
}

/**
 * Validate a user's answer
 *
 * `choices` are all the choices of `question` and `prior` are the answers this same user has
 * already given to it. The rules run in a fixed order and the first failure is reported.
 */
pub fn check_answer(
    poll: &Poll,
    question: &Question,
    choices: &[QuestionChoice],
    prior: &[Answer],
    answer: &NewAnswer,
) -> Result<(), Rejection> {
    if question.poll_id != poll.id {
        return Err(Rejection::QuestionNotInPoll);
    }

    let text = answer.answer_text.as_deref().filter(|t| !t.is_empty());

    if answer.choice_id.is_some() && text.is_some() {
        return Err(Rejection::ChoiceAndText);
    }
    if question.question_type.takes_choices() && answer.choice_id.is_none() {
        return Err(Rejection::ChoiceRequired);
    }
    if question.question_type == QuestionType::Text && text.is_none() {
        return Err(Rejection::TextRequired);
    }
    if let Some(text) = text {
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(Rejection::TooLong {
                field: "answer text",
                max: MAX_TEXT_CHARS,
            });
        }
    }
    if !choices.is_empty() && !choices.iter().any(|c| Some(c.id) == answer.choice_id) {
        return Err(Rejection::UnknownChoice);
    }

    match question.question_type {
        QuestionType::MultiChoice => {
            if prior.iter().any(|a| a.choice_id == answer.choice_id) {
                return Err(Rejection::OptionAlreadyChosen);
            }
        }
        QuestionType::Choice | QuestionType::Text => {
            if !prior.is_empty() {
                return Err(Rejection::AlreadyAnswered);
            }
        }
    }
    Ok(())
}
