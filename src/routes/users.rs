use tide::{Body, Request};

use crate::api_models::UserPollAnswers;
use crate::error::Error;
use crate::AppState;

/**
 *  GET /api/v1/users/:user_id/answers
 */
pub async fn answers(req: Request<AppState>) -> Result<Body, tide::Error> {
    let raw = req.param("user_id")?;
    let user_id = raw
        .parse::<u32>()
        .map_err(|_| Error::NotFound(format!("User {}", raw)))?;

    let report: Vec<UserPollAnswers> = req
        .state()
        .polls
        .user_answers(i64::from(user_id))
        .await?
        .into_iter()
        .map(UserPollAnswers::from)
        .collect();
    Body::from_json(&report)
}
