use chrono::Local;
use log::*;
use tide::{Body, Request, Response, StatusCode};

use super::{json, path_id};
use crate::api_models::{self, Ballot};
use crate::AppState;

/**
 *  GET /api/v1/polls
 *
 *  Only the polls which have not ended yet
 */
pub async fn list(req: Request<AppState>) -> Result<Body, tide::Error> {
    let today = Local::now().date_naive();
    let polls: Vec<api_models::Poll> = req
        .state()
        .polls
        .active_polls(today)
        .await?
        .into_iter()
        .map(api_models::Poll::from)
        .collect();
    Body::from_json(&polls)
}

/**
 * GET /api/v1/polls/:poll_id
 */
pub async fn get(req: Request<AppState>) -> Result<Body, tide::Error> {
    let poll_id = path_id(&req, "poll_id", "Poll")?;
    debug!("Fetching poll: {}", poll_id);

    let detail = req.state().polls.poll_detail(poll_id).await?;
    Body::from_json(&api_models::PollDetail::from(detail))
}

/**
 *  POST /api/v1/polls/:poll_id/answer
 */
pub async fn answer(mut req: Request<AppState>) -> Result<Response, tide::Error> {
    let poll_id = path_id(&req, "poll_id", "Poll")?;
    let ballot: Ballot = req.body_json().await?;
    info!("Ballot received for poll {}: {:?}", poll_id, ballot);

    let answer = req
        .state()
        .polls
        .submit_answer(ballot.into_answer(poll_id))
        .await?;
    json(StatusCode::Created, &api_models::Answer::from(answer))
}
