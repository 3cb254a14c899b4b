/*!
 * The routes module contains all the tide routes and the logic to fulfill the responses for each
 * route.
 *
 * Modules are nested for cleaner organization here
 */
use serde::Serialize;
use tide::{Body, Request, Response, Server, StatusCode};

use crate::error::Error;
use crate::middleware::{AdminGuard, ErrorRenderer};
use crate::AppState;

pub mod admin;
pub mod polls;
pub mod users;


/**
 * Build the tide server with every route mounted
 */
pub fn server(state: AppState) -> Server<AppState> {
    let mut app = tide::with_state(state.clone());
    app.with(ErrorRenderer);

    app.at("/").get(index);
    app.at("/api/v1/polls").get(polls::list);
    app.at("/api/v1/polls/:poll_id").get(polls::get);
    app.at("/api/v1/polls/:poll_id/answer").post(polls::answer);
    app.at("/api/v1/users/:user_id/answers").get(users::answers);
    app.at("/api/v1/admin").nest(admin_server(state));
    app
}

fn admin_server(state: AppState) -> Server<AppState> {
    let mut admin = tide::with_state(state);
    admin.with(ErrorRenderer);
    admin.with(AdminGuard);

    admin
        .at("/polls")
        .get(admin::polls::list)
        .post(admin::polls::create);
    admin
        .at("/polls/:poll_id")
        .get(admin::polls::get)
        .put(admin::polls::replace)
        .patch(admin::polls::update)
        .delete(admin::polls::delete);
    admin
        .at("/polls/:poll_id/questions")
        .get(admin::questions::list)
        .post(admin::questions::create);
    admin
        .at("/polls/:poll_id/questions/:question_id")
        .get(admin::questions::get)
        .put(admin::questions::replace)
        .patch(admin::questions::update)
        .delete(admin::questions::delete);
    admin
}

/**
 *  GET /
 */
pub async fn index(_req: Request<AppState>) -> Result<String, tide::Error> {
    Ok("Wilkommen".to_string())
}

/**
 * Parse a numeric id out of the path, anything else means there is nothing to find
 */
fn path_id(req: &Request<AppState>, param: &str, what: &str) -> Result<i64, Error> {
    let raw = req
        .param(param)
        .map_err(|_| Error::NotFound(what.to_string()))?;
    raw.parse::<i64>()
        .map_err(|_| Error::NotFound(format!("{} {}", what, raw)))
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Result<Response, tide::Error> {
    Ok(Response::builder(status).body(Body::from_json(body)?).build())
}

fn no_content() -> Response {
    Response::new(StatusCode::NoContent)
}
