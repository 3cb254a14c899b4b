use async_trait::async_trait;
use log::*;
use subtle::ConstantTimeEq;
use tide::{Body, Middleware, Next, Request, StatusCode};

use crate::api_models::Errors;
use crate::error::Error;
use crate::AppState;

/**
 * Refuses every request which does not carry `Authorization: Bearer <admin token>`
 */
#[derive(Debug, Default)]
pub struct AdminGuard;

fn bearer_token<State>(req: &Request<State>) -> Option<&str> {
    req.header("Authorization")
        .map(|values| values.last().as_str())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

#[async_trait]
impl Middleware<AppState> for AdminGuard {
    async fn handle(&self, req: Request<AppState>, next: Next<'_, AppState>) -> tide::Result {
        let authorized: bool = match (req.state().admin_token.as_deref(), bearer_token(&req)) {
            (Some(expected), Some(given)) => expected.as_bytes().ct_eq(given.as_bytes()).into(),
            _ => false,
        };

        if authorized {
            Ok(next.run(req).await)
        } else {
            warn!(
                "Refusing unauthenticated {} {}",
                req.method(),
                req.url().path()
            );
            Err(Error::Forbidden.into())
        }
    }
}

/**
 * Turns any error attached to a response into a JSON `{"errors": [..]}` body
 *
 * Crate errors carry their own status. Malformed request bodies, which tide reports as 422,
 * become 400. Server-side failures are logged and only a generic message is returned.
 */
#[derive(Debug, Default)]
pub struct ErrorRenderer;

#[async_trait]
impl<State> Middleware<State> for ErrorRenderer
where
    State: Clone + Send + Sync + 'static,
{
    async fn handle(&self, req: Request<State>, next: Next<'_, State>) -> tide::Result {
        let mut res = next.run(req).await;

        if let Some(err) = res.take_error() {
            let (status, message) = match err.downcast_ref::<Error>() {
                Some(e) if e.is_public() => (e.status(), e.to_string()),
                Some(e) => {
                    error!("Request failed: {:?}", e);
                    (e.status(), "Internal server error".to_string())
                }
                None if err.status() == StatusCode::UnprocessableEntity => {
                    (StatusCode::BadRequest, err.to_string())
                }
                None if err.status().is_client_error() => (err.status(), err.to_string()),
                None => {
                    error!("Request failed: {:?}", err);
                    (StatusCode::InternalServerError, "Internal server error".to_string())
                }
            };

            res.set_status(status);
            res.set_body(Body::from_json(&Errors {
                errors: vec![message],
            })?);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tide::http::{Method, Request as HttpRequest, Response, Url};

    fn request(authorization: Option<&str>) -> HttpRequest {
        let mut req = HttpRequest::new(Method::Get, Url::parse("http://localhost/").unwrap());
        if let Some(value) = authorization {
            req.insert_header("Authorization", value);
        }
        req
    }

    #[async_std::test]
    async fn bearer_token_is_extracted() {
        let mut app = tide::new();
        app.at("/").get(|req: tide::Request<()>| async move {
            Ok::<String, tide::Error>(bearer_token(&req).unwrap_or("-").to_string())
        });

        let mut res: Response = app.respond(request(Some("Bearer abc"))).await.unwrap();
        assert_eq!(res.body_string().await.unwrap(), "abc");

        let mut res: Response = app.respond(request(Some("Basic abc"))).await.unwrap();
        assert_eq!(res.body_string().await.unwrap(), "-");

        let mut res: Response = app.respond(request(None)).await.unwrap();
        assert_eq!(res.body_string().await.unwrap(), "-");
    }

    #[async_std::test]
    async fn only_the_configured_token_passes() {
        let state = AppState::new(
            std::sync::Arc::new(crate::storage::MemoryStorage::default()),
            Some("letmein".to_string()),
        );
        let mut app = tide::with_state(state);
        app.with(ErrorRenderer);
        app.with(AdminGuard);
        app.at("/").get(|_req: tide::Request<AppState>| async move {
            Ok::<String, tide::Error>("ok".to_string())
        });

        let res: Response = app.respond(request(Some("Bearer letmein"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::Ok);

        for token in &["Bearer letmei", "Bearer letmeinn", "Bearer LETMEIN", "letmein"] {
            let res: Response = app.respond(request(Some(*token))).await.unwrap();
            assert_eq!(res.status(), StatusCode::Forbidden, "{}", token);
        }
    }

    #[async_std::test]
    async fn errors_are_rendered_as_json() {
        let mut app = tide::new();
        app.with(ErrorRenderer);
        app.at("/").get(|_req: tide::Request<()>| async move {
            let result: tide::Result<String> = Err(Error::not_found("Poll", 3).into());
            result
        });

        let mut res: Response = app.respond(request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::NotFound);
        let body: Errors = res.body_json().await.unwrap();
        assert_eq!(body.errors, vec!["Poll 3 not found".to_string()]);
    }

    #[async_std::test]
    async fn internal_errors_are_not_leaked() {
        let mut app = tide::new();
        app.with(ErrorRenderer);
        app.at("/").get(|_req: tide::Request<()>| async move {
            let result: tide::Result<String> = Err(Error::Database(sqlx::Error::PoolTimedOut).into());
            result
        });

        let mut res: Response = app.respond(request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::InternalServerError);
        let body: Errors = res.body_json().await.unwrap();
        assert_eq!(body.errors, vec!["Internal server error".to_string()]);
    }
}
