/*!
 * Administrative routes, mounted under /api/v1/admin behind the `AdminGuard`
 */

pub mod polls {
    use tide::{Body, Request, Response, StatusCode};

    use super::super::{json, no_content, path_id};
    use crate::api_models;
    use crate::models::{NewPoll, PollChanges};
    use crate::AppState;

    /**
     *  GET /api/v1/admin/polls
     */
    pub async fn list(req: Request<AppState>) -> Result<Body, tide::Error> {
        let polls: Vec<api_models::Poll> = req
            .state()
            .polls
            .all_polls()
            .await?
            .into_iter()
            .map(api_models::Poll::from)
            .collect();
        Body::from_json(&polls)
    }

    /**
     *  POST /api/v1/admin/polls
     */
    pub async fn create(mut req: Request<AppState>) -> Result<Response, tide::Error> {
        let poll: NewPoll = req.body_json().await?;
        let created = req.state().polls.create_poll(poll).await?;
        json(StatusCode::Created, &api_models::Poll::from(created))
    }

    /**
     *  GET /api/v1/admin/polls/:poll_id
     */
    pub async fn get(req: Request<AppState>) -> Result<Body, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let poll = req.state().polls.poll(poll_id).await?;
        Body::from_json(&api_models::Poll::from(poll))
    }

    /**
     *  PUT /api/v1/admin/polls/:poll_id
     */
    pub async fn replace(mut req: Request<AppState>) -> Result<Body, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let poll: NewPoll = req.body_json().await?;
        let updated = req
            .state()
            .polls
            .update_poll(poll_id, PollChanges::from(poll))
            .await?;
        Body::from_json(&api_models::Poll::from(updated))
    }

    /**
     *  PATCH /api/v1/admin/polls/:poll_id
     */
    pub async fn update(mut req: Request<AppState>) -> Result<Body, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let changes: PollChanges = req.body_json().await?;
        let updated = req.state().polls.update_poll(poll_id, changes).await?;
        Body::from_json(&api_models::Poll::from(updated))
    }

    /**
     *  DELETE /api/v1/admin/polls/:poll_id
     */
    pub async fn delete(req: Request<AppState>) -> Result<Response, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        req.state().polls.delete_poll(poll_id).await?;
        Ok(no_content())
    }
}

pub mod questions {
    use tide::{Body, Request, Response, StatusCode};

    use super::super::{json, no_content, path_id};
    use crate::api_models::{self, InsertableQuestion, QuestionPatch};
    use crate::AppState;

    /**
     *  GET /api/v1/admin/polls/:poll_id/questions
     */
    pub async fn list(req: Request<AppState>) -> Result<Body, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let questions: Vec<api_models::Question> = req
            .state()
            .polls
            .questions(poll_id)
            .await?
            .into_iter()
            .map(api_models::Question::from)
            .collect();
        Body::from_json(&questions)
    }

    /**
     *  POST /api/v1/admin/polls/:poll_id/questions
     */
    pub async fn create(mut req: Request<AppState>) -> Result<Response, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let question: InsertableQuestion = req.body_json().await?;
        let created = req
            .state()
            .polls
            .create_question(poll_id, question.into())
            .await?;
        json(StatusCode::Created, &api_models::Question::from(created))
    }

    /**
     *  GET /api/v1/admin/polls/:poll_id/questions/:question_id
     */
    pub async fn get(req: Request<AppState>) -> Result<Body, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let question_id = path_id(&req, "question_id", "Question")?;
        let question = req.state().polls.question(poll_id, question_id).await?;
        Body::from_json(&api_models::Question::from(question))
    }

    /**
     *  PUT /api/v1/admin/polls/:poll_id/questions/:question_id
     */
    pub async fn replace(mut req: Request<AppState>) -> Result<Body, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let question_id = path_id(&req, "question_id", "Question")?;
        let question: InsertableQuestion = req.body_json().await?;
        let replaced = req
            .state()
            .polls
            .replace_question(poll_id, question_id, question.into())
            .await?;
        Body::from_json(&api_models::Question::from(replaced))
    }

    /**
     *  PATCH /api/v1/admin/polls/:poll_id/questions/:question_id
     */
    pub async fn update(mut req: Request<AppState>) -> Result<Body, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let question_id = path_id(&req, "question_id", "Question")?;
        let patch: QuestionPatch = req.body_json().await?;
        let updated = req
            .state()
            .polls
            .update_question(poll_id, question_id, patch.into())
            .await?;
        Body::from_json(&api_models::Question::from(updated))
    }

    /**
     *  DELETE /api/v1/admin/polls/:poll_id/questions/:question_id
     */
    pub async fn delete(req: Request<AppState>) -> Result<Response, tide::Error> {
        let poll_id = path_id(&req, "poll_id", "Poll")?;
        let question_id = path_id(&req, "question_id", "Question")?;
        req.state()
            .polls
            .delete_question(poll_id, question_id)
            .await?;
        Ok(no_content())
    }
}
