use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Answer, ScreeningError};
use super::repository::{RepositoryError, SessionRepository};
use super::service::{ScreeningService, ScreeningServiceError};
use super::session::SessionId;

/// Router builder exposing the questionnaire over HTTP.
pub fn screening_router<R>(service: Arc<ScreeningService<R>>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/instrument", get(instrument_handler::<R>))
        .route("/api/v1/screenings", post(start_handler::<R>))
        .route("/api/v1/screenings/:session_id", get(view_handler::<R>))
        .route(
            "/api/v1/screenings/:session_id/answer",
            put(answer_handler::<R>),
        )
        .route(
            "/api/v1/screenings/:session_id/advance",
            post(advance_handler::<R>),
        )
        .route(
            "/api/v1/screenings/:session_id/restart",
            post(restart_handler::<R>),
        )
        .route(
            "/api/v1/screenings/:session_id/report",
            get(report_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    pub(crate) answer: String,
}

pub(crate) async fn instrument_handler<R>(State(service): State<Arc<ScreeningService<R>>>) -> Response
where
    R: SessionRepository + 'static,
{
    let options: Vec<_> = Answer::ordered()
        .into_iter()
        .map(|answer| json!({ "token": answer.token(), "label": answer.label() }))
        .collect();
    let payload = json!({
        "questions": service.instrument().questions(),
        "options": options,
        "classifier_enabled": service.classifier_enabled(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn start_handler<R>(State(service): State<Arc<ScreeningService<R>>>) -> Response
where
    R: SessionRepository + 'static,
{
    match service.start() {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn view_handler<R>(
    State(service): State<Arc<ScreeningService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.view(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn answer_handler<R>(
    State(service): State<Arc<ScreeningService<R>>>,
    Path(session_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let answer = match request.answer.parse::<Answer>() {
        Ok(answer) => answer,
        Err(err) => return error_response(err.into()),
    };
    match service.answer(&SessionId(session_id), answer) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn advance_handler<R>(
    State(service): State<Arc<ScreeningService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.advance(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn restart_handler<R>(
    State(service): State<Arc<ScreeningService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.restart(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn report_handler<R>(
    State(service): State<Arc<ScreeningService<R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.report(&SessionId(session_id)) {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn status_for(error: &ScreeningServiceError) -> StatusCode {
    match error {
        ScreeningServiceError::Screening(
            ScreeningError::InvalidIndex(_) | ScreeningError::InvalidAnswer(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        ScreeningServiceError::Screening(
            ScreeningError::NotReady { .. }
            | ScreeningError::AlreadyComplete
            | ScreeningError::IncompleteResponses { .. },
        )
        | ScreeningServiceError::ResultsNotReady => StatusCode::CONFLICT,
        ScreeningServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ScreeningServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ScreeningServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: ScreeningServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(&error), Json(payload)).into_response()
}
