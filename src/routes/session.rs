use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::dto::public_dto::{AnswerForm, SessionQuery};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/quiz/questions",
    params(
        ("email" = String, Query, description = "Player email"),
        ("attemptId" = String, Query, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Session opened or resumed"),
        (status = 303, description = "Attempt cannot be played, back to landing page")
    )
)]
#[axum::debug_handler]
pub async fn open_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> crate::error::Result<Response> {
    let view = state
        .sessions
        .open(&query.email, query.attempt_id.as_deref())
        .await?;
    Ok(Json(view).into_response())
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    Ok(Json(state.sessions.view(attempt_id)?).into_response())
}

#[utoipa::path(
    post,
    path = "/api/quiz/session/{attempt_id}/answer",
    params(("attempt_id" = Uuid, Path, description = "Attempt ID")),
    request_body = AnswerForm,
    responses(
        (status = 200, description = "Answer recorded"),
        (status = 400, description = "Not one of the presented options"),
        (status = 409, description = "Question already answered")
    )
)]
#[axum::debug_handler]
pub async fn answer(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    Json(form): Json<AnswerForm>,
) -> crate::error::Result<Response> {
    Ok(Json(state.sessions.answer(attempt_id, &form.answer)?).into_response())
}

#[axum::debug_handler]
pub async fn next(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    Ok(Json(state.sessions.next(attempt_id)?).into_response())
}

#[utoipa::path(
    post,
    path = "/api/quiz/session/{attempt_id}/finish",
    params(("attempt_id" = Uuid, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Scored result, or the session with a failure notice"),
        (status = 409, description = "Finish not available yet")
    )
)]
#[axum::debug_handler]
pub async fn finish(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    Ok(Json(state.sessions.finish(attempt_id).await?).into_response())
}

#[axum::debug_handler]
pub async fn quit(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    Ok(Json(state.sessions.quit(attempt_id)?).into_response())
}

#[axum::debug_handler]
pub async fn confirm_quit(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    state.sessions.confirm_quit(attempt_id)?;
    Ok(Json(json!({ "redirect": "/" })).into_response())
}
