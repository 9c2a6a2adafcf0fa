use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::dto::public_dto::StartQuizForm;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/quizzes",
    responses(
        (status = 200, description = "Published public quizzes"),
        (status = 502, description = "Quiz API unavailable")
    )
)]
#[axum::debug_handler]
pub async fn list_quizzes(State(state): State<AppState>) -> crate::error::Result<Response> {
    let quizzes = state.public.list_publishable().await?;
    Ok(Json(quizzes).into_response())
}

#[utoipa::path(
    post,
    path = "/api/quiz/start",
    request_body = StartQuizForm,
    responses(
        (status = 201, description = "Attempt started"),
        (status = 400, description = "Invalid email or terms not accepted"),
        (status = 502, description = "Failed to start quiz")
    )
)]
#[axum::debug_handler]
pub async fn start_quiz(
    State(state): State<AppState>,
    Json(form): Json<StartQuizForm>,
) -> crate::error::Result<Response> {
    let view = state.public.start(&form).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}
