use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::dto::admin_dto::{ListQuery, QuizForm};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/admin/quizzes",
    params(
        ("pageIndex" = Option<u32>, Query, description = "0-based page index"),
        ("pageSize" = Option<u32>, Query, description = "Rows per page"),
        ("search" = Option<String>, Query, description = "Committed search text")
    ),
    responses(
        (status = 200, description = "Quiz table"),
        (status = 401, description = "Not signed in")
    )
)]
#[axum::debug_handler]
pub async fn list_quizzes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.quiz_table(&query).await?).into_response())
}

#[axum::debug_handler]
pub async fn new_quiz(State(state): State<AppState>) -> crate::error::Result<Response> {
    Ok(Json(state.admin.new_quiz_dialog()).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/quizzes",
    request_body = QuizForm,
    responses(
        (status = 201, description = "Quiz created"),
        (status = 400, description = "Invalid form")
    )
)]
#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(form): Json<QuizForm>,
) -> crate::error::Result<Response> {
    let view = state.admin.create_quiz(&form).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/admin/quizzes/{quiz_id}",
    params(("quiz_id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Edit dialog prefilled from the quiz"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.edit_quiz_dialog(id).await?).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/quizzes/{quiz_id}",
    params(("quiz_id" = Uuid, Path, description = "Quiz ID")),
    request_body = QuizForm,
    responses(
        (status = 200, description = "Quiz updated"),
        (status = 400, description = "Invalid form or publishing without questions")
    )
)]
#[axum::debug_handler]
pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<QuizForm>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.update_quiz(id, &form).await?).into_response())
}

#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.delete_quiz(id).await?).into_response())
}
