use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::dto::admin_dto::{ListQuery, QuestionForm};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/admin/quizzes/{quiz_id}/questions",
    params(
        ("quiz_id" = Uuid, Path, description = "Quiz ID"),
        ("pageIndex" = Option<u32>, Query, description = "0-based page index"),
        ("pageSize" = Option<u32>, Query, description = "Rows per page"),
        ("search" = Option<String>, Query, description = "Committed search text")
    ),
    responses((status = 200, description = "Question table for one quiz"))
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.question_table(quiz_id, &query).await?).into_response())
}

#[axum::debug_handler]
pub async fn new_question(
    State(state): State<AppState>,
    Path(_quiz_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.new_question_dialog()).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/quizzes/{quiz_id}/questions",
    params(("quiz_id" = Uuid, Path, description = "Quiz ID")),
    request_body = QuestionForm,
    responses(
        (status = 201, description = "Question created, with a fresh dialog on save-and-new"),
        (status = 400, description = "Invalid form")
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(form): Json<QuestionForm>,
) -> crate::error::Result<Response> {
    let view = state.admin.create_question(quiz_id, &form).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path((_quiz_id, id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.edit_question_dialog(id).await?).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/quizzes/{quiz_id}/questions/{question_id}",
    params(
        ("quiz_id" = Uuid, Path, description = "Quiz ID"),
        ("question_id" = Uuid, Path, description = "Question ID")
    ),
    request_body = QuestionForm,
    responses((status = 200, description = "Question updated"))
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path((quiz_id, id)): Path<(Uuid, Uuid)>,
    Json(form): Json<QuestionForm>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.update_question(quiz_id, id, &form).await?).into_response())
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path((quiz_id, id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    Ok(Json(state.admin.delete_question(quiz_id, id).await?).into_response())
}
