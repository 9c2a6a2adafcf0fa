use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::dto::auth_dto::{AuthSessionView, LoginRequest, LoginView};
use crate::error::Error;
use crate::utils::validation::validate;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in"),
        (status = 303, description = "Already signed in"),
        (status = 401, description = "Login failed")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> crate::error::Result<Response> {
    if state.auth.is_authenticated() {
        return Err(Error::Redirect("/admin".to_string()));
    }
    validate(&payload)?;
    let response = state.api.login(&payload).await?;
    let user = state.auth.complete_login(&response.token)?;
    Ok(Json(LoginView {
        user: Some(user),
        redirect: "/admin".to_string(),
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Signed out"))
)]
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>) -> crate::error::Result<Response> {
    state.auth.logout();
    tracing::info!("Signed out");
    Ok(Json(json!({ "redirect": "/login" })).into_response())
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Current auth state"))
)]
#[axum::debug_handler]
pub async fn session(State(state): State<AppState>) -> crate::error::Result<Response> {
    let snapshot = state.auth.snapshot();
    Ok(Json(AuthSessionView {
        user: snapshot.user,
        is_authenticated: snapshot.is_authenticated,
    })
    .into_response())
}
