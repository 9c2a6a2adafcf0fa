use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::AppState;

/// Admin routes are only served while the auth store holds a signed-in user.
pub async fn require_admin_session(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.auth.is_authenticated() {
        tracing::debug!(path = %req.uri().path(), "Rejected admin request without session");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"not_authenticated", "redirect": "/login"})),
        )
            .into_response();
    }
    next.run(req).await
}
