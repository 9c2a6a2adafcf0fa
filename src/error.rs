use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::{json, Value as JsonValue};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Redirect to {0}")]
    Redirect(String),

    /// Non-success response from the quiz API, with the parsed body.
    #[error("An error occurred while fetching the data (status {status})")]
    Api { status: u16, info: JsonValue },

    /// Upstream failure reported to the user with a fixed message.
    #[error("{0}")]
    Upstream(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// User-facing message for an upstream failure, read from the body the
    /// quiz API sent back.
    pub fn api_message(&self) -> String {
        match self {
            Error::Api { info, .. } => match info {
                JsonValue::String(s) if !s.is_empty() => s.clone(),
                JsonValue::Object(map) => map
                    .get("message")
                    .or_else(|| map.get("Message"))
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| info.to_string()),
                JsonValue::Null => "Unknown error".to_string(),
                other => other.to_string(),
            },
            other => other.to_string(),
        }
    }

    pub fn error_code(&self) -> Option<String> {
        match self {
            Error::Api { info, .. } => info
                .get("errorCode")
                .and_then(JsonValue::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Error::Redirect(target) = &self {
            return (
                StatusCode::SEE_OTHER,
                [(header::LOCATION, target.clone())],
                Json(json!({ "redirect": target })),
            )
                .into_response();
        }

        let error_code = self.error_code();
        let upstream_message = self.api_message();
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Api { status, .. } => (upstream_status(status), upstream_message),
            Error::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
            ),
            Error::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = match error_code {
            Some(code) => Json(json!({ "error": error_message, "errorCode": code })),
            None => Json(json!({ "error": error_message })),
        };
        (status, body).into_response()
    }
}

fn upstream_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() => code,
        _ => StatusCode::BAD_GATEWAY,
    }
}
