pub mod admin_question;
pub mod admin_quiz;
pub mod auth;
pub mod health;
pub mod public;
pub mod session;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Every route the service exposes. Admin routes sit behind the session check.
pub fn router(state: AppState) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let auth_api = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::session));

    let public_api = Router::new()
        .route("/api/quizzes", get(public::list_quizzes))
        .route("/api/quiz/start", post(public::start_quiz))
        .route("/api/quiz/questions", get(session::open_session))
        .route("/api/quiz/session/:attempt_id", get(session::get_session))
        .route("/api/quiz/session/:attempt_id/answer", post(session::answer))
        .route("/api/quiz/session/:attempt_id/next", post(session::next))
        .route("/api/quiz/session/:attempt_id/finish", post(session::finish))
        .route("/api/quiz/session/:attempt_id/quit", post(session::quit))
        .route(
            "/api/quiz/session/:attempt_id/quit/confirm",
            post(session::confirm_quit),
        );

    let admin_api = Router::new()
        .route(
            "/api/admin/quizzes",
            get(admin_quiz::list_quizzes).post(admin_quiz::create_quiz),
        )
        .route("/api/admin/quizzes/new", get(admin_quiz::new_quiz))
        .route(
            "/api/admin/quizzes/:quiz_id",
            get(admin_quiz::get_quiz)
                .put(admin_quiz::update_quiz)
                .delete(admin_quiz::delete_quiz),
        )
        .route(
            "/api/admin/quizzes/:quiz_id/questions",
            get(admin_question::list_questions).post(admin_question::create_question),
        )
        .route(
            "/api/admin/quizzes/:quiz_id/questions/new",
            get(admin_question::new_question),
        )
        .route(
            "/api/admin/quizzes/:quiz_id/questions/:question_id",
            get(admin_question::get_question)
                .put(admin_question::update_question)
                .delete(admin_question::delete_question),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_admin_session,
        ));

    base_routes
        .merge(auth_api)
        .merge(public_api)
        .merge(admin_api)
        .with_state(state)
}
