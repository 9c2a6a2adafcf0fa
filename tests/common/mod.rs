#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

use quiz_portal::config::Config;
use quiz_portal::services::storage::{KeyValueStore, MemoryStore};
use quiz_portal::utils::time::Clock;
use quiz_portal::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "secret";

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Mutex::new(Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// In-memory stand-in for the remote quiz API.
#[derive(Default)]
pub struct FakeQuizApi {
    pub quizzes: Mutex<Vec<JsonValue>>,
    pub questions: Mutex<Vec<JsonValue>>,
    pub attempts: Mutex<HashMap<Uuid, JsonValue>>,
    pub answers: Mutex<Vec<JsonValue>>,
    pub bulk_calls: Mutex<Vec<JsonValue>>,
    pub finish_calls: Mutex<Vec<JsonValue>>,
    pub quiz_list_requests: Mutex<Vec<HashMap<String, String>>>,
    pub bodies: Mutex<Vec<JsonValue>>,
    pub fail_start: Mutex<bool>,
}

impl FakeQuizApi {
    pub fn add_quiz(&self, name: &str, settings: JsonValue) -> Uuid {
        let id = Uuid::new_v4();
        let mut quiz = json!({
            "id": id,
            "name": name,
            "useTimer": false,
            "timerType": null,
            "timerDuration": null,
            "highlightCorrectAnswer": false,
            "allowRetake": false,
            "isPublic": true,
            "status": "publish",
            "questionCount": 0
        });
        if let (Some(target), Some(extra)) = (quiz.as_object_mut(), settings.as_object()) {
            for (k, v) in extra {
                target.insert(k.clone(), v.clone());
            }
        }
        self.quizzes.lock().unwrap().push(quiz);
        id
    }

    pub fn add_question(&self, quiz_id: Uuid, text: &str, correct: &str, incorrect: &[&str]) -> Uuid {
        let id = Uuid::new_v4();
        self.questions.lock().unwrap().push(json!({
            "id": id,
            "quizId": quiz_id,
            "text": text,
            "correctAnswer": correct,
            "incorrectAnswers": incorrect,
        }));
        self.bump_count(quiz_id, 1);
        id
    }

    fn bump_count(&self, quiz_id: Uuid, delta: i64) {
        let mut quizzes = self.quizzes.lock().unwrap();
        if let Some(q) = quizzes.iter_mut().find(|q| q["id"] == json!(quiz_id)) {
            let count = q["questionCount"].as_i64().unwrap_or(0) + delta;
            q["questionCount"] = json!(count.max(0));
        }
    }

    pub fn add_attempt(&self, quiz_id: Uuid, email: &str, answers: JsonValue) -> Uuid {
        let id = Uuid::new_v4();
        self.attempts.lock().unwrap().insert(
            id,
            json!({
                "id": id,
                "quizId": quiz_id,
                "email": email,
                "answers": answers,
                "finishedAt": null
            }),
        );
        id
    }

    fn question(&self, id: Uuid) -> Option<JsonValue> {
        self.questions
            .lock()
            .unwrap()
            .iter()
            .find(|q| q["id"] == json!(id))
            .cloned()
    }
}

type Shared = Arc<FakeQuizApi>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer ") && v.len() > 7)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthorized" }))).into_response()
}

fn paged(items: Vec<JsonValue>, params: &HashMap<String, String>) -> JsonValue {
    let search = params.get("search").cloned().unwrap_or_default().to_lowercase();
    let filtered: Vec<JsonValue> = items
        .into_iter()
        .filter(|item| {
            let label = item["name"]
                .as_str()
                .or_else(|| item["text"].as_str())
                .unwrap_or_default()
                .to_lowercase();
            label.contains(&search)
        })
        .collect();
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let size: usize = params.get("pageSize").and_then(|p| p.parse().ok()).unwrap_or(10);
    let total = filtered.len();
    let items: Vec<JsonValue> = filtered
        .into_iter()
        .skip((page.saturating_sub(1)) * size)
        .take(size)
        .collect();
    json!({ "totalCount": total, "items": items })
}

pub fn admin_token() -> String {
    encode(
        &Header::default(),
        &json!({ "sub": "admin-1", "email": ADMIN_EMAIL, "fullName": "Quiz Admin" }),
        &EncodingKey::from_secret(b"upstream-secret"),
    )
    .unwrap()
}

async fn login(Json(body): Json<JsonValue>) -> Response {
    if body["email"] == ADMIN_EMAIL && body["password"] == ADMIN_PASSWORD {
        Json(json!({ "token": admin_token() })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" }))).into_response()
    }
}

async fn list_quizzes(
    State(api): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    api.quiz_list_requests.lock().unwrap().push(params.clone());
    let items = api.quizzes.lock().unwrap().clone();
    Json(paged(items, &params)).into_response()
}

async fn create_quiz(State(api): State<Shared>, headers: HeaderMap, Json(body): Json<JsonValue>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    api.bodies.lock().unwrap().push(body.clone());
    let id = api.add_quiz(
        body["Title"].as_str().unwrap_or_default(),
        json!({
            "useTimer": body["UseTimer"],
            "timerType": body["TimerType"],
            "timerDuration": body["TimerDuration"],
            "highlightCorrectAnswer": body["HighlightCorrectAnswer"],
            "allowRetake": body["AllowRetake"],
            "isPublic": body["IsPublic"],
            "status": "draft"
        }),
    );
    (StatusCode::CREATED, Json(json!({ "id": id }))).into_response()
}

async fn get_quiz(State(api): State<Shared>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let found = api
        .quizzes
        .lock()
        .unwrap()
        .iter()
        .find(|q| q["id"] == json!(id))
        .cloned();
    match found {
        Some(quiz) => Json(quiz).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Quiz not found" }))).into_response(),
    }
}

async fn update_quiz(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<JsonValue>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    api.bodies.lock().unwrap().push(body.clone());
    let mut quizzes = api.quizzes.lock().unwrap();
    let Some(quiz) = quizzes.iter_mut().find(|q| q["id"] == json!(id)) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Quiz not found" }))).into_response();
    };
    if body["Status"] == "publish" && quiz["questionCount"] == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Cannot publish a quiz without questions",
                "errorCode": "PUBLISH_WITHOUT_QUESTIONS"
            })),
        )
            .into_response();
    }
    quiz["name"] = body["Title"].clone();
    quiz["status"] = body["Status"].clone();
    quiz["isPublic"] = body["IsPublic"].clone();
    Json(quiz.clone()).into_response()
}

async fn delete_quiz(State(api): State<Shared>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    api.quizzes.lock().unwrap().retain(|q| q["id"] != json!(id));
    StatusCode::NO_CONTENT.into_response()
}

async fn list_questions(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path(quiz_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let items: Vec<JsonValue> = api
        .questions
        .lock()
        .unwrap()
        .iter()
        .filter(|q| q["quizId"] == json!(quiz_id))
        .cloned()
        .collect();
    Json(paged(items, &params)).into_response()
}

async fn create_question(State(api): State<Shared>, headers: HeaderMap, Json(body): Json<JsonValue>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    api.bodies.lock().unwrap().push(body.clone());
    let quiz_id: Uuid = serde_json::from_value(body["QuizId"].clone()).unwrap_or_default();
    let incorrect: Vec<String> = serde_json::from_value(body["IncorrectAnswers"].clone()).unwrap_or_default();
    let incorrect: Vec<&str> = incorrect.iter().map(String::as_str).collect();
    let id = api.add_question(
        quiz_id,
        body["Text"].as_str().unwrap_or_default(),
        body["CorrectAnswer"].as_str().unwrap_or_default(),
        &incorrect,
    );
    (StatusCode::CREATED, Json(json!({ "id": id }))).into_response()
}

async fn get_question(State(api): State<Shared>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match api.question(id) {
        Some(q) => Json(q).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Question not found" }))).into_response(),
    }
}

async fn update_question(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<JsonValue>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    api.bodies.lock().unwrap().push(body.clone());
    let mut questions = api.questions.lock().unwrap();
    let Some(q) = questions.iter_mut().find(|q| q["id"] == json!(id)) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Question not found" }))).into_response();
    };
    q["text"] = body["Text"].clone();
    q["correctAnswer"] = body["CorrectAnswer"].clone();
    q["incorrectAnswers"] = body["IncorrectAnswers"].clone();
    Json(q.clone()).into_response()
}

async fn delete_question(State(api): State<Shared>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(q) = api.question(id) {
        api.questions.lock().unwrap().retain(|q| q["id"] != json!(id));
        if let Ok(quiz_id) = serde_json::from_value::<Uuid>(q["quizId"].clone()) {
            api.bump_count(quiz_id, -1);
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn public_quizzes(State(api): State<Shared>) -> Response {
    Json(api.quizzes.lock().unwrap().clone()).into_response()
}

async fn start(State(api): State<Shared>, Json(body): Json<JsonValue>) -> Response {
    if *api.fail_start.lock().unwrap() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let quiz_id: Uuid = serde_json::from_value(body["quizId"].clone()).unwrap_or_default();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let id = api.add_attempt(quiz_id, &email, json!([]));
    Json(json!({ "attemptId": id })).into_response()
}

async fn public_questions(State(api): State<Shared>, Path(quiz_id): Path<Uuid>) -> Response {
    let questions: Vec<JsonValue> = api
        .questions
        .lock()
        .unwrap()
        .iter()
        .filter(|q| q["quizId"] == json!(quiz_id))
        .map(|q| {
            json!({
                "id": q["id"],
                "question": q["text"],
                "correctAnswer": q["correctAnswer"],
                "incorrectAnswers": q["incorrectAnswers"],
            })
        })
        .collect();
    Json(questions).into_response()
}

async fn attempt(State(api): State<Shared>, Path(id): Path<Uuid>) -> Response {
    match api.attempts.lock().unwrap().get(&id) {
        Some(a) => Json(a.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Attempt not found" }))).into_response(),
    }
}

async fn answer(State(api): State<Shared>, Json(body): Json<JsonValue>) -> Response {
    api.answers.lock().unwrap().push(body);
    StatusCode::OK.into_response()
}

async fn bulk_empty(State(api): State<Shared>, Json(body): Json<JsonValue>) -> Response {
    api.bulk_calls.lock().unwrap().push(body);
    StatusCode::OK.into_response()
}

async fn finish(State(api): State<Shared>, Json(body): Json<JsonValue>) -> Response {
    api.finish_calls.lock().unwrap().push(body.clone());
    let attempt_id: Uuid = serde_json::from_value(body["attemptId"].clone()).unwrap_or_default();
    let score = api
        .answers
        .lock()
        .unwrap()
        .iter()
        .filter(|a| a["attemptId"] == json!(attempt_id))
        .filter(|a| {
            serde_json::from_value::<Uuid>(a["questionId"].clone())
                .ok()
                .and_then(|qid| api.question(qid))
                .map(|q| q["correctAnswer"] == a["selectedAnswer"])
                .unwrap_or(false)
        })
        .count();
    if let Some(a) = api.attempts.lock().unwrap().get_mut(&attempt_id) {
        a["finishedAt"] = json!(Utc::now());
    }
    Json(json!({ "score": score })).into_response()
}

pub async fn spawn_fake_api() -> (String, Arc<FakeQuizApi>) {
    let fake = Arc::new(FakeQuizApi::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/Quiz", get(list_quizzes).post(create_quiz))
        .route("/api/Quiz/:id", get(get_quiz).put(update_quiz).delete(delete_quiz))
        .route("/api/Question", post(create_question))
        .route("/api/Question/quiz/:id", get(list_questions))
        .route(
            "/api/Question/:id",
            get(get_question).put(update_question).delete(delete_question),
        )
        .route("/api/PublicQuiz", get(public_quizzes))
        .route("/api/PublicQuiz/start", post(start))
        .route("/api/PublicQuiz/attempt/:id", get(attempt))
        .route("/api/PublicQuiz/answer", post(answer))
        .route("/api/PublicQuiz/answer/bulk-empty", post(bulk_empty))
        .route("/api/PublicQuiz/finish", post(finish))
        .route("/api/PublicQuestion/:id", get(public_questions))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake api");
    let addr = listener.local_addr().expect("fake api addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake api server");
    });
    (format!("http://{}/api", addr), fake)
}

pub struct TestApp {
    pub api_url: String,
    pub router: Router,
    pub state: AppState,
    pub fake: Arc<FakeQuizApi>,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<dyn KeyValueStore>,
}

pub fn test_config(api_url: &str) -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        api_url: api_url.to_string(),
        storage_path: "unused.json".to_string(),
        request_timeout_secs: 5,
        cache_dedupe_ms: 60_000,
        session_tick_ms: 1000,
        session_idle_secs: 3600,
        default_quiz_id: None,
    }
}

pub async fn test_app() -> TestApp {
    let (api_url, fake) = spawn_fake_api().await;
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new());
    let state = AppState::with_clock(&test_config(&api_url), storage.clone(), clock.clone())
        .expect("app state");
    TestApp {
        api_url,
        router: quiz_portal::routes::router(state.clone()),
        state,
        fake,
        clock,
        storage,
    }
}

impl TestApp {
    pub async fn call(&self, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, HeaderMap, JsonValue) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, headers, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, JsonValue) {
        let (status, _, body) = self.call("GET", uri, None).await;
        (status, body)
    }

    pub async fn post(&self, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
        let (status, _, body) = self.call("POST", uri, Some(body)).await;
        (status, body)
    }

    pub async fn sign_in(&self) {
        let (status, body) = self
            .post(
                "/api/auth/login",
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    }
}
