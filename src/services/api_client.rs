use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::dto::admin_dto::{ListQuery, QuestionPayload, QuizPayload};
use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::dto::public_dto::{
    BulkEmptyAnswersRequest, FinishRequest, FinishResponse, StartQuizRequest, StartQuizResponse,
    SubmitAnswerRequest,
};
use crate::error::{Error, Result};
use crate::models::attempt::Attempt;
use crate::models::question::{PublicQuestion, Question};
use crate::models::quiz::{Page, Quiz};
use crate::services::auth_store::AuthStore;

/// Endpoint layout of the quiz API, derived from its base URL.
#[derive(Debug, Clone)]
pub struct ApiUrls {
    pub base: String,
    pub quiz: String,
    pub question: String,
    pub question_by_quiz: String,
    pub auth: String,
    pub public_quiz: String,
    pub public_question: String,
}

impl ApiUrls {
    pub fn new(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            quiz: format!("{}/Quiz", base),
            question: format!("{}/Question", base),
            question_by_quiz: format!("{}/Question/quiz", base),
            auth: format!("{}/auth/login", base),
            public_quiz: format!("{}/PublicQuiz", base),
            public_question: format!("{}/PublicQuestion", base),
            base,
        }
    }

    pub fn quiz_list(&self, query: &ListQuery) -> Result<String> {
        with_query(&self.quiz, query)
    }

    pub fn quiz_item(&self, id: Uuid) -> String {
        format!("{}/{}", self.quiz, id)
    }

    /// Prefix shared by every cached page of one quiz's question table.
    pub fn questions_of(&self, quiz_id: Uuid) -> String {
        format!("{}/{}", self.question_by_quiz, quiz_id)
    }

    pub fn question_list(&self, quiz_id: Uuid, query: &ListQuery) -> Result<String> {
        with_query(&self.questions_of(quiz_id), query)
    }

    pub fn question_item(&self, id: Uuid) -> String {
        format!("{}/{}", self.question, id)
    }

    pub fn public_questions(&self, quiz_id: Uuid) -> String {
        format!("{}/{}", self.public_question, quiz_id)
    }

    pub fn attempt(&self, attempt_id: Uuid) -> String {
        format!("{}/attempt/{}", self.public_quiz, attempt_id)
    }

    pub fn start(&self) -> String {
        format!("{}/start", self.public_quiz)
    }

    pub fn answer(&self) -> String {
        format!("{}/answer", self.public_quiz)
    }

    pub fn bulk_empty(&self) -> String {
        format!("{}/answer/bulk-empty", self.public_quiz)
    }

    pub fn finish(&self) -> String {
        format!("{}/finish", self.public_quiz)
    }
}

fn with_query(base: &str, query: &ListQuery) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::Config(format!("Invalid quiz API URL {}: {}", base, e)))?;
    query.apply(&mut url);
    Ok(url.into())
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn with_body(method: Method, body: &impl Serialize) -> Result<Self> {
        Ok(Self {
            method,
            headers: HeaderMap::new(),
            body: Some(serde_json::to_value(body)?),
        })
    }
}

/// Operations the quiz-taking flow needs from the quiz API.
#[trait_variant::make(QuizApi: Send)]
pub trait LocalQuizApi {
    async fn public_quizzes(&self) -> Result<Vec<Quiz>>;
    async fn start_quiz(&self, request: &StartQuizRequest) -> Result<StartQuizResponse>;
    async fn questions(&self, quiz_id: Uuid) -> Result<Vec<PublicQuestion>>;
    async fn attempt(&self, attempt_id: Uuid) -> Result<Attempt>;
    async fn submit_answer(&self, request: &SubmitAnswerRequest) -> Result<()>;
    async fn submit_bulk_empty(&self, request: &BulkEmptyAnswersRequest) -> Result<()>;
    async fn finish(&self, request: &FinishRequest) -> Result<FinishResponse>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    urls: ApiUrls,
    auth: AuthStore,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_secs: u64, auth: AuthStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let urls = ApiUrls::new(base_url);
        tracing::info!("Quiz API client configured for {}", urls.base);
        Ok(Self { client, urls, auth })
    }

    pub fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    /// Sends one JSON request, attaching the bearer token when signed in.
    /// A non-success status becomes [`Error::Api`] carrying the parsed body.
    pub async fn request<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T> {
        let mut builder = self
            .client
            .request(options.method.clone(), url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.auth.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder = builder.headers(options.headers);
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let info = serde_json::from_str(&text).unwrap_or(Value::String(text));
            tracing::warn!(
                method = %options.method,
                url,
                status = status.as_u16(),
                "Quiz API request failed"
            );
            return Err(Error::Api {
                status: status.as_u16(),
                info,
            });
        }

        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.request(url, RequestOptions::default()).await
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, url: &str, body: &impl Serialize) -> Result<T> {
        self.request(url, RequestOptions::with_body(method, body)?).await
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let options = RequestOptions {
            method: Method::DELETE,
            ..Default::default()
        };
        let _: Value = self.request(url, options).await?;
        Ok(())
    }

    pub async fn list_quizzes(&self, query: &ListQuery) -> Result<Page<Quiz>> {
        self.get_json(&self.urls.quiz_list(query)?).await
    }

    pub async fn get_quiz(&self, id: Uuid) -> Result<Quiz> {
        self.get_json(&self.urls.quiz_item(id)).await
    }

    pub async fn create_quiz(&self, payload: &QuizPayload) -> Result<Value> {
        self.send(Method::POST, &self.urls.quiz, payload).await
    }

    pub async fn update_quiz(&self, id: Uuid, payload: &QuizPayload) -> Result<Value> {
        self.send(Method::PUT, &self.urls.quiz_item(id), payload).await
    }

    pub async fn delete_quiz(&self, id: Uuid) -> Result<()> {
        self.delete(&self.urls.quiz_item(id)).await
    }

    pub async fn list_questions(&self, quiz_id: Uuid, query: &ListQuery) -> Result<Page<Question>> {
        self.get_json(&self.urls.question_list(quiz_id, query)?).await
    }

    pub async fn get_question(&self, id: Uuid) -> Result<Question> {
        self.get_json(&self.urls.question_item(id)).await
    }

    pub async fn create_question(&self, payload: &QuestionPayload) -> Result<Value> {
        self.send(Method::POST, &self.urls.question, payload).await
    }

    pub async fn update_question(&self, id: Uuid, payload: &QuestionPayload) -> Result<Value> {
        self.send(Method::PUT, &self.urls.question_item(id), payload).await
    }

    pub async fn delete_question(&self, id: Uuid) -> Result<()> {
        self.delete(&self.urls.question_item(id)).await
    }

    /// Exchanges credentials for a token. Sent without the bearer header.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let response = self
            .client
            .post(&self.urls.auth)
            .json(&serde_json::json!({
                "email": request.email,
                "password": request.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Login failed")
                .to_string();
            tracing::warn!(status = status.as_u16(), "Login rejected by quiz API");
            return Err(Error::Unauthorized(message));
        }

        Ok(response.json().await?)
    }
}

impl QuizApi for ApiClient {
    async fn public_quizzes(&self) -> Result<Vec<Quiz>> {
        self.get_json(&self.urls.public_quiz).await
    }

    async fn start_quiz(&self, request: &StartQuizRequest) -> Result<StartQuizResponse> {
        self.send(Method::POST, &self.urls.start(), request).await
    }

    async fn questions(&self, quiz_id: Uuid) -> Result<Vec<PublicQuestion>> {
        self.get_json(&self.urls.public_questions(quiz_id)).await
    }

    async fn attempt(&self, attempt_id: Uuid) -> Result<Attempt> {
        self.get_json(&self.urls.attempt(attempt_id)).await
    }

    async fn submit_answer(&self, request: &SubmitAnswerRequest) -> Result<()> {
        let _: Value = self.send(Method::POST, &self.urls.answer(), request).await?;
        Ok(())
    }

    async fn submit_bulk_empty(&self, request: &BulkEmptyAnswersRequest) -> Result<()> {
        let _: Value = self.send(Method::POST, &self.urls.bulk_empty(), request).await?;
        Ok(())
    }

    async fn finish(&self, request: &FinishRequest) -> Result<FinishResponse> {
        self.send(Method::POST, &self.urls.finish(), request).await
    }
}
