use std::sync::Arc;

use url::form_urlencoded;
use uuid::Uuid;

use crate::dto::public_dto::{PublicQuizView, StartQuizForm, StartQuizRequest, StartQuizView};
use crate::error::{Error, Result};
use crate::services::api_client::QuizApi;
use crate::utils::validation::is_valid_email;

pub const START_FAILED: &str = "Failed to start quiz. Please try again.";

pub struct PublicService<A> {
    api: Arc<A>,
    default_quiz_id: Option<Uuid>,
}

impl<A> Clone for PublicService<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            default_quiz_id: self.default_quiz_id,
        }
    }
}

impl<A> PublicService<A>
where
    A: QuizApi + Send + Sync + 'static,
{
    pub fn new(api: Arc<A>, default_quiz_id: Option<Uuid>) -> Self {
        Self {
            api,
            default_quiz_id,
        }
    }

    pub async fn list_publishable(&self) -> Result<Vec<PublicQuizView>> {
        let quizzes = self.api.public_quizzes().await?;
        Ok(quizzes
            .iter()
            .filter(|q| q.is_publishable())
            .map(PublicQuizView::from)
            .collect())
    }

    pub async fn start(&self, form: &StartQuizForm) -> Result<StartQuizView> {
        let email = form.email.trim();
        if email.is_empty() {
            return Err(Error::BadRequest("Email is required".to_string()));
        }
        if !is_valid_email(email) {
            return Err(Error::BadRequest("Please enter a valid email address".to_string()));
        }
        if !form.terms_agreed {
            return Err(Error::BadRequest(
                "You must agree to the terms and conditions".to_string(),
            ));
        }
        let quiz_id = form
            .quiz_id
            .or(self.default_quiz_id)
            .ok_or_else(|| Error::BadRequest("Choose a quiz to start".to_string()))?;

        let request = StartQuizRequest {
            email: email.to_string(),
            quiz_id,
        };
        let response = self.api.start_quiz(&request).await.map_err(|e| {
            tracing::warn!(%quiz_id, error = %e, "Failed to start quiz");
            Error::Upstream(START_FAILED.to_string())
        })?;

        tracing::info!(%quiz_id, attempt_id = %response.attempt_id, "Attempt started");
        Ok(StartQuizView {
            attempt_id: response.attempt_id,
            redirect: questions_href(email, response.attempt_id),
        })
    }
}

pub fn questions_href(email: &str, attempt_id: Uuid) -> String {
    let email: String = form_urlencoded::byte_serialize(email.as_bytes()).collect();
    format!("/quiz/questions?email={}&attemptId={}", email, attempt_id)
}
