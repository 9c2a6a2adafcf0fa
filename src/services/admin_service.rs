use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::dto::admin_dto::{
    page_count, DialogView, ListQuery, MutationView, QuestionForm, QuestionRow, QuizForm, QuizRow,
    TableView,
};
use crate::dto::common::{Breadcrumb, Notice};
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::quiz::{Page, Quiz};
use crate::services::api_client::ApiClient;
use crate::services::read_cache::ReadCache;
use crate::utils::validation::validate;

/// Quiz and question management behind the admin dashboard.
#[derive(Clone)]
pub struct AdminService {
    api: ApiClient,
    cache: ReadCache,
    /// Last search seen per table, keyed by the list URL path.
    searches: Arc<Mutex<HashMap<String, String>>>,
}

impl AdminService {
    pub fn new(api: ApiClient, cache: ReadCache) -> Self {
        Self {
            api,
            cache,
            searches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A changed search text sends the table back to its first page.
    fn committed(&self, table: &str, query: &ListQuery) -> Result<ListQuery> {
        let previous = self
            .searches
            .lock()
            .map_err(|_| Error::Internal("Search state lock poisoned".to_string()))?
            .insert(table.to_string(), query.search.clone());
        match previous {
            Some(previous) if previous != query.search => {
                tracing::debug!(table, search = %query.search, "Search changed, resetting page");
                Ok(query.commit_search(&query.search))
            }
            _ => Ok(query.clone()),
        }
    }

    async fn cached<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let api = self.api.clone();
        let key = url.clone();
        let value = self
            .cache
            .read(&key, move || async move { api.get_json::<Value>(&url).await })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Re-fetches every cached read under `prefix` after a mutation.
    async fn refresh(&self, prefix: &str) {
        let api = self.api.clone();
        self.cache
            .revalidate_prefix(prefix, |key| {
                let api = api.clone();
                async move { api.get_json::<Value>(&key).await }
            })
            .await;
    }

    pub async fn quiz_table(&self, query: &ListQuery) -> Result<TableView<QuizRow>> {
        validate(query)?;
        let query = self.committed(&self.api.urls().quiz, query)?;
        let page: Page<Quiz> = self.cached(self.api.urls().quiz_list(&query)?).await?;
        Ok(TableView {
            title: "Quiz Management".to_string(),
            breadcrumbs: vec![Breadcrumb::current("Home"), Breadcrumb::current("Quiz")],
            rows: page.items.iter().map(QuizRow::from).collect(),
            total_count: page.total_count,
            page_count: page_count(page.total_count, query.page_size),
            pagination: query,
        })
    }

    pub fn new_quiz_dialog(&self) -> DialogView<QuizForm> {
        DialogView::new_quiz()
    }

    pub async fn edit_quiz_dialog(&self, id: Uuid) -> Result<DialogView<QuizForm>> {
        let quiz: Quiz = self.cached(self.api.urls().quiz_item(id)).await?;
        Ok(DialogView::edit_quiz(&quiz))
    }

    pub async fn create_quiz(&self, form: &QuizForm) -> Result<MutationView<Value>> {
        validate(form)?;
        let created = self.api.create_quiz(&form.create_payload()).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to create quiz");
            e
        })?;
        tracing::info!(title = %form.title, "Quiz created");
        self.refresh(&self.api.urls().quiz).await;
        Ok(MutationView {
            data: Some(created),
            notices: vec![Notice::success("Quiz created successfully!")],
            dialog: None,
        })
    }

    /// Publishing a quiz without questions is refused upstream; that message
    /// and its error code reach the caller unchanged.
    pub async fn update_quiz(&self, id: Uuid, form: &QuizForm) -> Result<MutationView<Value>> {
        validate(form)?;
        let updated = self
            .api
            .update_quiz(id, &form.update_payload())
            .await
            .map_err(|e| {
                tracing::warn!(quiz_id = %id, error = %e, "Failed to update quiz");
                e
            })?;
        tracing::info!(quiz_id = %id, "Quiz updated");
        self.refresh(&self.api.urls().quiz).await;
        Ok(MutationView {
            data: Some(updated),
            notices: vec![Notice::success("Quiz updated successfully!")],
            dialog: None,
        })
    }

    pub async fn delete_quiz(&self, id: Uuid) -> Result<MutationView<Value>> {
        self.api.delete_quiz(id).await.map_err(|e| {
            tracing::warn!(quiz_id = %id, error = %e, "Failed to delete quiz");
            e
        })?;
        tracing::info!(quiz_id = %id, "Quiz deleted");
        self.refresh(&self.api.urls().quiz).await;
        self.refresh(&self.api.urls().questions_of(id)).await;
        Ok(MutationView {
            data: None,
            notices: vec![Notice::success("Quiz deleted successfully!")],
            dialog: None,
        })
    }

    pub async fn question_table(&self, quiz_id: Uuid, query: &ListQuery) -> Result<TableView<QuestionRow>> {
        validate(query)?;
        let query = self.committed(&self.api.urls().questions_of(quiz_id), query)?;
        let page: Page<Question> = self
            .cached(self.api.urls().question_list(quiz_id, &query)?)
            .await?;
        Ok(TableView {
            title: "Question Management".to_string(),
            breadcrumbs: vec![
                Breadcrumb::link("Home", "/admin"),
                Breadcrumb::link("Quiz", "/admin/quiz"),
                Breadcrumb::current("Questions"),
            ],
            rows: page.items.iter().map(QuestionRow::from).collect(),
            total_count: page.total_count,
            page_count: page_count(page.total_count, query.page_size),
            pagination: query,
        })
    }

    pub fn new_question_dialog(&self) -> DialogView<QuestionForm> {
        DialogView::new_question()
    }

    pub async fn edit_question_dialog(&self, id: Uuid) -> Result<DialogView<QuestionForm>> {
        let question: Question = self.cached(self.api.urls().question_item(id)).await?;
        Ok(DialogView::edit_question(&question))
    }

    async fn refresh_questions(&self, quiz_id: Uuid) {
        self.refresh(&self.api.urls().questions_of(quiz_id)).await;
        self.refresh(&self.api.urls().quiz).await;
    }

    pub async fn create_question(&self, quiz_id: Uuid, form: &QuestionForm) -> Result<MutationView<Value>> {
        validate(form)?;
        let created = self
            .api
            .create_question(&form.payload(quiz_id))
            .await
            .map_err(|e| {
                tracing::warn!(%quiz_id, error = %e, "Failed to create question");
                e
            })?;
        tracing::info!(%quiz_id, "Question created");
        self.refresh_questions(quiz_id).await;
        Ok(MutationView {
            data: Some(created),
            notices: vec![Notice::success("Question created successfully!")],
            dialog: form.save_and_new.then(DialogView::<QuestionForm>::new_question),
        })
    }

    pub async fn update_question(
        &self,
        quiz_id: Uuid,
        id: Uuid,
        form: &QuestionForm,
    ) -> Result<MutationView<Value>> {
        validate(form)?;
        let updated = self
            .api
            .update_question(id, &form.payload(quiz_id))
            .await
            .map_err(|e| {
                tracing::warn!(question_id = %id, error = %e, "Failed to update question");
                e
            })?;
        tracing::info!(question_id = %id, "Question updated");
        self.refresh(&self.api.urls().question_item(id)).await;
        self.refresh_questions(quiz_id).await;
        Ok(MutationView {
            data: Some(updated),
            notices: vec![Notice::success("Question updated successfully!")],
            dialog: None,
        })
    }

    pub async fn delete_question(&self, quiz_id: Uuid, id: Uuid) -> Result<MutationView<Value>> {
        self.api.delete_question(id).await.map_err(|e| {
            tracing::warn!(question_id = %id, error = %e, "Failed to delete question");
            e
        })?;
        tracing::info!(question_id = %id, "Question deleted");
        self.refresh(&self.api.urls().question_item(id)).await;
        self.refresh_questions(quiz_id).await;
        Ok(MutationView {
            data: None,
            notices: vec![Notice::success("Question deleted successfully!")],
            dialog: None,
        })
    }
}
