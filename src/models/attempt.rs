use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(alias = "attemptId")]
    pub id: Uuid,
    pub quiz_id: Uuid,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub answers: Vec<RecordedAnswer>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAnswer {
    pub question_id: Uuid,
    /// Empty when the question was skipped or timed out.
    #[serde(default)]
    pub selected_answer: String,
    #[serde(default)]
    pub is_correct: bool,
}
