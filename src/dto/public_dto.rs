use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::common::Notice;
use crate::models::quiz::{Quiz, TimerType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub quiz_id: Option<Uuid>,
    #[serde(default)]
    pub terms_agreed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    pub email: String,
    pub quiz_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub attempt_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizView {
    pub attempt_id: Uuid,
    pub redirect: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmptyAnswersRequest {
    pub attempt_id: Uuid,
    pub question_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRequest {
    pub attempt_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishResponse {
    pub score: u32,
}

/// Query string of the questions page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub attempt_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerForm {
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub label: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub heading: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub kind: TimerType,
    pub duration_seconds: i64,
    pub remaining_seconds: i64,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAction {
    Next,
    Finish,
}

impl SessionAction {
    pub fn label(&self) -> &'static str {
        match self {
            SessionAction::Next => "Next Question",
            SessionAction::Finish => "Finish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Presenting,
    Answered,
    Finishing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub score: u32,
    pub limit: u32,
    pub allow_retake: bool,
    pub message: String,
    pub home_href: String,
}

impl ResultView {
    pub fn new(score: u32, limit: u32, allow_retake: bool) -> Self {
        Self {
            score,
            limit,
            allow_retake,
            message: format!("You scored: {}/{}", score, limit),
            home_href: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub attempt_id: Uuid,
    pub email: String,
    pub phase: Phase,
    pub label: String,
    pub question_number: usize,
    pub total_questions: usize,
    pub progress: f64,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerView>,
    pub action: SessionAction,
    pub action_label: String,
    pub action_enabled: bool,
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuitView {
    pub modal: String,
    pub title: String,
    pub confirm_href: String,
}

impl Default for QuitView {
    fn default() -> Self {
        Self {
            modal: "quitQuiz".to_string(),
            title: "Are you sure you want to quit the quiz?".to_string(),
            confirm_href: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuizView {
    pub id: Uuid,
    pub name: String,
    pub question_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_duration: Option<u32>,
}

impl From<&Quiz> for PublicQuizView {
    fn from(quiz: &Quiz) -> Self {
        let settings = quiz.settings();
        Self {
            id: quiz.id,
            name: quiz.name.clone(),
            question_count: quiz.question_count,
            timer: settings.timer(),
            timer_duration: settings.timer().and(quiz.timer_duration),
        }
    }
}
