use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::dto::common::{Breadcrumb, Notice};
use crate::models::question::Question;
use crate::models::quiz::{Quiz, QuizStatus, TimerType};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Table state sent by the dashboard: 0-based page index, page size and the
/// committed search text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub page_index: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: u32,
    #[serde(default)]
    pub search: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            search: String::new(),
        }
    }
}

impl ListQuery {
    /// The quiz API counts pages from 1.
    pub fn page(&self) -> u32 {
        self.page_index.saturating_add(1)
    }

    /// Committing a new search always goes back to the first page.
    pub fn commit_search(&self, search: &str) -> Self {
        Self {
            page_index: 0,
            page_size: self.page_size,
            search: search.to_string(),
        }
    }

    pub fn apply(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("page", &self.page().to_string())
            .append_pair("pageSize", &self.page_size.to_string())
            .append_pair("search", &self.search);
    }
}

pub fn page_count(total_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size as u64)
}

/// Rejects text that is empty once trimmed.
fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn deserialize_timer_type<'de, D>(deserializer: D) -> std::result::Result<Option<TimerType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("PerQuestion") => Ok(Some(TimerType::PerQuestion)),
        Some("Overall") => Ok(Some(TimerType::Overall)),
        Some(other) => Err(serde::de::Error::custom(format!("Invalid timer type: {}", other))),
    }
}

fn deserialize_duration_flexible<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(u32),
        String(String),
    }

    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(n)) => Ok(Some(n)),
        Some(IntOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(IntOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timer duration: {}", s))),
    }
}

/// Fields of the quiz dialog, shared by create and edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizForm {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub use_timer: bool,
    #[serde(default, deserialize_with = "deserialize_timer_type")]
    pub timer_type: Option<TimerType>,
    #[serde(default, deserialize_with = "deserialize_duration_flexible")]
    #[validate(range(min = 1, message = "Timer duration must be at least 1 second"))]
    pub timer_duration: Option<u32>,
    #[serde(default)]
    pub highlight_correct_answer: bool,
    #[serde(default)]
    pub allow_retake: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub status: QuizStatus,
}

impl From<&Quiz> for QuizForm {
    fn from(quiz: &Quiz) -> Self {
        Self {
            title: quiz.name.clone(),
            use_timer: quiz.use_timer,
            timer_type: quiz.timer_type,
            timer_duration: quiz.timer_duration,
            highlight_correct_answer: quiz.highlight_correct_answer,
            allow_retake: quiz.allow_retake,
            is_public: quiz.is_public,
            status: quiz.status,
        }
    }
}

impl QuizForm {
    /// New quizzes leave the status to the quiz API, which starts them as drafts.
    pub fn create_payload(&self) -> QuizPayload {
        self.payload(None)
    }

    pub fn update_payload(&self) -> QuizPayload {
        self.payload(Some(self.status))
    }

    fn payload(&self, status: Option<QuizStatus>) -> QuizPayload {
        QuizPayload {
            title: self.title.trim().to_string(),
            use_timer: self.use_timer,
            timer_type: self.timer_type,
            timer_duration: self.timer_duration,
            highlight_correct_answer: self.highlight_correct_answer,
            allow_retake: self.allow_retake,
            is_public: self.is_public,
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuizPayload {
    pub title: String,
    pub use_timer: bool,
    pub timer_type: Option<TimerType>,
    pub timer_duration: Option<u32>,
    pub highlight_correct_answer: bool,
    pub allow_retake: bool,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QuizStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionForm {
    #[validate(custom(function = "not_blank", message = "Question text is required"))]
    pub text: String,
    #[validate(custom(function = "not_blank", message = "Correct answer is required"))]
    pub correct_answer: String,
    #[serde(default)]
    pub incorrect_answers: Vec<String>,
    /// "Save and New" keeps the dialog open with an empty form.
    #[serde(default)]
    pub save_and_new: bool,
}

impl Default for QuestionForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            correct_answer: String::new(),
            incorrect_answers: vec![String::new()],
            save_and_new: false,
        }
    }
}

impl From<&Question> for QuestionForm {
    fn from(question: &Question) -> Self {
        let incorrect_answers = if question.incorrect_answers.is_empty() {
            vec![String::new()]
        } else {
            question.incorrect_answers.clone()
        };
        Self {
            text: question.text.clone(),
            correct_answer: question.correct_answer.clone(),
            incorrect_answers,
            save_and_new: false,
        }
    }
}

impl QuestionForm {
    pub fn payload(&self, quiz_id: Uuid) -> QuestionPayload {
        QuestionPayload {
            quiz_id,
            text: self.text.clone(),
            correct_answer: self.correct_answer.clone(),
            incorrect_answers: self
                .incorrect_answers
                .iter()
                .filter(|a| !a.trim().is_empty())
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuestionPayload {
    pub quiz_id: Uuid,
    pub text: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerBadge {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRow {
    pub id: Uuid,
    pub name: String,
    pub question_count: u32,
    pub timer: TimerBadge,
    pub highlight_correct_answer: &'static str,
    pub allow_retake: &'static str,
    pub is_public: &'static str,
    pub status: QuizStatus,
    pub questions_href: String,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

impl From<&Quiz> for QuizRow {
    fn from(quiz: &Quiz) -> Self {
        let timer = match (quiz.use_timer, quiz.timer_type) {
            (true, Some(kind)) => TimerBadge {
                label: kind.badge().to_string(),
                duration: quiz.timer_duration.map(|d| format!("{}s", d)),
            },
            _ => TimerBadge {
                label: "No Timer".to_string(),
                duration: None,
            },
        };
        Self {
            id: quiz.id,
            name: quiz.name.clone(),
            question_count: quiz.question_count,
            timer,
            highlight_correct_answer: yes_no(quiz.highlight_correct_answer),
            allow_retake: yes_no(quiz.allow_retake),
            is_public: yes_no(quiz.is_public),
            status: quiz.status,
            questions_href: format!("/admin/quiz/{}", quiz.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub id: Uuid,
    pub text: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

impl From<&Question> for QuestionRow {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            correct_answer: question.correct_answer.clone(),
            incorrect_answers: question.incorrect_answers.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView<T> {
    pub title: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub rows: Vec<T>,
    pub total_count: u64,
    pub page_count: u64,
    pub pagination: ListQuery,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogView<F> {
    pub title: &'static str,
    pub description: &'static str,
    pub submit_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing: Option<Uuid>,
    pub form: F,
}

impl DialogView<QuizForm> {
    pub fn new_quiz() -> Self {
        Self {
            title: "New Quiz",
            description: "Enter the title for the new quiz.",
            submit_label: "Create",
            secondary_label: None,
            editing: None,
            form: QuizForm::default(),
        }
    }

    pub fn edit_quiz(quiz: &Quiz) -> Self {
        Self {
            title: "Edit Quiz",
            description: "Update the title for the quiz.",
            submit_label: "Update",
            secondary_label: None,
            editing: Some(quiz.id),
            form: QuizForm::from(quiz),
        }
    }
}

impl DialogView<QuestionForm> {
    pub fn new_question() -> Self {
        Self {
            title: "New Question",
            description: "Enter the details for the new question.",
            submit_label: "Save",
            secondary_label: Some("Save and New"),
            editing: None,
            form: QuestionForm::default(),
        }
    }

    pub fn edit_question(question: &Question) -> Self {
        Self {
            title: "Edit Question",
            description: "Update the details for the question.",
            submit_label: "Update",
            secondary_label: None,
            editing: Some(question.id),
            form: QuestionForm::from(question),
        }
    }
}

/// Outcome of a create/update/delete from the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationView<T> {
    pub data: Option<T>,
    pub notices: Vec<Notice>,
    /// Set when the dialog stays open (save-and-new) with a fresh form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog: Option<DialogView<QuestionForm>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_query_builds_one_based_page_params() {
        let query = ListQuery {
            page_index: 2,
            page_size: 25,
            search: "rust lang".to_string(),
        };
        let mut url = Url::parse("http://localhost:5133/api/Quiz").unwrap();
        query.apply(&mut url);
        assert_eq!(
            url.as_str(),
            "http://localhost:5133/api/Quiz?page=3&pageSize=25&search=rust+lang"
        );
    }

    #[test]
    fn committing_search_resets_page_index() {
        let query = ListQuery {
            page_index: 4,
            page_size: 20,
            search: String::new(),
        };
        let next = query.commit_search("geo");
        assert_eq!(next.page_index, 0);
        assert_eq!(next.page_size, 20);
        assert_eq!(next.search, "geo");
    }

    #[test]
    fn last_page_index_does_not_overflow() {
        let query: ListQuery = serde_json::from_value(json!({ "pageIndex": u32::MAX })).unwrap();
        let mut url = Url::parse("http://localhost:5133/api/Quiz").unwrap();
        query.apply(&mut url);
        assert_eq!(query.page(), u32::MAX);
        assert!(url.as_str().contains("page=4294967295&pageSize=10"));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }

    #[test]
    fn quiz_form_accepts_blank_timer_fields() {
        let form: QuizForm = serde_json::from_value(json!({
            "title": "Capitals",
            "useTimer": false,
            "timerType": "",
            "timerDuration": ""
        }))
        .unwrap();
        assert_eq!(form.timer_type, None);
        assert_eq!(form.timer_duration, None);

        let form: QuizForm = serde_json::from_value(json!({
            "title": "Capitals",
            "useTimer": true,
            "timerType": "PerQuestion",
            "timerDuration": "30"
        }))
        .unwrap();
        assert_eq!(form.timer_type, Some(TimerType::PerQuestion));
        assert_eq!(form.timer_duration, Some(30));
    }

    #[test]
    fn create_payload_omits_status_and_update_payload_sends_it() {
        let form = QuizForm {
            title: "Capitals".to_string(),
            status: QuizStatus::Publish,
            ..Default::default()
        };
        let created = serde_json::to_value(form.create_payload()).unwrap();
        assert!(created.get("Status").is_none());
        assert_eq!(created["Title"], "Capitals");
        assert_eq!(created["TimerType"], serde_json::Value::Null);

        let updated = serde_json::to_value(form.update_payload()).unwrap();
        assert_eq!(updated["Status"], "publish");
    }

    #[test]
    fn zero_timer_duration_fails_validation() {
        let form = QuizForm {
            title: "Capitals".to_string(),
            use_timer: true,
            timer_type: Some(TimerType::Overall),
            timer_duration: Some(0),
            ..Default::default()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn whitespace_only_text_fails_validation() {
        let form = QuizForm {
            title: "   ".to_string(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.to_string().contains("Title is required"));

        let question = QuestionForm {
            text: "\t".to_string(),
            correct_answer: " ".to_string(),
            ..Default::default()
        };
        let errors = question.validate().unwrap_err().to_string();
        assert!(errors.contains("Question text is required"));
        assert!(errors.contains("Correct answer is required"));

        let form = QuizForm {
            title: "  Capitals ".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn question_payload_drops_blank_incorrect_answers() {
        let form = QuestionForm {
            text: "2 + 2?".to_string(),
            correct_answer: "4".to_string(),
            incorrect_answers: vec!["3".into(), "  ".into(), "".into(), "5".into()],
            save_and_new: false,
        };
        let payload = form.payload(Uuid::nil());
        assert_eq!(payload.incorrect_answers, vec!["3".to_string(), "5".to_string()]);
        let body = serde_json::to_value(&payload).unwrap();
        assert!(body.get("QuizId").is_some());
        assert!(body.get("IncorrectAnswers").is_some());
    }

    #[test]
    fn editing_question_without_incorrect_answers_shows_one_blank_field() {
        let question = Question {
            id: Uuid::new_v4(),
            text: "Sky colour?".to_string(),
            correct_answer: "Blue".to_string(),
            incorrect_answers: vec![],
            quiz_id: Uuid::new_v4(),
        };
        let dialog = DialogView::edit_question(&question);
        assert_eq!(dialog.submit_label, "Update");
        assert_eq!(dialog.form.incorrect_answers, vec![String::new()]);
    }

    #[test]
    fn quiz_row_renders_timer_badge() {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            name: "Timed".to_string(),
            use_timer: true,
            timer_type: Some(TimerType::PerQuestion),
            timer_duration: Some(20),
            highlight_correct_answer: true,
            allow_retake: false,
            is_public: true,
            status: QuizStatus::Draft,
            question_count: 3,
        };
        let row = QuizRow::from(&quiz);
        assert_eq!(row.timer.label, "Per Question");
        assert_eq!(row.timer.duration.as_deref(), Some("20s"));
        assert_eq!(row.highlight_correct_answer, "Yes");
        assert_eq!(row.allow_retake, "No");

        let untimed = Quiz { use_timer: false, ..quiz };
        assert_eq!(QuizRow::from(&untimed).timer.label, "No Timer");
    }
}
