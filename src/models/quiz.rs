use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_QUESTION_SECONDS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerType {
    PerQuestion,
    Overall,
}

impl TimerType {
    pub fn badge(&self) -> &'static str {
        match self {
            TimerType::PerQuestion => "Per Question",
            TimerType::Overall => "Per Quiz",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    #[default]
    Draft,
    Publish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub name: String,
    pub use_timer: bool,
    #[serde(default)]
    pub timer_type: Option<TimerType>,
    #[serde(default)]
    pub timer_duration: Option<u32>,
    pub highlight_correct_answer: bool,
    pub allow_retake: bool,
    pub is_public: bool,
    #[serde(default)]
    pub status: QuizStatus,
    #[serde(default)]
    pub question_count: u32,
}

impl Quiz {
    pub fn is_publishable(&self) -> bool {
        self.status == QuizStatus::Publish && self.is_public
    }

    pub fn settings(&self) -> QuizSettings {
        QuizSettings {
            use_timer: self.use_timer,
            timer_type: self.timer_type,
            timer_duration: self.timer_duration,
            highlight_correct_answer: self.highlight_correct_answer,
            allow_retake: self.allow_retake,
        }
    }
}

/// The subset of a quiz that shapes how an attempt is played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
    pub use_timer: bool,
    pub timer_type: Option<TimerType>,
    pub timer_duration: Option<u32>,
    pub highlight_correct_answer: bool,
    pub allow_retake: bool,
}

impl QuizSettings {
    pub fn timer(&self) -> Option<TimerType> {
        if self.use_timer {
            self.timer_type
        } else {
            None
        }
    }

    pub fn duration_secs(&self) -> i64 {
        self.timer_duration
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_QUESTION_SECONDS) as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_count: u64,
    pub items: Vec<T>,
}
