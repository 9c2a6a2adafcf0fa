use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::services::storage::KeyValueStore;
use crate::utils::time::{from_millis_str, to_millis_string};

pub fn question_timer_key(attempt_id: Uuid, question_id: Uuid) -> String {
    format!("timer_{}_{}", attempt_id, question_id)
}

pub fn overall_timer_key(attempt_id: Uuid) -> String {
    format!("overall_timer_{}", attempt_id)
}

/// Countdown start timestamps kept in durable storage so a reopened session
/// resumes its countdowns instead of restarting them. Storage failures are
/// logged and never interrupt a quiz.
#[derive(Clone)]
pub struct TimerStore {
    storage: Arc<dyn KeyValueStore>,
}

impl TimerStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Returns the persisted start for `key`, recording `now` if there is none.
    pub fn start_or_resume(&self, key: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.storage.get(key) {
            Ok(Some(raw)) => {
                if let Some(started) = from_millis_str(&raw) {
                    return started;
                }
                tracing::warn!(key, raw = %raw, "Discarding unreadable timer start");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key, error = %e, "Failed to read timer start"),
        }
        if let Err(e) = self.storage.set(key, &to_millis_string(now)) {
            tracing::warn!(key, error = %e, "Failed to persist timer start");
        }
        now
    }

    pub fn clear(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            tracing::warn!(key, error = %e, "Failed to clear timer start");
        }
    }
}
