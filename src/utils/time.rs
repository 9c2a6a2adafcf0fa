use chrono::{DateTime, TimeZone, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

pub fn to_millis_string(dt: DateTime<Utc>) -> String {
    dt.timestamp_millis().to_string()
}

pub fn from_millis_str(s: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = s.trim().parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Whole seconds left on a countdown of `duration_secs` started at `started`.
pub fn remaining_secs(started: DateTime<Utc>, duration_secs: i64, at: DateTime<Utc>) -> i64 {
    let elapsed = (at - started).num_seconds().max(0);
    (duration_secs - elapsed).max(0)
}
