use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::dto::public_dto::{Phase, QuitView, SessionView};
use crate::error::{Error, Result};
use crate::models::quiz::QuizSettings;
use crate::services::api_client::QuizApi;
use crate::services::quiz_session::{QuizSession, Submission};
use crate::services::timer_store::TimerStore;
use crate::utils::time::Clock;
use crate::utils::validation::is_valid_email;

type Registry = HashMap<Uuid, QuizSession>;

/// How long a session whose overall timer ran out is kept for its player.
const EXPIRED_GRACE_SECS: i64 = 300;

/// Open quiz sessions keyed by attempt id. The registry lock is never held
/// across an await; submissions run on the tracker in the background.
pub struct SessionService<A> {
    api: Arc<A>,
    timers: TimerStore,
    clock: Arc<dyn Clock>,
    idle_ttl: Duration,
    sessions: Arc<Mutex<Registry>>,
    tracker: TaskTracker,
}

impl<A> Clone for SessionService<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            timers: self.timers.clone(),
            clock: self.clock.clone(),
            idle_ttl: self.idle_ttl,
            sessions: self.sessions.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

fn lock(sessions: &Mutex<Registry>) -> Result<MutexGuard<'_, Registry>> {
    sessions
        .lock()
        .map_err(|_| Error::Internal("Session registry lock poisoned".to_string()))
}

fn landing() -> Error {
    Error::Redirect("/".to_string())
}

impl<A> SessionService<A>
where
    A: QuizApi + Send + Sync + 'static,
{
    pub fn new(api: Arc<A>, timers: TimerStore, clock: Arc<dyn Clock>, idle_ttl: Duration) -> Self {
        Self {
            api,
            timers,
            clock,
            idle_ttl,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// Opens (or resumes) the session for an attempt. Anything that keeps
    /// the quiz from being played sends the caller back to the landing page.
    pub async fn open(&self, email: &str, attempt_id: Option<&str>) -> Result<SessionView> {
        let attempt_id = match attempt_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) if is_valid_email(email) => raw.parse::<Uuid>().map_err(|_| landing())?,
            _ => return Err(landing()),
        };

        let resumed_by = lock(&self.sessions)?
            .get(&attempt_id)
            .map(|s| s.email().to_string());
        if let Some(owner) = resumed_by {
            if !owner.trim().eq_ignore_ascii_case(email.trim()) {
                tracing::warn!(%attempt_id, "Session opened with a different email");
                return Err(landing());
            }
            return self.apply(attempt_id, |_, _| Ok(Vec::new()));
        }

        let attempt = self.api.attempt(attempt_id).await.map_err(|e| {
            tracing::warn!(%attempt_id, error = %e, "Failed to load attempt");
            landing()
        })?;
        if attempt.is_finished() {
            tracing::info!(%attempt_id, "Attempt already finished");
            return Err(landing());
        }
        let questions = self.api.questions(attempt.quiz_id).await.map_err(|e| {
            tracing::warn!(%attempt_id, quiz_id = %attempt.quiz_id, error = %e, "Failed to load questions");
            landing()
        })?;
        let settings = self.settings_for(attempt.quiz_id).await;

        let now = self.clock.now();
        let mut session = QuizSession::open(
            &attempt,
            email,
            questions,
            settings,
            self.timers.clone(),
            now,
            &mut rand::thread_rng(),
        );
        let submissions = session.tick(now);
        let view = session.view(now);
        lock(&self.sessions)?.insert(attempt_id, session);
        self.dispatch(attempt_id, submissions);
        Ok(view)
    }

    async fn settings_for(&self, quiz_id: Uuid) -> QuizSettings {
        match self.api.public_quizzes().await {
            Ok(quizzes) => match quizzes.iter().find(|q| q.id == quiz_id) {
                Some(quiz) => quiz.settings(),
                None => {
                    tracing::warn!(%quiz_id, "Quiz not in public list, playing without timer");
                    QuizSettings::default()
                }
            },
            Err(e) => {
                tracing::warn!(%quiz_id, error = %e, "Failed to load quiz settings");
                QuizSettings::default()
            }
        }
    }

    pub fn view(&self, attempt_id: Uuid) -> Result<SessionView> {
        self.apply(attempt_id, |_, _| Ok(Vec::new()))
    }

    pub fn answer(&self, attempt_id: Uuid, answer: &str) -> Result<SessionView> {
        self.apply(attempt_id, |session, now| Ok(vec![session.select(answer, now)?]))
    }

    pub fn next(&self, attempt_id: Uuid) -> Result<SessionView> {
        self.apply(attempt_id, |session, now| {
            session.next(now, &mut rand::thread_rng())?;
            Ok(Vec::new())
        })
    }

    /// Asks the quiz API to score the attempt. A failure leaves the session
    /// where it was and surfaces a notice.
    pub async fn finish(&self, attempt_id: Uuid) -> Result<SessionView> {
        let now = self.clock.now();
        let (request, submissions) = {
            let mut sessions = lock(&self.sessions)?;
            let session = sessions.get_mut(&attempt_id).ok_or_else(not_found)?;
            session.touch(now);
            let submissions = session.tick(now);
            (session.begin_finish(), submissions)
        };
        self.dispatch(attempt_id, submissions);
        let request = request?;

        let outcome = self.api.finish(&request).await;

        let now = self.clock.now();
        let mut sessions = lock(&self.sessions)?;
        let session = sessions.get_mut(&attempt_id).ok_or_else(not_found)?;
        session.touch(now);
        match outcome {
            Ok(response) => {
                session.complete_finish(response.score);
            }
            Err(e) => {
                tracing::warn!(%attempt_id, error = %e, "Failed to finish quiz");
                session.abort_finish();
            }
        }
        Ok(session.view(now))
    }

    pub fn quit(&self, attempt_id: Uuid) -> Result<QuitView> {
        if !lock(&self.sessions)?.contains_key(&attempt_id) {
            return Err(not_found());
        }
        Ok(QuitView::default())
    }

    /// Drops the local session. The attempt itself is left untouched.
    pub fn confirm_quit(&self, attempt_id: Uuid) -> Result<()> {
        if lock(&self.sessions)?.remove(&attempt_id).is_some() {
            tracing::info!(%attempt_id, "Quiz session abandoned");
        }
        Ok(())
    }

    /// Advances every open session's countdowns. Finished sessions are
    /// forgotten, as are abandoned ones: idle past the TTL, or past a short
    /// grace once their overall timer ran out. Persisted timers still let
    /// an evicted attempt resume correctly.
    pub fn tick_all(&self) -> Result<()> {
        let now = self.clock.now();
        let grace = Duration::seconds(EXPIRED_GRACE_SECS).min(self.idle_ttl);
        let pending: Vec<(Uuid, Vec<Submission>)> = {
            let mut sessions = lock(&self.sessions)?;
            let pending = sessions
                .iter_mut()
                .map(|(id, s)| (*id, s.tick(now)))
                .filter(|(_, subs)| !subs.is_empty())
                .collect();
            // Finished, idle and long-expired sessions are dropped after their final tick.
            sessions.retain(|attempt_id, s| {
                if s.phase() == Phase::Finished {
                    return false;
                }
                let idle = now - s.last_active();
                let keep = idle < self.idle_ttl && !(s.overall_expired() && idle >= grace);
                if !keep {
                    tracing::info!(
                        %attempt_id,
                        idle_secs = idle.num_seconds(),
                        "Evicting idle quiz session"
                    );
                }
                keep
            });
            pending
        };
        for (attempt_id, submissions) in pending {
            self.dispatch(attempt_id, submissions);
        }
        Ok(())
    }

    pub fn open_sessions(&self) -> usize {
        lock(&self.sessions).map(|s| s.len()).unwrap_or(0)
    }

    /// Waits for every in-flight submission.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn apply<F>(&self, attempt_id: Uuid, f: F) -> Result<SessionView>
    where
        F: FnOnce(&mut QuizSession, DateTime<Utc>) -> Result<Vec<Submission>>,
    {
        let now = self.clock.now();
        let (outcome, submissions) = {
            let mut sessions = lock(&self.sessions)?;
            let session = sessions.get_mut(&attempt_id).ok_or_else(not_found)?;
            session.touch(now);
            let mut submissions = session.tick(now);
            let outcome = f(session, now).map(|extra| {
                submissions.extend(extra);
                submissions.extend(session.tick(now));
                session.view(now)
            });
            (outcome, submissions)
        };
        self.dispatch(attempt_id, submissions);
        outcome
    }

    fn dispatch(&self, attempt_id: Uuid, submissions: Vec<Submission>) {
        for submission in submissions {
            let api = self.api.clone();
            let sessions = self.sessions.clone();
            self.tracker.spawn(async move {
                let result = match &submission {
                    Submission::Answer(request) => api.submit_answer(request).await,
                    Submission::BulkEmpty(request) => api.submit_bulk_empty(request).await,
                };
                if let Err(e) = result {
                    tracing::error!(%attempt_id, error = %e, "Failed to save answer");
                    if let Ok(mut sessions) = lock(&sessions) {
                        if let Some(session) = sessions.get_mut(&attempt_id) {
                            session.submission_failed();
                        }
                    }
                }
            });
        }
    }
}

fn not_found() -> Error {
    Error::NotFound("Quiz session not found".to_string())
}
