use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::dto::common::Notice;
use crate::dto::public_dto::{
    BulkEmptyAnswersRequest, FinishRequest, Highlight, OptionView, Phase, QuestionView,
    ResultView, SessionAction, SessionView, SubmitAnswerRequest, TimerView,
};
use crate::error::{Error, Result};
use crate::models::attempt::Attempt;
use crate::models::question::PublicQuestion;
use crate::models::quiz::{QuizSettings, TimerType};
use crate::services::timer_store::{overall_timer_key, question_timer_key, TimerStore};
use crate::utils::time::remaining_secs;

pub const TIME_UP_NOTICE: &str = "You ran out of Time!";
pub const SAVE_FAILED_NOTICE: &str = "Failed to save answer. Please try again.";
pub const FINISH_FAILED_NOTICE: &str = "Failed to submit quiz. Please try again.";

/// Outbound write produced by the state machine, sent without awaiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Answer(SubmitAnswerRequest),
    BulkEmpty(BulkEmptyAnswersRequest),
}

/// Incorrect answers in random order with the correct one inserted at a
/// uniformly random position.
pub fn arrange_options<R: Rng + ?Sized>(correct: &str, incorrect: &[String], rng: &mut R) -> Vec<String> {
    let mut options = incorrect.to_vec();
    options.shuffle(rng);
    let at = rng.gen_range(0..=options.len());
    options.insert(at, correct.to_string());
    options
}

fn option_label(index: usize) -> String {
    match u8::try_from(index).ok().filter(|i| *i < 26) {
        Some(i) => char::from(b'A' + i).to_string(),
        None => (index + 1).to_string(),
    }
}

/// One user's pass through the unanswered questions of an attempt.
pub struct QuizSession {
    attempt_id: Uuid,
    email: String,
    settings: QuizSettings,
    questions: Vec<PublicQuestion>,
    /// Indices into `questions`, unanswered ones only, original order.
    sequence: Vec<usize>,
    cursor: usize,
    score: u32,
    options: Vec<String>,
    /// `Some("")` after a time-out.
    selected: Option<String>,
    submitted: HashSet<Uuid>,
    question_started: Option<DateTime<Utc>>,
    frozen_remaining: Option<i64>,
    overall_started: Option<DateTime<Utc>>,
    overall_expired: bool,
    phase: Phase,
    result: Option<ResultView>,
    notices: Vec<Notice>,
    timers: TimerStore,
    last_active: DateTime<Utc>,
}

impl QuizSession {
    pub fn open<R: Rng + ?Sized>(
        attempt: &Attempt,
        email: &str,
        questions: Vec<PublicQuestion>,
        settings: QuizSettings,
        timers: TimerStore,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let recorded: HashSet<Uuid> = attempt.answers.iter().map(|a| a.question_id).collect();
        let sequence = questions
            .iter()
            .enumerate()
            .filter(|(_, q)| !recorded.contains(&q.id))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let score = attempt.answers.iter().filter(|a| a.is_correct).count() as u32;

        let overall_started = match settings.timer() {
            Some(TimerType::Overall) => {
                Some(timers.start_or_resume(&overall_timer_key(attempt.id), now))
            }
            _ => None,
        };

        let mut session = Self {
            attempt_id: attempt.id,
            email: email.to_string(),
            settings,
            questions,
            sequence,
            cursor: 0,
            score,
            options: Vec::new(),
            selected: None,
            submitted: HashSet::new(),
            question_started: None,
            frozen_remaining: None,
            overall_started,
            overall_expired: false,
            phase: Phase::Answered,
            result: None,
            notices: Vec::new(),
            timers,
            last_active: now,
        };
        if !session.sequence.is_empty() {
            session.enter_question(now, rng);
        }
        tracing::info!(
            attempt_id = %session.attempt_id,
            remaining = session.sequence.len(),
            total = session.questions.len(),
            "Quiz session opened"
        );
        session
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Marks the session as used by its player at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = self.last_active.max(now);
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn overall_expired(&self) -> bool {
        self.overall_expired
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    fn answered_before(&self) -> usize {
        self.questions.len() - self.sequence.len()
    }

    fn current(&self) -> Option<&PublicQuestion> {
        self.sequence
            .get(self.cursor)
            .and_then(|i| self.questions.get(*i))
    }

    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.sequence.len()
    }

    fn enter_question<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) {
        let Some((id, options)) = self
            .current()
            .map(|q| (q.id, arrange_options(&q.correct_answer, &q.incorrect_answers, rng)))
        else {
            return;
        };
        self.options = options;
        self.selected = None;
        self.frozen_remaining = None;
        self.phase = Phase::Presenting;
        self.question_started = match self.settings.timer() {
            Some(TimerType::PerQuestion) => Some(
                self.timers
                    .start_or_resume(&question_timer_key(self.attempt_id, id), now),
            ),
            _ => None,
        };
    }

    /// Applies whichever countdown has run out by `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Submission> {
        if matches!(self.phase, Phase::Finishing | Phase::Finished) {
            return Vec::new();
        }
        match self.settings.timer() {
            Some(TimerType::Overall) => self.check_overall(now).into_iter().collect(),
            Some(TimerType::PerQuestion) => self.check_question(now).into_iter().collect(),
            None => Vec::new(),
        }
    }

    fn check_question(&mut self, now: DateTime<Utc>) -> Option<Submission> {
        if self.phase != Phase::Presenting {
            return None;
        }
        let started = self.question_started?;
        if remaining_secs(started, self.settings.duration_secs(), now) > 0 {
            return None;
        }
        Some(self.time_up())
    }

    /// Per-question expiry: the current question is answered empty.
    fn time_up(&mut self) -> Submission {
        let question_id = self.current().map(|q| q.id).unwrap_or_default();
        self.selected = Some(String::new());
        self.frozen_remaining = Some(0);
        self.phase = Phase::Answered;
        self.submitted.insert(question_id);
        self.timers
            .clear(&question_timer_key(self.attempt_id, question_id));
        self.notices.push(Notice::info(TIME_UP_NOTICE));
        tracing::info!(attempt_id = %self.attempt_id, %question_id, "Question timed out");
        Submission::Answer(SubmitAnswerRequest {
            attempt_id: self.attempt_id,
            question_id,
            selected_answer: String::new(),
        })
    }

    fn check_overall(&mut self, now: DateTime<Utc>) -> Option<Submission> {
        if self.overall_expired {
            return None;
        }
        let started = self.overall_started?;
        if remaining_secs(started, self.settings.duration_secs(), now) > 0 {
            return None;
        }

        self.overall_expired = true;
        let first_open = if self.phase == Phase::Presenting {
            self.cursor
        } else {
            self.cursor + 1
        };
        let question_ids: Vec<Uuid> = self
            .sequence
            .iter()
            .skip(first_open)
            .filter_map(|i| self.questions.get(*i))
            .map(|q| q.id)
            .filter(|id| !self.submitted.contains(id))
            .collect();
        self.submitted.extend(question_ids.iter().copied());

        if !self.sequence.is_empty() {
            let last = self.sequence.len() - 1;
            if self.cursor != last {
                self.cursor = last;
                let options = self.current().map(|q| {
                    arrange_options(&q.correct_answer, &q.incorrect_answers, &mut rand::thread_rng())
                });
                self.options = options.unwrap_or_default();
                self.selected = Some(String::new());
            } else if self.phase == Phase::Presenting {
                self.selected = Some(String::new());
            }
        }
        self.phase = Phase::Answered;
        self.notices.push(Notice::info(TIME_UP_NOTICE));
        tracing::info!(
            attempt_id = %self.attempt_id,
            unanswered = question_ids.len(),
            "Overall quiz timer expired"
        );

        if question_ids.is_empty() {
            return None;
        }
        Some(Submission::BulkEmpty(BulkEmptyAnswersRequest {
            attempt_id: self.attempt_id,
            question_ids,
        }))
    }

    /// Records a manual pick for the current question.
    pub fn select(&mut self, answer: &str, now: DateTime<Utc>) -> Result<Submission> {
        if self.phase != Phase::Presenting {
            return Err(Error::Conflict("Question has already been answered".to_string()));
        }
        let Some(question) = self.current() else {
            return Err(Error::Conflict("No question to answer".to_string()));
        };
        if !self.options.iter().any(|o| o == answer) {
            return Err(Error::BadRequest(
                "Answer is not one of the presented options".to_string(),
            ));
        }
        let question_id = question.id;
        let correct = question.correct_answer == answer;

        if correct {
            self.score += 1;
        }
        self.frozen_remaining = self
            .question_started
            .map(|started| remaining_secs(started, self.settings.duration_secs(), now));
        self.selected = Some(answer.to_string());
        self.phase = Phase::Answered;
        self.submitted.insert(question_id);
        self.timers
            .clear(&question_timer_key(self.attempt_id, question_id));

        Ok(Submission::Answer(SubmitAnswerRequest {
            attempt_id: self.attempt_id,
            question_id,
            selected_answer: answer.to_string(),
        }))
    }

    pub fn next<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Result<()> {
        if self.phase != Phase::Answered {
            return Err(Error::Conflict("Answer the current question first".to_string()));
        }
        if self.is_last() {
            return Err(Error::Conflict("This is the last question, finish the quiz instead".to_string()));
        }
        self.cursor += 1;
        self.enter_question(now, rng);
        Ok(())
    }

    pub fn begin_finish(&mut self) -> Result<FinishRequest> {
        match self.phase {
            Phase::Answered if self.is_last() => {
                self.phase = Phase::Finishing;
                Ok(FinishRequest {
                    attempt_id: self.attempt_id,
                })
            }
            Phase::Finishing => Err(Error::Conflict("Quiz is already being submitted".to_string())),
            Phase::Finished => Err(Error::Conflict("Quiz has already been submitted".to_string())),
            _ => Err(Error::Conflict("Finish is not available yet".to_string())),
        }
    }

    pub fn complete_finish(&mut self, score: u32) -> ResultView {
        let result = ResultView::new(score, self.questions.len() as u32, self.settings.allow_retake);
        self.phase = Phase::Finished;
        self.result = Some(result.clone());
        if self.overall_started.is_some() {
            self.timers.clear(&overall_timer_key(self.attempt_id));
        }
        tracing::info!(attempt_id = %self.attempt_id, score, "Quiz finished");
        result
    }

    pub fn abort_finish(&mut self) {
        if self.phase == Phase::Finishing {
            self.phase = Phase::Answered;
        }
        self.notices.push(Notice::error(FINISH_FAILED_NOTICE));
    }

    pub fn submission_failed(&mut self) {
        self.notices.push(Notice::error(SAVE_FAILED_NOTICE));
    }

    pub fn highlight(&self, option: &str) -> Option<Highlight> {
        let selected = self.selected.as_deref()?;
        let correct = &self.current()?.correct_answer;
        if option == selected {
            if selected == correct {
                Some(Highlight::Correct)
            } else {
                Some(Highlight::Incorrect)
            }
        } else if option == correct && self.settings.highlight_correct_answer {
            Some(Highlight::Correct)
        } else {
            None
        }
    }

    fn timer_view(&self, now: DateTime<Utc>) -> Option<TimerView> {
        let kind = self.settings.timer()?;
        let duration = self.settings.duration_secs();
        let (remaining, running) = match kind {
            TimerType::PerQuestion => match (self.frozen_remaining, self.question_started) {
                (Some(frozen), _) => (frozen, false),
                (None, Some(started)) if self.phase == Phase::Presenting => {
                    (remaining_secs(started, duration, now), true)
                }
                _ => (duration, false),
            },
            TimerType::Overall => {
                let remaining = match (self.overall_expired, self.overall_started) {
                    (true, _) => 0,
                    (false, Some(started)) => remaining_secs(started, duration, now),
                    (false, None) => duration,
                };
                let running = !self.overall_expired
                    && !matches!(self.phase, Phase::Finishing | Phase::Finished);
                (remaining, running)
            }
        };
        Some(TimerView {
            kind,
            duration_seconds: duration,
            remaining_seconds: remaining,
            running,
        })
    }

    /// Snapshot for rendering. Pending notices are handed out once.
    pub fn view(&mut self, now: DateTime<Utc>) -> SessionView {
        let total = self.questions.len();
        let number = (self.answered_before() + self.cursor + 1).min(total);
        let progress = if total == 0 {
            0.0
        } else {
            number as f64 / total as f64 * 100.0
        };

        let question = self.current().map(|q| QuestionView {
            id: q.id,
            heading: format!("{}. {}", number, q.question),
            options: self
                .options
                .iter()
                .enumerate()
                .map(|(i, text)| OptionView {
                    label: option_label(i),
                    text: text.clone(),
                    highlight: self.highlight(text),
                    disabled: self.selected.is_some(),
                })
                .collect(),
        });
        let action = if self.is_last() {
            SessionAction::Finish
        } else {
            SessionAction::Next
        };

        SessionView {
            attempt_id: self.attempt_id,
            email: self.email.clone(),
            phase: self.phase,
            label: format!("Question {} of {}", number, total),
            question_number: number,
            total_questions: total,
            progress,
            score: self.score,
            question,
            timer: self.timer_view(now),
            action,
            action_label: action.label().to_string(),
            action_enabled: self.phase == Phase::Answered,
            notices: std::mem::take(&mut self.notices),
            result: self.result.clone(),
        }
    }
}
