use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::attempt::autosave::AutosaveQueue;
use crate::core::time::Clock;
use crate::http::{ApiClient, ApiError};
use crate::schemas::{AttemptStatus, Question, Quiz};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Submitting,
    Submitted,
}

/// Events the controller pushes while an attempt session runs. `Tick` is
/// emitted once per second with the remaining wall-clock seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Tick { remaining_seconds: u64 },
    AnswerSynced { question_id: String },
    AutosaveFailed { question_id: String, detail: String },
    SubmitFailed { detail: String },
    Submitted { attempt_id: String },
}

/// Mutable session state behind the controller's lock. Kept free of I/O so
/// the transition rules are testable on their own.
#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    answers: HashMap<String, String>,
    queue: AutosaveQueue,
    cursor: usize,
    deadline_fired: bool,
}

impl SessionState {
    fn jump(&mut self, index: usize, question_count: usize) {
        self.cursor = index.min(question_count.saturating_sub(1));
    }

    fn next(&mut self, question_count: usize) {
        self.jump(self.cursor + 1, question_count);
    }

    fn prev(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Single-flight gate: only an active session may enter `Submitting`.
    fn begin_submit(&mut self) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        self.phase = SessionPhase::Submitting;
        true
    }

    fn fail_submit(&mut self) {
        if self.phase == SessionPhase::Submitting {
            self.phase = SessionPhase::Active;
        }
    }

    fn complete_submit(&mut self) {
        self.phase = SessionPhase::Submitted;
    }
}

/// Drives one timed quiz attempt: debounced answer autosave, the 1 Hz
/// countdown derived from the attempt's server-issued deadline, and a
/// single-flight submit that also fires automatically when the deadline
/// passes. Drop-in resumable: acquiring the controller for a quiz picks up
/// the in-progress attempt and its saved answers if one exists.
pub struct AttemptController {
    api: ApiClient,
    clock: Arc<dyn Clock>,
    quiz: Arc<Quiz>,
    attempt_id: String,
    deadline: OffsetDateTime,
    state: Mutex<SessionState>,
    events: UnboundedSender<SessionEvent>,
    shutdown: watch::Sender<bool>,
}

impl AttemptController {
    /// Resume the caller's in-progress attempt for `quiz_id`, or start a
    /// fresh one if none exists. Spawns the tick driver and returns the
    /// controller with its event stream.
    pub async fn acquire(
        api: ApiClient,
        clock: Arc<dyn Clock>,
        autosave_quiet: StdDuration,
        quiz_id: &str,
    ) -> Result<(Arc<Self>, UnboundedReceiver<SessionEvent>), ApiError> {
        let quiz = api.quiz(quiz_id).await?;

        let attempt = match api.attempt_for_quiz(quiz_id).await {
            Ok(attempt) => attempt,
            Err(err) if err.is_not_found() => api.start_attempt(quiz_id).await?,
            Err(err) => return Err(err),
        };

        tracing::info!(
            attempt_id = %attempt.id,
            quiz_id = %attempt.quiz_id,
            resumed_answers = attempt.answers.len(),
            "Attempt session acquired"
        );

        let deadline = attempt
            .end_time
            .unwrap_or(attempt.start_time + time::Duration::minutes(i64::from(quiz.time_limit)));

        let mut queue = AutosaveQueue::new(autosave_quiet);
        let mut answers = HashMap::new();
        for answer in &attempt.answers {
            queue.seed_synced(&answer.question_id, &answer.selected_answer);
            answers.insert(answer.question_id.clone(), answer.selected_answer.clone());
        }

        let phase = match attempt.status {
            AttemptStatus::InProgress => SessionPhase::Active,
            AttemptStatus::Submitted => SessionPhase::Submitted,
        };

        let (events, events_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let controller = Arc::new(Self {
            api,
            clock,
            quiz: Arc::new(quiz),
            attempt_id: attempt.id.clone(),
            deadline,
            state: Mutex::new(SessionState {
                phase,
                answers,
                queue,
                cursor: 0,
                deadline_fired: false,
            }),
            events,
            shutdown,
        });

        tokio::spawn(Arc::clone(&controller).run(shutdown_rx));

        Ok((controller, events_rx))
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase
    }

    pub fn remaining_seconds(&self) -> u64 {
        remaining_seconds(self.deadline, self.clock.now())
    }

    pub fn answer(&self, question_id: &str) -> Option<String> {
        self.lock_state().answers.get(question_id).cloned()
    }

    /// Record an answer locally and arm its autosave quiet period. Ignored
    /// once the session has left the active phase.
    pub fn set_answer(&self, question_id: &str, value: &str) {
        let mut state = self.lock_state();
        if state.phase != SessionPhase::Active {
            return;
        }
        state.answers.insert(question_id.to_string(), value.to_string());
        state.queue.record(question_id, value, self.clock.now());
    }

    // Navigation

    pub fn cursor(&self) -> usize {
        self.lock_state().cursor
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.lock_state().cursor)
    }

    pub fn next_question(&self) {
        self.lock_state().next(self.quiz.questions.len());
    }

    pub fn prev_question(&self) {
        self.lock_state().prev();
    }

    pub fn jump_to(&self, index: usize) {
        self.lock_state().jump(index, self.quiz.questions.len());
    }

    /// Submit the attempt. Returns `Ok(false)` without issuing a request
    /// when a submit is already in flight or the session is terminal.
    /// Pending answers are flushed best-effort first so late edits land.
    pub async fn submit(&self) -> Result<bool, ApiError> {
        let writes = {
            let mut state = self.lock_state();
            if !state.begin_submit() {
                return Ok(false);
            }
            state.queue.drain_all()
        };

        for (question_id, value) in writes {
            match self.api.save_answer(&self.attempt_id, &question_id, &value).await {
                Ok(()) => {
                    self.lock_state().queue.mark_synced(&question_id, &value);
                }
                Err(err) => {
                    tracing::warn!(
                        question_id = %question_id,
                        error = %err,
                        "Pre-submit answer flush failed"
                    );
                }
            }
        }

        match self.api.submit_attempt(&self.attempt_id).await {
            Ok(()) => {
                self.lock_state().complete_submit();
                tracing::info!(attempt_id = %self.attempt_id, "Attempt submitted");
                self.emit(SessionEvent::Submitted { attempt_id: self.attempt_id.clone() });
                let _ = self.shutdown.send(true);
                Ok(true)
            }
            Err(err) => {
                self.lock_state().fail_submit();
                self.emit(SessionEvent::SubmitFailed { detail: err.to_string() });
                Err(err)
            }
        }
    }

    /// Stop the tick driver. The attempt stays in progress on the backend.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(StdDuration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.on_tick().await {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(attempt_id = %self.attempt_id, "Attempt session driver stopped");
    }

    /// One second of session work: flush due autosaves, publish the
    /// countdown, and force-submit once when the deadline passes. Returns
    /// true when the session is terminal.
    async fn on_tick(self: &Arc<Self>) -> bool {
        let now = self.clock.now();

        let writes = {
            let mut state = self.lock_state();
            if state.phase == SessionPhase::Submitted {
                return true;
            }
            state.queue.due(now)
        };

        for (question_id, value) in writes {
            match self.api.save_answer(&self.attempt_id, &question_id, &value).await {
                Ok(()) => {
                    self.lock_state().queue.mark_synced(&question_id, &value);
                    self.emit(SessionEvent::AnswerSynced { question_id });
                }
                Err(err) => {
                    tracing::warn!(question_id = %question_id, error = %err, "Autosave failed");
                    self.lock_state().queue.mark_failed(&question_id, &value, self.clock.now());
                    self.emit(SessionEvent::AutosaveFailed {
                        question_id,
                        detail: err.to_string(),
                    });
                }
            }
        }

        let remaining = remaining_seconds(self.deadline, now);
        self.emit(SessionEvent::Tick { remaining_seconds: remaining });

        if remaining == 0 {
            let fire = {
                let mut state = self.lock_state();
                let fire = !state.deadline_fired && state.phase == SessionPhase::Active;
                if fire {
                    state.deadline_fired = true;
                }
                fire
            };

            if fire {
                tracing::info!(attempt_id = %self.attempt_id, "Deadline reached, submitting");
                if let Err(err) = self.submit().await {
                    tracing::warn!(attempt_id = %self.attempt_id, error = %err, "Forced submit failed");
                }
            }
        }

        self.lock_state().phase == SessionPhase::Submitted
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Remaining whole seconds until `deadline`, floored at zero. Recomputed
/// from the wall clock every tick so a suspended or slow process cannot
/// stretch the countdown.
fn remaining_seconds(deadline: OffsetDateTime, now: OffsetDateTime) -> u64 {
    let remaining = (deadline - now).whole_seconds();
    if remaining <= 0 {
        0
    } else {
        remaining as u64
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn active_state() -> SessionState {
        SessionState {
            phase: SessionPhase::Active,
            answers: HashMap::new(),
            queue: AutosaveQueue::new(StdDuration::from_secs(2)),
            cursor: 0,
            deadline_fired: false,
        }
    }

    #[test]
    fn cursor_clamps_to_question_range() {
        let mut state = active_state();

        state.prev();
        assert_eq!(state.cursor, 0);

        state.jump(99, 4);
        assert_eq!(state.cursor, 3);

        state.next(4);
        assert_eq!(state.cursor, 3);

        state.jump(1, 4);
        state.prev();
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn cursor_survives_empty_question_list() {
        let mut state = active_state();
        state.jump(5, 0);
        assert_eq!(state.cursor, 0);
        state.next(0);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn submit_gate_is_single_flight() {
        let mut state = active_state();

        assert!(state.begin_submit());
        assert_eq!(state.phase, SessionPhase::Submitting);
        assert!(!state.begin_submit());

        state.fail_submit();
        assert_eq!(state.phase, SessionPhase::Active);
        assert!(state.begin_submit());

        state.complete_submit();
        assert_eq!(state.phase, SessionPhase::Submitted);
        assert!(!state.begin_submit());
        state.fail_submit();
        assert_eq!(state.phase, SessionPhase::Submitted);
    }

    #[test]
    fn remaining_seconds_floors_at_zero() {
        let deadline = datetime!(2025-06-01 12:30:00 UTC);
        assert_eq!(remaining_seconds(deadline, datetime!(2025-06-01 12:00:00 UTC)), 1800);
        assert_eq!(remaining_seconds(deadline, datetime!(2025-06-01 12:29:59 UTC)), 1);
        assert_eq!(remaining_seconds(deadline, deadline), 0);
        assert_eq!(remaining_seconds(deadline, datetime!(2025-06-01 13:00:00 UTC)), 0);
    }

    #[test]
    fn countdown_is_monotonic_under_advancing_clock() {
        let deadline = datetime!(2025-06-01 12:05:00 UTC);
        let mut now = datetime!(2025-06-01 12:00:00 UTC);
        let mut previous = remaining_seconds(deadline, now);
        for _ in 0..400 {
            now += time::Duration::seconds(1);
            let current = remaining_seconds(deadline, now);
            assert!(current <= previous);
            previous = current;
        }
        assert_eq!(previous, 0);
    }
}
