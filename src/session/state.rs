//! Interview session state and transitions.
//!
//! The session is modeled as an explicit state value plus a pure transition
//! function over a named event union. Collaborators (timer, recording
//! controller, upload tasks) emit events; they never mutate session state
//! directly. Transitions return effects for the caller to execute, which keeps
//! the whole machine testable without devices, timers, or network.

/// Status message shown when the final question has been answered.
pub const COMPLETION_MESSAGE: &str =
    "Thank you for completing all the questions! Interview is now complete.";

/// Observable state of an interview session.
///
/// Invariant: `timer_running` implies `microphone_active`, and
/// `seconds_remaining` only decrements while both hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Index of the current question, always within the question list
    pub question_index: usize,
    /// Whether a capture segment is open (mic held)
    pub microphone_active: bool,
    /// Seconds left on the per-question countdown
    pub seconds_remaining: u32,
    /// Whether the countdown is armed
    pub timer_running: bool,
    /// Markdown feedback for the current question, empty until an upload settles
    pub evaluation_text: String,
    /// Whether an upload is in flight
    pub loading: bool,
    /// Free-form status line shown to the user
    pub status_message: String,
}

/// Events that drive session transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The microphone was acquired and a capture segment opened
    RecordingStarted,
    /// A start request was rejected (device unavailable, upload in flight)
    StartFailed { message: String },
    /// The capture segment closed (manual stop, force-stop, or defensive path)
    RecordingStopped,
    /// One second elapsed on the countdown
    TimerTick,
    /// An upload was issued for the given question
    UploadStarted { question_index: usize },
    /// The upload for the given question settled; `Ok` carries evaluation text
    UploadSettled {
        question_index: usize,
        outcome: Result<String, String>,
    },
    /// The user asked to move to the next question
    AdvanceRequested,
}

/// Side effects a transition asks its caller to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Start (or restart) the countdown task
    ArmTimer,
    /// Cancel the countdown task so no further tick fires
    DisarmTimer,
    /// Tell the recording controller to force-stop the open segment
    ForceStopRecording,
}

/// The session state machine: state plus the per-session constants that
/// transitions depend on (question count and countdown budget).
#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    question_count: usize,
    question_time_secs: u32,
}

impl SessionMachine {
    /// Creates a machine at question 0 with an idle timer and empty evaluation.
    pub fn new(question_count: usize, question_time_secs: u32) -> Self {
        Self {
            state: SessionState {
                question_index: 0,
                microphone_active: false,
                seconds_remaining: question_time_secs,
                timer_running: false,
                evaluation_text: String::new(),
                loading: false,
                status_message: format!(
                    "Answer each question within {question_time_secs}s. Recording auto-stops at 0."
                ),
            },
            question_count,
            question_time_secs,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn on_last_question(&self) -> bool {
        self.state.question_index + 1 >= self.question_count
    }

    /// Applies one event and returns the effects the caller must execute.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::RecordingStarted => {
                self.state.microphone_active = true;
                self.state.timer_running = true;
                self.state.seconds_remaining = self.question_time_secs;
                vec![Effect::ArmTimer]
            }
            SessionEvent::StartFailed { message } => {
                // Stays idle: no capture, no artifact, no upload.
                self.state.status_message = message;
                vec![]
            }
            SessionEvent::RecordingStopped => {
                self.state.microphone_active = false;
                self.state.timer_running = false;
                self.state.seconds_remaining = 0;
                if self.on_last_question() {
                    self.state.status_message = COMPLETION_MESSAGE.to_string();
                }
                vec![Effect::DisarmTimer]
            }
            SessionEvent::TimerTick => {
                // A tick while disarmed is a no-op; the timer task is already
                // being cancelled, this guard just ignores any tick in flight.
                if !(self.state.timer_running && self.state.microphone_active) {
                    return vec![];
                }
                self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
                if self.state.seconds_remaining == 0 {
                    self.state.timer_running = false;
                    return vec![Effect::ForceStopRecording, Effect::DisarmTimer];
                }
                vec![]
            }
            SessionEvent::UploadStarted { .. } => {
                self.state.loading = true;
                vec![]
            }
            SessionEvent::UploadSettled {
                question_index,
                outcome,
            } => {
                // Loading clears unconditionally on settlement.
                self.state.loading = false;
                match outcome {
                    Ok(text) if question_index == self.state.question_index => {
                        self.state.evaluation_text = text;
                    }
                    Ok(_) => {
                        // Late response for a question the user already left:
                        // discard rather than overwrite the current view.
                    }
                    Err(_) => {
                        // Prior evaluation stays intact; the caller logs.
                    }
                }
                vec![]
            }
            SessionEvent::AdvanceRequested => {
                // Navigation is blocked while a recording is in progress.
                if self.state.microphone_active {
                    return vec![];
                }
                self.state.evaluation_text.clear();
                self.state.seconds_remaining = self.question_time_secs;
                self.state.question_index =
                    (self.state.question_index + 1).min(self.question_count.saturating_sub(1));
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> SessionMachine {
        SessionMachine::new(4, 30)
    }

    fn settled(question_index: usize, outcome: Result<&str, &str>) -> SessionEvent {
        SessionEvent::UploadSettled {
            question_index,
            outcome: outcome.map(String::from).map_err(String::from),
        }
    }

    #[test]
    fn starts_at_question_zero_with_idle_timer() {
        let m = machine();
        assert_eq!(m.state().question_index, 0);
        assert!(!m.state().microphone_active);
        assert!(!m.state().timer_running);
        assert_eq!(m.state().seconds_remaining, 30);
        assert!(m.state().evaluation_text.is_empty());
        assert!(!m.state().loading);
    }

    #[test]
    fn recording_start_arms_timer_and_resets_budget() {
        let mut m = machine();
        m.apply(SessionEvent::TimerTick); // disarmed: must not decrement
        assert_eq!(m.state().seconds_remaining, 30);

        let effects = m.apply(SessionEvent::RecordingStarted);
        assert_eq!(effects, vec![Effect::ArmTimer]);
        assert!(m.state().microphone_active);
        assert!(m.state().timer_running);
        assert_eq!(m.state().seconds_remaining, 30);
    }

    #[test]
    fn ticks_decrement_only_while_armed() {
        let mut m = machine();
        m.apply(SessionEvent::RecordingStarted);
        m.apply(SessionEvent::TimerTick);
        assert_eq!(m.state().seconds_remaining, 29);

        m.apply(SessionEvent::RecordingStopped);
        m.apply(SessionEvent::TimerTick); // stray tick after disarm
        assert_eq!(m.state().seconds_remaining, 0);
        assert!(!m.state().timer_running);
    }

    #[test]
    fn countdown_expiry_emits_exactly_one_force_stop() {
        let mut m = machine();
        m.apply(SessionEvent::RecordingStarted);

        for _ in 0..29 {
            assert_eq!(m.apply(SessionEvent::TimerTick), vec![]);
        }
        assert_eq!(m.state().seconds_remaining, 1);

        let effects = m.apply(SessionEvent::TimerTick);
        assert_eq!(
            effects,
            vec![Effect::ForceStopRecording, Effect::DisarmTimer]
        );
        assert_eq!(m.state().seconds_remaining, 0);
        assert!(!m.state().timer_running);

        // Any further tick is a disarmed no-op, never a second force-stop.
        assert_eq!(m.apply(SessionEvent::TimerTick), vec![]);
    }

    #[test]
    fn stop_resets_countdown_and_releases_timer() {
        let mut m = machine();
        m.apply(SessionEvent::RecordingStarted);
        for _ in 0..5 {
            m.apply(SessionEvent::TimerTick);
        }
        assert_eq!(m.state().seconds_remaining, 25);

        let effects = m.apply(SessionEvent::RecordingStopped);
        assert_eq!(effects, vec![Effect::DisarmTimer]);
        assert!(!m.state().microphone_active);
        assert_eq!(m.state().seconds_remaining, 0);
    }

    #[test]
    fn advance_is_blocked_while_recording() {
        let mut m = machine();
        m.apply(SessionEvent::RecordingStarted);
        m.apply(SessionEvent::AdvanceRequested);
        assert_eq!(m.state().question_index, 0);
    }

    #[test]
    fn advance_clears_evaluation_and_clamps_at_last_question() {
        let mut m = machine();
        m.apply(SessionEvent::UploadStarted { question_index: 0 });
        m.apply(settled(0, Ok("**Good answer**")));
        assert_eq!(m.state().evaluation_text, "**Good answer**");

        m.apply(SessionEvent::AdvanceRequested);
        assert_eq!(m.state().question_index, 1);
        assert!(m.state().evaluation_text.is_empty());
        assert_eq!(m.state().seconds_remaining, 30);

        for _ in 0..10 {
            m.apply(SessionEvent::AdvanceRequested);
        }
        assert_eq!(m.state().question_index, 3);
    }

    #[test]
    fn upload_failure_clears_loading_and_keeps_prior_evaluation() {
        let mut m = machine();
        m.apply(SessionEvent::UploadStarted { question_index: 0 });
        m.apply(settled(0, Ok("first feedback")));

        m.apply(SessionEvent::UploadStarted { question_index: 0 });
        assert!(m.state().loading);
        m.apply(settled(0, Err("backend returned status 500")));
        assert!(!m.state().loading);
        assert_eq!(m.state().evaluation_text, "first feedback");
    }

    #[test]
    fn stale_upload_response_is_discarded_after_advance() {
        let mut m = machine();
        m.apply(SessionEvent::UploadStarted { question_index: 0 });
        m.apply(SessionEvent::AdvanceRequested); // user moved on to question 1

        m.apply(settled(0, Ok("late feedback for question 0")));
        assert!(!m.state().loading);
        assert!(m.state().evaluation_text.is_empty());
    }

    #[test]
    fn stop_on_last_question_sets_completion_message() {
        let mut m = machine();
        for _ in 0..3 {
            m.apply(SessionEvent::AdvanceRequested);
        }
        assert!(m.on_last_question());

        m.apply(SessionEvent::RecordingStarted);
        m.apply(SessionEvent::RecordingStopped);
        assert_eq!(m.state().status_message, COMPLETION_MESSAGE);

        m.apply(SessionEvent::AdvanceRequested);
        assert_eq!(m.state().question_index, 3);
    }

    #[test]
    fn start_failure_leaves_session_idle() {
        let mut m = machine();
        let effects = m.apply(SessionEvent::StartFailed {
            message: "microphone unavailable: permission denied".to_string(),
        });
        assert!(effects.is_empty());
        assert!(!m.state().microphone_active);
        assert!(!m.state().timer_running);
        assert!(!m.state().loading);
        assert!(m
            .state()
            .status_message
            .contains("microphone unavailable"));
    }
}
