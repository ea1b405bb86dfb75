//! Interview session: questions, countdown, recording, evaluation.
//!
//! The orchestrator owns the session state machine and mediates between the
//! countdown timer and the recording controller. UI intents and async events
//! (timer ticks, upload settlements) all funnel through it; collaborators
//! never mutate session state directly.

pub mod error;
pub mod questions;
pub mod state;
pub mod timer;
pub mod ui;

pub use error::SessionError;
pub use questions::{default_questions, QuestionList};
pub use state::{Effect, SessionEvent, SessionMachine, SessionState, COMPLETION_MESSAGE};
pub use timer::SessionTimer;

use crate::recording::{RecordingController, StopOutcome};

/// A question/feedback pair kept for the session summary.
#[derive(Debug, Clone)]
pub struct CompletedAnswer {
    pub question: String,
    pub feedback: String,
}

/// Sequences questions and wires the timer and recording controller together.
pub struct InterviewSession {
    machine: SessionMachine,
    questions: QuestionList,
    timer: SessionTimer,
    controller: RecordingController,
    /// Evaluations received this session, in order, for the history record
    completed: Vec<CompletedAnswer>,
}

impl InterviewSession {
    pub fn new(
        questions: QuestionList,
        question_time_secs: u32,
        timer: SessionTimer,
        controller: RecordingController,
    ) -> Self {
        Self {
            machine: SessionMachine::new(questions.len(), question_time_secs),
            questions,
            timer,
            controller,
            completed: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    pub fn current_question(&self) -> &str {
        self.questions.question(self.machine.state().question_index)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Samples of the open segment, for the level meter.
    pub fn level_samples(&self) -> Vec<i16> {
        self.controller.level_samples()
    }

    pub fn completed_answers(&self) -> &[CompletedAnswer] {
        &self.completed
    }

    /// Starts recording the current answer. Rejections (device unavailable,
    /// upload still in flight) surface as a status message; the session stays
    /// idle and usable.
    pub fn request_start(&mut self) {
        if self.machine.state().microphone_active {
            return;
        }
        match self.controller.start() {
            Ok(()) => self.apply_and_run(SessionEvent::RecordingStarted),
            Err(e) => {
                tracing::warn!("Recording start rejected: {e}");
                self.apply_and_run(SessionEvent::StartFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    /// Stops the current recording, uploading the captured answer.
    pub fn request_stop(&mut self) {
        self.stop_segment();
    }

    /// Moves to the next question; blocked while the microphone is active.
    pub fn request_advance(&mut self) {
        self.apply_and_run(SessionEvent::AdvanceRequested);
    }

    /// Feeds an async event (timer tick, upload settlement) into the machine.
    pub fn dispatch(&mut self, event: SessionEvent) {
        if let SessionEvent::UploadSettled {
            question_index,
            outcome,
        } = &event
        {
            self.controller.settle_upload();
            if let Ok(text) = outcome {
                if *question_index == self.machine.state().question_index {
                    self.completed.push(CompletedAnswer {
                        question: self.questions.question(*question_index).to_string(),
                        feedback: text.clone(),
                    });
                } else {
                    tracing::info!(
                        "Discarding late evaluation for question {}",
                        question_index + 1
                    );
                }
            }
        }
        self.apply_and_run(event);
    }

    fn stop_segment(&mut self) {
        let question_index = self.machine.state().question_index;
        let question = self.questions.question(question_index).to_string();
        match self.controller.finish_segment(&question, question_index) {
            StopOutcome::Ignored => {}
            StopOutcome::NoActiveSegment => {
                self.apply_and_run(SessionEvent::RecordingStopped);
            }
            StopOutcome::Uploading => {
                self.apply_and_run(SessionEvent::RecordingStopped);
                self.apply_and_run(SessionEvent::UploadStarted { question_index });
            }
            StopOutcome::EncodingFailed(message) => {
                self.apply_and_run(SessionEvent::RecordingStopped);
                tracing::error!("Answer could not be encoded: {message}");
            }
        }
    }

    fn apply_and_run(&mut self, event: SessionEvent) {
        let effects = self.machine.apply(event);
        for effect in effects {
            match effect {
                Effect::ArmTimer => self.timer.arm(),
                Effect::DisarmTimer => self.timer.disarm(),
                Effect::ForceStopRecording => self.stop_segment(),
            }
        }
    }
}
