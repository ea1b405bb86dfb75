//! End-to-end session flow scenarios, driven through the orchestrator with
//! fake capture, encoding, and upload collaborators. No microphone, ffmpeg,
//! or network is needed.

use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use viva::backend::error::BackendError;
use viva::backend::EvaluationSink;
use viva::recording::{
    AudioArtifact, AudioCapture, AudioEncoding, RecordingController, SegmentEncoder,
};
use viva::session::{
    InterviewSession, QuestionList, SessionEvent, SessionTimer, COMPLETION_MESSAGE,
};

#[derive(Default)]
struct CaptureLog {
    starts: usize,
    stops: usize,
}

struct FakeCapture {
    log: Arc<Mutex<CaptureLog>>,
    active: bool,
    fail_start: bool,
}

impl AudioCapture for FakeCapture {
    fn start(&mut self) -> anyhow::Result<()> {
        self.log.lock().unwrap().starts += 1;
        if self.fail_start {
            return Err(anyhow!("permission denied"));
        }
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Vec<i16> {
        self.log.lock().unwrap().stops += 1;
        self.active = false;
        vec![0i16; 1600]
    }

    fn samples(&self) -> Vec<i16> {
        vec![0i16; 160]
    }

    fn sample_rate(&self) -> u32 {
        16000
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

struct FakeEncoder;

impl SegmentEncoder for FakeEncoder {
    fn negotiate(&self) -> AudioEncoding {
        AudioEncoding::OggOpus
    }

    fn encode(
        &self,
        samples: &[i16],
        _sample_rate: u32,
        encoding: AudioEncoding,
    ) -> anyhow::Result<AudioArtifact> {
        Ok(AudioArtifact {
            bytes: vec![0u8; samples.len()],
            encoding,
        })
    }
}

struct FakeSink {
    submissions: Mutex<Vec<String>>,
    fail: bool,
    delay: Option<Duration>,
}

impl FakeSink {
    fn new() -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            fail: false,
            delay: None,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl EvaluationSink for FakeSink {
    async fn submit(
        &self,
        _artifact: AudioArtifact,
        question: &str,
    ) -> Result<String, BackendError> {
        self.submissions.lock().unwrap().push(question.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            Err(BackendError::Server {
                status: 500,
                body: "evaluator crashed".to_string(),
            })
        } else {
            Ok(format!("## Feedback\n\n**Good** answer to: {question}"))
        }
    }
}

struct Rig {
    session: InterviewSession,
    events: UnboundedReceiver<SessionEvent>,
    log: Arc<Mutex<CaptureLog>>,
    sink: Arc<FakeSink>,
}

/// Builds a four-question session with a tiny countdown budget and
/// millisecond timer ticks so full-countdown scenarios finish fast.
fn rig(budget_secs: u32, fail_start: bool, sink: FakeSink) -> Rig {
    let log = Arc::new(Mutex::new(CaptureLog::default()));
    let capture = FakeCapture {
        log: Arc::clone(&log),
        active: false,
        fail_start,
    };
    let sink = Arc::new(sink);
    let (tx, rx) = mpsc::unbounded_channel();

    let controller = RecordingController::new(
        Box::new(capture),
        Box::new(FakeEncoder),
        Arc::clone(&sink) as Arc<dyn EvaluationSink>,
        tx.clone(),
    );
    let timer = SessionTimer::with_tick_interval(tx, Duration::from_millis(10));
    let session = InterviewSession::new(QuestionList::default(), budget_secs, timer, controller);

    Rig {
        session,
        events: rx,
        log,
        sink,
    }
}

/// Pumps async events into the session until `done` holds or two seconds
/// pass. Returns whether the condition was reached.
async fn pump_until<F>(rig: &mut Rig, mut done: F) -> bool
where
    F: FnMut(&InterviewSession) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if done(&rig.session) {
            return true;
        }
        let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now()) else {
            return false;
        };
        match tokio::time::timeout(remaining, rig.events.recv()).await {
            Ok(Some(event)) => rig.session.dispatch(event),
            _ => return false,
        }
    }
}

#[tokio::test]
async fn full_countdown_force_stops_and_uploads_once() {
    let mut rig = rig(3, false, FakeSink::new());

    rig.session.request_start();
    assert!(rig.session.state().microphone_active);
    assert_eq!(rig.session.state().seconds_remaining, 3);

    // Let the countdown run out: force-stop, upload, settle.
    let settled = pump_until(&mut rig, |s| !s.state().evaluation_text.is_empty()).await;
    assert!(settled, "countdown should force-stop and settle the upload");

    assert!(!rig.session.state().microphone_active);
    assert!(!rig.session.state().timer_running);
    assert_eq!(rig.session.state().seconds_remaining, 0);
    assert!(!rig.session.state().loading);

    let log = rig.log.lock().unwrap();
    assert_eq!(log.starts, 1, "mic acquired exactly once");
    assert_eq!(log.stops, 1, "mic released exactly once");
    drop(log);
    assert_eq!(rig.sink.submission_count(), 1, "exactly one upload issued");
}

#[tokio::test]
async fn manual_stop_uploads_the_partial_answer() {
    let mut rig = rig(30, false, FakeSink::new());

    rig.session.request_start();

    // Stop a few ticks in; the countdown resets to zero on stop.
    let ticked = pump_until(&mut rig, |s| s.state().seconds_remaining < 30).await;
    assert!(ticked);
    rig.session.request_stop();

    assert_eq!(rig.session.state().seconds_remaining, 0);
    assert!(!rig.session.state().microphone_active);

    let settled = pump_until(&mut rig, |s| !s.state().loading && !s.state().evaluation_text.is_empty()).await;
    assert!(settled);
    assert_eq!(rig.sink.submission_count(), 1);
    assert_eq!(rig.log.lock().unwrap().stops, 1);
}

#[tokio::test]
async fn server_failure_clears_loading_and_keeps_evaluation() {
    let mut rig = rig(30, false, FakeSink::failing());

    rig.session.request_start();
    rig.session.request_stop();

    let settled = pump_until(&mut rig, |s| !s.state().loading).await;
    assert!(settled);

    assert!(rig.session.state().evaluation_text.is_empty());
    assert_eq!(rig.sink.submission_count(), 1, "no retry after failure");
}

#[tokio::test]
async fn last_question_stop_completes_the_session() {
    let mut rig = rig(30, false, FakeSink::new());

    for _ in 0..3 {
        rig.session.request_advance();
    }
    assert_eq!(rig.session.state().question_index, 3);

    rig.session.request_start();
    rig.session.request_stop();
    assert_eq!(rig.session.state().status_message, COMPLETION_MESSAGE);

    rig.session.request_advance();
    assert_eq!(rig.session.state().question_index, 3);
}

#[tokio::test]
async fn device_failure_keeps_session_idle() {
    let mut rig = rig(30, true, FakeSink::new());

    rig.session.request_start();

    assert!(!rig.session.state().microphone_active);
    assert!(!rig.session.state().timer_running);
    assert!(rig
        .session
        .state()
        .status_message
        .contains("microphone unavailable"));
    assert_eq!(rig.sink.submission_count(), 0, "no upload attempted");
    assert_eq!(rig.log.lock().unwrap().stops, 0, "no release attempt");
}

#[tokio::test]
async fn advance_is_blocked_while_recording() {
    let mut rig = rig(30, false, FakeSink::new());

    rig.session.request_start();
    rig.session.request_advance();
    assert_eq!(rig.session.state().question_index, 0);

    rig.session.request_stop();
    let settled = pump_until(&mut rig, |s| !s.state().loading && !s.state().evaluation_text.is_empty()).await;
    assert!(settled);

    rig.session.request_advance();
    assert_eq!(rig.session.state().question_index, 1);
    assert!(rig.session.state().evaluation_text.is_empty());
}

#[tokio::test]
async fn restart_while_uploading_is_rejected() {
    let mut rig = rig(30, false, FakeSink::slow(Duration::from_millis(200)));

    rig.session.request_start();
    rig.session.request_stop();
    assert!(rig.session.state().loading);

    // The upload is still in flight; a second start must be rejected.
    rig.session.request_start();
    assert!(!rig.session.state().microphone_active);
    assert_eq!(rig.log.lock().unwrap().starts, 1);

    let settled = pump_until(&mut rig, |s| !s.state().loading).await;
    assert!(settled);
    assert_eq!(rig.sink.submission_count(), 1);

    // After settlement a new segment opens normally.
    rig.session.request_start();
    assert!(rig.session.state().microphone_active);
}

#[tokio::test]
async fn stale_settlement_after_advance_does_not_overwrite() {
    let mut rig = rig(30, false, FakeSink::slow(Duration::from_millis(100)));

    rig.session.request_start();
    rig.session.request_stop();
    assert!(rig.session.state().loading);

    // Move on before the evaluation for question 0 arrives.
    rig.session.request_advance();
    assert_eq!(rig.session.state().question_index, 1);

    let settled = pump_until(&mut rig, |s| !s.state().loading).await;
    assert!(settled);
    assert!(
        rig.session.state().evaluation_text.is_empty(),
        "late evaluation for a previous question must be discarded"
    );
}
