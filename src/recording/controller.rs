//! Recording controller: one capture segment at a time.
//!
//! Owns the microphone lifecycle through three phases, `Idle -> Recording ->
//! Uploading -> Idle`. Entering `Recording` acquires the device; every exit
//! from `Recording` releases it before anything else happens, including
//! force-stops and the defensive path where no live capture backs the
//! segment. Closing a segment assembles the audio artifact and issues exactly
//! one upload; the settlement arrives as a session event from the spawned
//! upload task.

use crate::backend::EvaluationSink;
use crate::recording::audio::AudioCapture;
use crate::recording::encoder::SegmentEncoder;
use crate::session::error::SessionError;
use crate::session::state::SessionEvent;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Where the controller currently is in the segment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderPhase {
    Idle,
    Recording,
    Uploading,
}

/// What closing a segment amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No open segment; nothing was touched
    Ignored,
    /// The segment had no live capture behind it; reset straight to idle
    NoActiveSegment,
    /// Segment closed, device released, exactly one upload issued
    Uploading,
    /// Segment closed and device released, but the artifact could not be
    /// encoded; no upload was issued
    EncodingFailed(String),
}

/// Coordinates capture, encoding, and upload for recording segments.
pub struct RecordingController {
    phase: RecorderPhase,
    capture: Box<dyn AudioCapture>,
    encoder: Box<dyn SegmentEncoder>,
    sink: Arc<dyn EvaluationSink>,
    events: UnboundedSender<SessionEvent>,
    /// Encoding negotiated at start-of-recording, fixed for the segment
    segment_encoding: Option<crate::recording::encoder::AudioEncoding>,
}

impl RecordingController {
    pub fn new(
        capture: Box<dyn AudioCapture>,
        encoder: Box<dyn SegmentEncoder>,
        sink: Arc<dyn EvaluationSink>,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            phase: RecorderPhase::Idle,
            capture,
            encoder,
            sink,
            events,
            segment_encoding: None,
        }
    }

    pub fn phase(&self) -> RecorderPhase {
        self.phase
    }

    /// Snapshot of the open segment's samples, for level metering.
    pub fn level_samples(&self) -> Vec<i16> {
        if self.phase == RecorderPhase::Recording {
            self.capture.samples()
        } else {
            Vec::new()
        }
    }

    /// Opens a new capture segment.
    ///
    /// # Errors
    /// - `SessionError::Busy` while a previous segment is still recording or
    ///   uploading (start requests are rejected, not queued)
    /// - `SessionError::DeviceUnavailable` when the microphone cannot be
    ///   acquired; the controller stays idle and nothing is retried
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.phase {
            RecorderPhase::Uploading | RecorderPhase::Recording => Err(SessionError::Busy),
            RecorderPhase::Idle => {
                self.capture
                    .start()
                    .map_err(|e| SessionError::DeviceUnavailable(e.to_string()))?;
                // Negotiated once here, fixed for this segment.
                self.segment_encoding = Some(self.encoder.negotiate());
                self.phase = RecorderPhase::Recording;
                tracing::info!("Recording segment opened");
                Ok(())
            }
        }
    }

    /// Closes the open segment: releases the device, assembles the artifact,
    /// and issues exactly one upload carrying the artifact and question text.
    ///
    /// A stop with no open segment is a no-op (`Ignored`); in particular a
    /// force-stop arriving while idle does nothing. A segment with no live
    /// capture behind it takes the defensive path straight to idle.
    pub fn finish_segment(&mut self, question: &str, question_index: usize) -> StopOutcome {
        match self.phase {
            RecorderPhase::Idle | RecorderPhase::Uploading => {
                tracing::debug!("Stop request ignored: no open segment");
                StopOutcome::Ignored
            }
            RecorderPhase::Recording => {
                if !self.capture.is_active() {
                    self.phase = RecorderPhase::Idle;
                    tracing::warn!("Segment had no live capture; resetting to idle");
                    return StopOutcome::NoActiveSegment;
                }

                // The device is released first, on every exit from Recording.
                let samples = self.capture.stop();
                let sample_rate = self.capture.sample_rate();
                let encoding = self
                    .segment_encoding
                    .take()
                    .unwrap_or_else(|| self.encoder.negotiate());

                match self.encoder.encode(&samples, sample_rate, encoding) {
                    Ok(artifact) => {
                        self.phase = RecorderPhase::Uploading;
                        let sink = Arc::clone(&self.sink);
                        let events = self.events.clone();
                        let question = question.to_string();
                        tracing::info!(
                            "Uploading segment for question {} ({} bytes, {})",
                            question_index + 1,
                            artifact.bytes.len(),
                            artifact.encoding.extension()
                        );
                        tokio::spawn(async move {
                            let outcome = sink
                                .submit(artifact, &question)
                                .await
                                .map_err(|e| e.to_string());
                            if let Err(e) = &outcome {
                                tracing::error!("Upload failed: {}", e);
                            }
                            let _ = events.send(SessionEvent::UploadSettled {
                                question_index,
                                outcome,
                            });
                        });
                        StopOutcome::Uploading
                    }
                    Err(e) => {
                        self.phase = RecorderPhase::Idle;
                        tracing::error!("Failed to encode segment: {}", e);
                        StopOutcome::EncodingFailed(e.to_string())
                    }
                }
            }
        }
    }

    /// Marks the in-flight upload as settled. Called when the settlement
    /// event is observed; the transition out of `Uploading` is unconditional.
    pub fn settle_upload(&mut self) {
        if self.phase == RecorderPhase::Uploading {
            self.phase = RecorderPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::error::BackendError;
    use crate::recording::encoder::{AudioArtifact, AudioEncoding};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CaptureLog {
        starts: usize,
        stops: usize,
    }

    struct FakeCapture {
        log: Arc<Mutex<CaptureLog>>,
        active: bool,
        fail_start: bool,
        /// When set, pretend the stream died under us mid-segment
        lose_stream: bool,
    }

    impl FakeCapture {
        fn new(log: Arc<Mutex<CaptureLog>>) -> Self {
            Self {
                log,
                active: false,
                fail_start: false,
                lose_stream: false,
            }
        }
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
            vec![0i16; 800]
        }

        fn samples(&self) -> Vec<i16> {
            vec![0i16; 100]
        }

        fn sample_rate(&self) -> u32 {
            16000
        }

        fn is_active(&self) -> bool {
            self.active && !self.lose_stream
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
    }

    impl FakeSink {
        fn new(fail: bool) -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
                fail,
            }
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
            if self.fail {
                Err(BackendError::Server {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok("## Feedback\nGood answer.".to_string())
            }
        }
    }

    struct Rig {
        controller: RecordingController,
        log: Arc<Mutex<CaptureLog>>,
        sink: Arc<FakeSink>,
        rx: mpsc::UnboundedReceiver<SessionEvent>,
    }

    fn rig_with(fail_start: bool, sink_fails: bool) -> Rig {
        let log = Arc::new(Mutex::new(CaptureLog::default()));
        let mut capture = FakeCapture::new(Arc::clone(&log));
        capture.fail_start = fail_start;
        let sink = Arc::new(FakeSink::new(sink_fails));
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = RecordingController::new(
            Box::new(capture),
            Box::new(FakeEncoder),
            Arc::clone(&sink) as Arc<dyn EvaluationSink>,
            tx,
        );
        Rig {
            controller,
            log,
            sink,
            rx,
        }
    }

    #[tokio::test]
    async fn start_stop_acquires_once_releases_once_uploads_once() {
        let mut rig = rig_with(false, false);

        rig.controller.start().expect("start");
        assert_eq!(rig.controller.phase(), RecorderPhase::Recording);

        let outcome = rig.controller.finish_segment("Question one", 0);
        assert_eq!(outcome, StopOutcome::Uploading);
        assert_eq!(rig.controller.phase(), RecorderPhase::Uploading);

        let log = rig.log.lock().unwrap();
        assert_eq!(log.starts, 1);
        assert_eq!(log.stops, 1);
        drop(log);

        let event = rig.rx.recv().await.expect("settlement");
        match event {
            SessionEvent::UploadSettled {
                question_index,
                outcome,
            } => {
                assert_eq!(question_index, 0);
                assert!(outcome.is_ok());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(rig.sink.submissions.lock().unwrap().len(), 1);

        rig.controller.settle_upload();
        assert_eq!(rig.controller.phase(), RecorderPhase::Idle);
    }

    #[tokio::test]
    async fn device_failure_leaves_controller_idle_with_no_upload() {
        let mut rig = rig_with(true, false);

        let err = rig.controller.start().expect_err("must fail");
        assert!(matches!(err, SessionError::DeviceUnavailable(_)));
        assert_eq!(rig.controller.phase(), RecorderPhase::Idle);

        // No release attempt, no artifact, no upload.
        assert_eq!(rig.log.lock().unwrap().stops, 0);
        assert!(rig.sink.submissions.lock().unwrap().is_empty());
        assert!(rig.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_no_op() {
        let mut rig = rig_with(false, false);

        assert_eq!(rig.controller.finish_segment("q", 0), StopOutcome::Ignored);
        assert_eq!(rig.controller.phase(), RecorderPhase::Idle);
        assert_eq!(rig.log.lock().unwrap().stops, 0);
    }

    #[tokio::test]
    async fn double_stop_releases_only_once() {
        let mut rig = rig_with(false, false);

        rig.controller.start().expect("start");
        assert_eq!(
            rig.controller.finish_segment("q", 0),
            StopOutcome::Uploading
        );
        assert_eq!(rig.controller.finish_segment("q", 0), StopOutcome::Ignored);
        assert_eq!(rig.log.lock().unwrap().stops, 1);
    }

    #[tokio::test]
    async fn start_while_uploading_is_rejected_not_queued() {
        let mut rig = rig_with(false, false);

        rig.controller.start().expect("start");
        rig.controller.finish_segment("q", 0);
        assert_eq!(rig.controller.phase(), RecorderPhase::Uploading);

        let err = rig.controller.start().expect_err("must reject");
        assert!(matches!(err, SessionError::Busy));

        // Settlement frees the controller for the next segment.
        let _ = rig.rx.recv().await;
        rig.controller.settle_upload();
        rig.controller.start().expect("start after settle");
    }

    #[tokio::test]
    async fn dead_capture_takes_defensive_path_straight_to_idle() {
        let log = Arc::new(Mutex::new(CaptureLog::default()));
        let mut capture = FakeCapture::new(Arc::clone(&log));
        capture.lose_stream = true;
        let sink = Arc::new(FakeSink::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = RecordingController::new(
            Box::new(capture),
            Box::new(FakeEncoder),
            sink as Arc<dyn EvaluationSink>,
            tx,
        );

        controller.start().expect("start");
        assert_eq!(
            controller.finish_segment("q", 0),
            StopOutcome::NoActiveSegment
        );
        assert_eq!(controller.phase(), RecorderPhase::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_upload_settles_with_error_outcome() {
        let mut rig = rig_with(false, true);

        rig.controller.start().expect("start");
        rig.controller.finish_segment("q", 2);

        let event = rig.rx.recv().await.expect("settlement");
        match event {
            SessionEvent::UploadSettled {
                question_index,
                outcome,
            } => {
                assert_eq!(question_index, 2);
                assert!(outcome.is_err());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        // Single attempt only.
        assert_eq!(rig.sink.submissions.lock().unwrap().len(), 1);
    }
}
