//! The interview practice session.
//!
//! Wires configuration, microphone capture, artifact encoding, the backend
//! client, the countdown timer, and the session screen into one event loop,
//! then records the finished session to history.

use crate::backend::{BackendClient, EvaluationSink};
use crate::config::VivaConfig;
use crate::history::{HistoryStore, NewInterviewRecord};
use crate::recording::{ArtifactEncoder, CpalCapture, RecordingController};
use crate::session::ui::{SessionInput, SessionScreen};
use crate::session::{InterviewSession, QuestionList, SessionTimer};
use crate::ui::ErrorScreen;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Runs an interview practice session.
///
/// # Errors
/// - If configuration cannot be loaded
/// - If ffmpeg or the backend client cannot be set up
/// - If the terminal UI fails
pub async fn handle_practice() -> Result<(), anyhow::Error> {
    tracing::info!("=== viva interview session started ===");

    let config = match VivaConfig::load_or_init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            show_error(&format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/viva/viva.toml file and try again."
            ))?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, backend={}, question_time={}s",
        config.audio.device,
        config.audio.sample_rate,
        config.backend.base_url,
        config.session.question_time_secs
    );

    let encoder = match ArtifactEncoder::new() {
        Ok(encoder) => encoder,
        Err(err) => {
            tracing::error!("Encoder setup failed: {err}");
            show_error(&format!("Audio Encoding Error:\n\n{err}"))?;
            return Err(err);
        }
    };

    let client = match BackendClient::new(&config.backend) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!("Backend client setup failed: {err}");
            show_error(&format!("Backend Error:\n\n{err}"))?;
            return Err(err);
        }
    };

    let questions = QuestionList::new(config.session.questions.clone());
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let capture = CpalCapture::new(config.audio.sample_rate, config.audio.device.clone());
    let controller = RecordingController::new(
        Box::new(capture),
        Box::new(encoder),
        Arc::new(client) as Arc<dyn EvaluationSink>,
        events_tx.clone(),
    );
    let timer = SessionTimer::new(events_tx);

    let mut session = InterviewSession::new(
        questions,
        config.session.question_time_secs,
        timer,
        controller,
    );

    let mut screen =
        SessionScreen::new().map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;
    let started_at = Instant::now();

    loop {
        // Async events first: timer ticks and upload settlements.
        while let Ok(event) = events_rx.try_recv() {
            session.dispatch(event);
        }

        let samples = session.level_samples();
        screen
            .render(
                session.state(),
                session.current_question(),
                session.question_count(),
                &samples,
            )
            .map_err(|e| anyhow::anyhow!("Render failed: {e}"))?;

        match screen.poll_input()? {
            SessionInput::Continue => {}
            SessionInput::ToggleRecording => {
                if session.state().microphone_active {
                    session.request_stop();
                } else {
                    session.request_start();
                }
            }
            SessionInput::NextQuestion => session.request_advance(),
            SessionInput::EndSession => session.request_stop(),
            SessionInput::Quit => break,
        }
    }

    screen
        .cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    save_session_to_history(&config, &session, started_at);

    tracing::info!("=== viva interview session exited ===");
    Ok(())
}

/// Records the finished session to the local history database. Failures are
/// logged, never fatal: the session already happened.
fn save_session_to_history(config: &VivaConfig, session: &InterviewSession, started_at: Instant) {
    let answers = session.completed_answers();
    if answers.is_empty() {
        tracing::debug!("No evaluated answers this session; nothing saved to history");
        return;
    }

    let duration_min = (started_at.elapsed().as_secs().max(1)).div_ceil(60) as i64;
    let feedback = answers
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            format!("## Q{}. {}\n\n{}", i + 1, answer.question, answer.feedback)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let record = NewInterviewRecord {
        role: config.profile.role.clone(),
        duration_min,
        topics: Vec::new(),
        feedback,
    };

    let result = HistoryStore::default_data_dir()
        .and_then(|dir| HistoryStore::new(&dir))
        .and_then(|mut store| store.save_interview(&record));

    match result {
        Ok(()) => {
            println!(
                "Session saved: {} evaluated answer(s). View it with 'viva dashboard'.",
                answers.len()
            );
        }
        Err(e) => {
            tracing::warn!("Failed to save session to history: {}", e);
            eprintln!("Warning: failed to save session to history: {e}");
        }
    }
}

fn show_error(message: &str) -> Result<(), anyhow::Error> {
    let mut error_screen = ErrorScreen::new()?;
    error_screen.show_error(message)?;
    error_screen.cleanup()?;
    Ok(())
}
