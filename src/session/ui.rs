//! Terminal user interface for the interview session.
//!
//! Displays the current question, countdown, microphone status with a live
//! level sparkline, and the evaluation panel with a loading animation while an
//! upload is in flight.

use crate::session::state::SessionState;
use crate::ui::markdown;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Padding, Paragraph, Sparkline, Wrap},
};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const ACCENT: Color = Color::Rgb(34, 197, 94);
const DIM: Color = Color::Rgb(120, 120, 120);
const WARN: Color = Color::Rgb(244, 63, 94);
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// User input during an interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    /// No key pressed
    Continue,
    /// Start or stop recording the current answer (Space)
    ToggleRecording,
    /// Move to the next question ('n' or Right)
    NextQuestion,
    /// Stop recording and get feedback ('e')
    EndSession,
    /// Leave the session ('q' or Escape)
    Quit,
}

/// Full-screen interview session view.
pub struct SessionScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    level_history: Vec<u64>,
    last_sample_time: Instant,
    sample_interval: Duration,
    spinner_start: Instant,
    terminal_width: usize,
}

impl SessionScreen {
    /// Creates the screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized or raw mode enabled
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let terminal_width = terminal.size()?.width as usize;
        let now = Instant::now();

        Ok(Self {
            terminal,
            level_history: vec![0; terminal_width],
            last_sample_time: now,
            sample_interval: Duration::from_millis(50),
            spinner_start: now,
            terminal_width,
        })
    }

    /// Polls for one keyboard input, waiting at most 50ms.
    ///
    /// # Errors
    /// - If reading terminal events fails
    pub fn poll_input(&mut self) -> anyhow::Result<SessionInput> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                return Ok(match key.code {
                    KeyCode::Char(' ') | KeyCode::Char('r') => SessionInput::ToggleRecording,
                    KeyCode::Char('n') | KeyCode::Right => SessionInput::NextQuestion,
                    KeyCode::Char('e') => SessionInput::EndSession,
                    KeyCode::Char('q') | KeyCode::Esc => SessionInput::Quit,
                    _ => SessionInput::Continue,
                });
            }
        }
        Ok(SessionInput::Continue)
    }

    /// Renders one frame of the session view.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(
        &mut self,
        state: &SessionState,
        question: &str,
        question_count: usize,
        samples: &[i16],
    ) -> anyhow::Result<()> {
        self.update_level_history(state.microphone_active, samples);

        let spinner_elapsed = self.spinner_start.elapsed().as_millis() as usize;
        let level_history = self.level_history.clone();

        self.terminal.draw(|frame| {
            let area = frame.area();
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // progress bar
                    Constraint::Length(2), // question header
                    Constraint::Length(4), // question text
                    Constraint::Length(3), // countdown
                    Constraint::Length(3), // mic status + level
                    Constraint::Min(8),    // feedback panel
                    Constraint::Length(1), // status line
                    Constraint::Length(1), // help
                ])
                .split(area);

            // Session progress across the question list
            let progress =
                (state.question_index + 1) as f64 / question_count.max(1) as f64;
            frame.render_widget(
                Gauge::default()
                    .gauge_style(Style::default().fg(ACCENT).bg(Color::Rgb(25, 25, 25)))
                    .ratio(progress)
                    .label(""),
                chunks[0],
            );

            frame.render_widget(
                Paragraph::new(format!(
                    "QUESTION {} OF {}",
                    state.question_index + 1,
                    question_count
                ))
                .style(Style::default().fg(DIM))
                .alignment(Alignment::Center),
                chunks[1],
            );

            frame.render_widget(
                Paragraph::new(question.to_string())
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true }),
                chunks[2],
            );

            let countdown_style = if state.seconds_remaining <= 5 && state.timer_running {
                Style::default().fg(WARN).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            frame.render_widget(
                Paragraph::new(format!("\n{}", state.seconds_remaining))
                    .style(countdown_style)
                    .alignment(Alignment::Center),
                chunks[3],
            );

            let mic_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(20), Constraint::Min(10)])
                .split(chunks[4]);

            let mic_label = if state.microphone_active {
                Paragraph::new("\n● REC  mic is on")
                    .style(Style::default().fg(WARN).add_modifier(Modifier::BOLD))
            } else {
                Paragraph::new("\n○ mic is off").style(Style::default().fg(DIM))
            };
            frame.render_widget(mic_label, mic_chunks[0]);

            frame.render_widget(
                Sparkline::default()
                    .data(&level_history)
                    .max(100)
                    .style(Style::default().fg(ACCENT)),
                mic_chunks[1],
            );

            let feedback_block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(60, 60, 60)))
                .padding(Padding::horizontal(1))
                .title(" AI Feedback ");

            let feedback = if state.loading {
                let frame_idx = (spinner_elapsed / 100) % SPINNER_FRAMES.len();
                Paragraph::new(format!(
                    "{} Evaluating your answer...",
                    SPINNER_FRAMES[frame_idx]
                ))
                .style(Style::default().fg(DIM))
            } else if state.evaluation_text.is_empty() {
                Paragraph::new(
                    "Your AI interviewer's feedback will appear here after you record your answer.",
                )
                .style(Style::default().fg(DIM))
                .wrap(Wrap { trim: true })
            } else {
                Paragraph::new(markdown::render(&state.evaluation_text)).wrap(Wrap { trim: true })
            };
            frame.render_widget(feedback.block(feedback_block), chunks[5]);

            frame.render_widget(
                Paragraph::new(state.status_message.clone())
                    .style(Style::default().fg(DIM))
                    .alignment(Alignment::Center),
                chunks[6],
            );

            frame.render_widget(
                Paragraph::new("space record/stop · n next question · e end session · q quit")
                    .style(Style::default().fg(Color::Rgb(80, 80, 80)))
                    .alignment(Alignment::Center),
                chunks[7],
            );
        })?;

        Ok(())
    }

    /// Appends a level sample every `sample_interval` while recording, so the
    /// sparkline scrolls at a steady rate independent of frame rate.
    fn update_level_history(&mut self, recording: bool, samples: &[i16]) {
        if self.last_sample_time.elapsed() < self.sample_interval {
            return;
        }
        self.last_sample_time = Instant::now();

        let level = if recording { peak_level(samples) } else { 0 };
        self.level_history.push(level);

        if let Ok(size) = self.terminal.size() {
            self.terminal_width = size.width as usize;
        }
        while self.level_history.len() > self.terminal_width.max(1) {
            self.level_history.remove(0);
        }
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for SessionScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Peak amplitude of the most recent window of samples, as a 0-100 level.
fn peak_level(samples: &[i16]) -> u64 {
    const WINDOW: usize = 1600;

    let start = samples.len().saturating_sub(WINDOW);
    let peak = samples[start..]
        .iter()
        .map(|s| (*s as i32).unsigned_abs())
        .max()
        .unwrap_or(0);
    (peak as u64 * 100) / i16::MAX as u64
}
