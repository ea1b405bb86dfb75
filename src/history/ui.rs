//! Interactive terminal dashboard for past interview sessions.
//!
//! Shows KPI totals, a sentiment breakdown, a score trend, and a filterable
//! table of sessions. Selecting a row opens the full Markdown feedback.

use crate::history::dashboard::{
    distinct_roles, filter_records, score_trend, sentiment_buckets, totals, DashboardFilter,
};
use crate::history::storage::{InterviewRecord, Sentiment};
use crate::ui::markdown;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Padding, Paragraph, Row, Sparkline,
        Table, TableState, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

const FG: Color = Color::Rgb(255, 255, 255);
const DIM: Color = Color::Rgb(120, 120, 120);
const ACCENT: Color = Color::Rgb(34, 197, 94);
const HIGHLIGHT_BG: Color = Color::Rgb(30, 30, 30);

/// What keyboard input currently drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Table,
    Search,
}

/// Interactive dashboard over the interview history.
pub struct DashboardViewer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    records: Vec<InterviewRecord>,
    roles: Vec<String>,
    query: Input,
    /// 0 = all sentiments, 1..=3 index into `Sentiment::all()`
    sentiment_idx: usize,
    /// 0 = all roles, otherwise index into `roles`
    role_idx: usize,
    table_state: TableState,
    /// Id of the record whose feedback is open, if any
    detail: Option<i64>,
    focus: Focus,
}

impl DashboardViewer {
    /// Creates a dashboard over the given records.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new(records: Vec<InterviewRecord>) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let roles = distinct_roles(&records);
        let mut table_state = TableState::default();
        if !records.is_empty() {
            table_state.select(Some(0));
        }

        Ok(Self {
            terminal,
            records,
            roles,
            query: Input::default(),
            sentiment_idx: 0,
            role_idx: 0,
            table_state,
            detail: None,
            focus: Focus::Table,
        })
    }

    fn current_filter(&self) -> DashboardFilter {
        DashboardFilter {
            query: self.query.value().to_string(),
            sentiment: match self.sentiment_idx {
                0 => None,
                i => Some(Sentiment::all()[i - 1]),
            },
            role: match self.role_idx {
                0 => None,
                i => Some(self.roles[i - 1].clone()),
            },
        }
    }

    /// Runs the dashboard loop until the user exits.
    ///
    /// # Errors
    /// - If rendering or input handling fails
    pub fn run(&mut self) -> Result<()> {
        tracing::debug!("Dashboard opened with {} records", self.records.len());

        loop {
            self.draw()?;

            if !event::poll(Duration::from_millis(50))? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };

            if self.detail.is_some() {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter) {
                    self.detail = None;
                }
                continue;
            }

            match self.focus {
                Focus::Search => match key.code {
                    KeyCode::Esc | KeyCode::Enter => {
                        self.focus = Focus::Table;
                        self.clamp_selection();
                    }
                    _ => {
                        self.query.handle_event(&Event::Key(key));
                        self.clamp_selection();
                    }
                },
                Focus::Table => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('/') => self.focus = Focus::Search,
                    KeyCode::Tab => {
                        self.sentiment_idx = (self.sentiment_idx + 1) % 4;
                        self.clamp_selection();
                    }
                    KeyCode::Char('r') => {
                        self.role_idx = (self.role_idx + 1) % (self.roles.len() + 1);
                        self.clamp_selection();
                    }
                    KeyCode::Up => self.move_selection(-1),
                    KeyCode::Down => self.move_selection(1),
                    KeyCode::Enter => {
                        let filter = self.current_filter();
                        let filtered = filter_records(&self.records, &filter);
                        if let Some(selected) = self.table_state.selected() {
                            if let Some(record) = filtered.get(selected) {
                                self.detail = Some(record.id);
                            }
                        }
                    }
                    _ => {}
                },
            }
        }

        self.cleanup()
    }

    fn filtered_len(&self) -> usize {
        filter_records(&self.records, &self.current_filter()).len()
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.filtered_len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.table_state.select(Some(next));
    }

    /// Keeps the selection inside the filtered set after a filter change.
    fn clamp_selection(&mut self) {
        let len = self.filtered_len();
        if len == 0 {
            self.table_state.select(None);
        } else {
            let selected = self.table_state.selected().unwrap_or(0).min(len - 1);
            self.table_state.select(Some(selected));
        }
    }

    fn draw(&mut self) -> Result<()> {
        let filter = self.current_filter();
        let filtered = filter_records(&self.records, &filter);
        let kpis = totals(&filtered);
        let buckets = sentiment_buckets(&filtered);
        let trend: Vec<u64> = score_trend(&filtered)
            .iter()
            .map(|(_, score)| *score as u64)
            .collect();

        let detail_record = self
            .detail
            .and_then(|id| self.records.iter().find(|r| r.id == id).cloned());

        let query_value = self.query.value().to_string();
        let sentiment_label = match self.sentiment_idx {
            0 => "all".to_string(),
            i => Sentiment::all()[i - 1].to_string(),
        };
        let role_label = match self.role_idx {
            0 => "all".to_string(),
            i => self.roles[i - 1].clone(),
        };
        let focus = self.focus;

        let rows: Vec<Row> = filtered
            .iter()
            .map(|record| {
                Row::new(vec![
                    Cell::from(format!("INT-{:03}", record.id)),
                    Cell::from(record.recorded_at.format("%Y-%m-%d %H:%M").to_string()),
                    Cell::from(record.role.clone()),
                    Cell::from(record.score.to_string()),
                    Cell::from(record.sentiment.to_string())
                        .style(Style::default().fg(sentiment_color(record.sentiment))),
                    Cell::from(record.topics.join(", ")),
                ])
            })
            .collect();

        let table_state = &mut self.table_state;
        self.terminal.draw(|frame| {
            let area = frame.area();

            if let Some(record) = &detail_record {
                render_detail(frame, area, record);
                return;
            }

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // filters
                    Constraint::Length(4), // KPI row
                    Constraint::Length(7), // sentiment + trend
                    Constraint::Min(5),    // table
                    Constraint::Length(1), // help
                ])
                .split(area);

            let filter_style = if focus == Focus::Search {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(DIM)
            };
            frame.render_widget(
                Paragraph::new(format!(
                    "search: {query_value}    sentiment: {sentiment_label}    role: {role_label}"
                ))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(filter_style)
                        .title(" Filters "),
                ),
                chunks[0],
            );

            let kpi_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(33),
                    Constraint::Percentage(33),
                    Constraint::Percentage(34),
                ])
                .split(chunks[1]);
            render_kpi(frame, kpi_chunks[0], "Total Interviews", kpis.count.to_string());
            render_kpi(
                frame,
                kpi_chunks[1],
                "Average Score",
                kpis.average_score.to_string(),
            );
            render_kpi(
                frame,
                kpi_chunks[2],
                "Total Minutes",
                kpis.total_minutes.to_string(),
            );

            let chart_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(chunks[2]);

            let bars: Vec<Bar> = buckets
                .iter()
                .map(|(sentiment, count)| {
                    Bar::default()
                        .label(Line::from(sentiment.as_str()))
                        .value(*count as u64)
                        .style(Style::default().fg(sentiment_color(*sentiment)))
                })
                .collect();
            frame.render_widget(
                BarChart::default()
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(DIM))
                            .title(" Sentiment "),
                    )
                    .bar_width(9)
                    .bar_gap(2)
                    .data(BarGroup::default().bars(&bars)),
                chart_chunks[0],
            );

            frame.render_widget(
                Sparkline::default()
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(DIM))
                            .title(" Score Trend "),
                    )
                    .data(&trend)
                    .max(100)
                    .style(Style::default().fg(ACCENT)),
                chart_chunks[1],
            );

            let table = Table::new(
                rows,
                [
                    Constraint::Length(9),
                    Constraint::Length(17),
                    Constraint::Length(22),
                    Constraint::Length(6),
                    Constraint::Length(9),
                    Constraint::Min(10),
                ],
            )
            .header(
                Row::new(vec!["ID", "Date", "Role", "Score", "Sentiment", "Topics"])
                    .style(Style::default().fg(DIM).add_modifier(Modifier::BOLD)),
            )
            .row_highlight_style(Style::default().bg(HIGHLIGHT_BG).fg(FG))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(DIM))
                    .title(" Interviews "),
            );
            frame.render_stateful_widget(table, chunks[3], table_state);

            frame.render_widget(
                Paragraph::new(
                    "/ search · tab sentiment · r role · ↑↓ select · enter feedback · q quit",
                )
                .style(Style::default().fg(Color::Rgb(80, 80, 80)))
                .alignment(Alignment::Center),
                chunks[4],
            );
        })?;

        Ok(())
    }

    /// Cleans up terminal state and exits alternate screen mode.
    pub fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for DashboardViewer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn sentiment_color(sentiment: Sentiment) -> Color {
    match sentiment {
        Sentiment::Positive => Color::Rgb(52, 211, 153),
        Sentiment::Neutral => Color::Rgb(148, 163, 184),
        Sentiment::Negative => Color::Rgb(244, 63, 94),
    }
}

fn render_kpi(frame: &mut Frame, area: Rect, label: &str, value: String) {
    let text = vec![
        Line::from(Span::styled(label.to_string(), Style::default().fg(DIM))),
        Line::from(Span::styled(
            value,
            Style::default().fg(FG).add_modifier(Modifier::BOLD),
        )),
    ];
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(DIM))
                .padding(Padding::horizontal(1)),
        ),
        area,
    );
}

fn render_detail(frame: &mut Frame, area: Rect, record: &InterviewRecord) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    let meta = vec![
        Line::from(Span::styled(
            format!("Feedback · INT-{:03}", record.id),
            Style::default().fg(FG).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "{} · {} · score {} · {} min",
                record.recorded_at.format("%Y-%m-%d %H:%M"),
                record.role,
                record.score,
                record.duration_min
            ),
            Style::default().fg(DIM),
        )),
    ];
    frame.render_widget(
        Paragraph::new(meta).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(DIM))
                .padding(Padding::horizontal(1)),
        ),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(markdown::render(&record.feedback))
            .wrap(Wrap { trim: false })
            .block(Block::default().padding(Padding::horizontal(1))),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new("esc back")
            .style(Style::default().fg(Color::Rgb(80, 80, 80)))
            .alignment(Alignment::Center),
        chunks[2],
    );
}
