//! Interview history: persistence, aggregation, and the dashboard UI.

pub mod dashboard;
pub mod storage;
pub mod ui;

pub use dashboard::{filter_records, totals, DashboardFilter, Totals};
pub use storage::{HistoryStore, InterviewRecord, NewInterviewRecord, Sentiment};
pub use ui::DashboardViewer;
