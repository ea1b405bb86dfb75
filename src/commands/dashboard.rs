//! Interview history dashboard.

use crate::history::{DashboardViewer, HistoryStore};

/// Opens the dashboard over recorded interview sessions.
///
/// # Errors
/// - If the history database cannot be opened or read
/// - If the terminal UI fails
pub fn handle_dashboard() -> Result<(), anyhow::Error> {
    let data_dir = HistoryStore::default_data_dir()?;
    let mut store = HistoryStore::new(&data_dir)?;
    let records = store.all_interviews()?;

    if records.is_empty() {
        println!("No interview sessions recorded yet.");
        println!("Run 'viva' to practice; finished sessions show up here.");
        return Ok(());
    }

    tracing::info!("Opening dashboard with {} sessions", records.len());
    let mut viewer = DashboardViewer::new(records)?;
    viewer.run()
}
