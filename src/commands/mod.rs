//! Application command handlers for viva.
//!
//! This module organizes command handling into separate submodules, each
//! responsible for a specific application command.
//!
//! # Commands
//! - `practice`: the interview practice session (default command)
//! - `dashboard`: browse and filter past interview results
//! - `config`: open configuration file in user's preferred editor
//! - `list_devices`: list available audio input devices
//! - `logs`: display recent log entries

pub mod config;
pub mod dashboard;
pub mod list_devices;
pub mod logs;
pub mod practice;

pub use config::handle_config;
pub use dashboard::handle_dashboard;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use practice::handle_practice;
