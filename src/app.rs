//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command
//! handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal-based AI interview practice tool
#[derive(Parser)]
#[command(name = "viva")]
#[command(version)]
#[command(about = "Practice spoken interview answers against an AI evaluator")]
#[command(
    long_about = "viva runs timed mock-interview sessions in your terminal: each question\ngives you a fixed number of seconds to record a spoken answer, the recording\nis sent to your evaluation backend, and the Markdown feedback is rendered\nin place. Finished sessions land in a local history you can explore with\nthe dashboard.\n\nDEFAULT COMMAND:\n    If no command is specified, 'practice' is used by default.\n\nEXAMPLES:\n    # Start a practice session\n    $ viva\n    $ viva practice\n\n    # Review past sessions\n    $ viva dashboard\n\n    # Edit configuration (backend URL, questions, timing)\n    $ viva config\n\n    # Find the right microphone\n    $ viva list-devices"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/viva/viva.toml\n    History database:   ~/.local/share/viva/interview_history.db\n    Logs:               ~/.local/state/viva/viva.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a timed interview practice session (default)
    ///
    /// Press Space to start and stop recording an answer, 'n' for the next
    /// question, 'e' to end the session, 'q' to quit.
    #[command(visible_alias = "p")]
    Practice,

    /// Browse and filter past interview results
    ///
    /// Shows totals, sentiment breakdown, and score trend over your recorded
    /// sessions. Use '/' to search, Tab and 'r' to filter, Enter for the full
    /// feedback of a session.
    #[command(visible_alias = "d")]
    Dashboard,

    /// Open configuration file in your preferred editor
    ///
    /// Edit the backend URL, audio device, question list, and per-question
    /// time budget. Uses $EDITOR or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in viva.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   viva completions bash > viva.bash
    ///   viva completions zsh > _viva
    ///   viva completions fish > viva.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails (e.g., recording, dashboard viewing)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "viva", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Practice) => {
            commands::handle_practice().await?;
        }
        Some(Commands::Dashboard) => {
            commands::handle_dashboard()?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
