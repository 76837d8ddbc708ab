//! projectdeck - browse projects and manage a login session from the terminal.
//!
//! With no arguments this starts the TUI. See `cli` for the one-shot
//! commands.

mod app;
mod cli;
mod ui;

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use projectdeck_core::{ApiClient, Config, SessionManager, StorageBackend};

use app::{App, AppState};
use cli::Command;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// How long to wait for in-flight session writes when quitting
const SHUTDOWN_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

/// Log file written while the TUI owns the terminal
const LOG_FILE: &str = "projectdeck.log";

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr for one-shot commands
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Log to a file so output doesn't draw over the TUI
fn init_file_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse_args(&args)?;

    let mut config = Config::load().context("Failed to load config")?;
    if invocation.ephemeral {
        config.storage = StorageBackend::Memory;
    }

    let _log_guard = if invocation.command == Command::Tui {
        Some(init_file_tracing(&config.cache_dir()?)?)
    } else {
        init_stderr_tracing();
        None
    };

    let store = config.open_store().context("Failed to open session storage")?;
    let session = SessionManager::new(store);
    let api = ApiClient::new(&config.api_url).context("Failed to create API client")?;

    if invocation.command != Command::Tui {
        return cli::run(invocation.command, &session, &api).await;
    }

    info!(api_url = %config.api_url, "projectdeck starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, session, api);
    app.refresh_projects();

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // A logout right before quitting must still reach storage
    if tokio::time::timeout(SHUTDOWN_WRITE_TIMEOUT, app.finish_pending_writes())
        .await
        .is_err()
    {
        warn!("Timed out saving the session on exit");
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("projectdeck shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key) {
                    return Ok(());
                }
            }
        }

        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
