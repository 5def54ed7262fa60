//! docchat-tui: Terminal chat view for docchat
//!
//! This crate provides the interactive front end:
//! - Conversation sidebar, transcript with markdown answers, input box
//! - Background requests on tokio tasks, applied on the UI loop
//! - Clipboard copy of answers and whole conversations

mod app;
mod clipboard;
mod event;
mod screens;
#[cfg(test)]
pub mod test_utils;
mod text;
mod ui;

use screens::Screen as ScreenTrait;

pub use app::{App, Screen};
pub use docchat_engine;
pub use event::{Action, Event, EventHandler};

use crossterm::{
    cursor::Show as ShowCursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use docchat_engine::{
    dispatch, AskBackend, AskFailure, AskOutcome, CancellationToken, Config, HttpBackend,
    PendingAsk,
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io::{self, stdout};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the TUI against the backend named in `config`.
///
/// Sets up the terminal, runs the event loop, and restores the terminal on
/// exit.
pub async fn run_tui(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(HttpBackend::new(
        &config.backend_url,
        config.request_timeout(),
    )?);
    info!(url = backend.ask_url(), "Starting TUI");

    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(config.backend_url.clone());

    // 4 Hz tick rate drives the spinner and picks up finished requests.
    let mut events = EventHandler::new(250);

    let result = run_loop(&mut terminal, &mut app, &mut events, backend).await;

    terminal.show_cursor()?;

    result
}

async fn run_loop<B: AskBackend + 'static>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
    backend: Arc<B>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut requests = Requests::new(backend);

    loop {
        terminal.draw(|frame| draw(app, frame))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Key(key) => {
                    if let Some(pending) = app.handle_key(key) {
                        requests.spawn(pending);
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse.kind),
                Event::Tick => app.tick(),
                Event::Resize(_, _) => {}
            }
        }

        if let Some(pending) = app.resume_creation() {
            requests.spawn(pending);
        }

        requests.collect_finished(app).await;

        if app.should_quit {
            requests.shutdown(app).await;
            break;
        }
    }

    Ok(())
}

/// Draw the current screen and any overlay.
fn draw(app: &App, frame: &mut Frame<'_>) {
    let area = frame.area();
    let buf = frame.buffer_mut();

    match app.screen {
        Screen::Chat => screens::chat::ChatScreen.render(app, area, buf),
        Screen::QuitConfirm => screens::chat::QuitConfirmScreen.render(app, area, buf),
    }

    if app.show_help {
        screens::render_help_overlay(area, buf);
    }
}

/// Requests running on tokio tasks.
///
/// Results are applied to the [`App`] only from the UI loop.
struct Requests<B> {
    backend: Arc<B>,
    cancel: CancellationToken,
    tasks: Vec<(PendingAsk, JoinHandle<Option<AskOutcome>>)>,
}

impl<B: AskBackend + 'static> Requests<B> {
    fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    fn spawn(&mut self, pending: PendingAsk) {
        let backend = Arc::clone(&self.backend);
        let cancel = self.cancel.clone();
        let request = pending.request().clone();
        let handle =
            tokio::spawn(async move { dispatch(backend.as_ref(), &request, &cancel).await });
        self.tasks.push((pending, handle));
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Apply every finished request without waiting on the rest.
    async fn collect_finished(&mut self, app: &mut App) {
        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].1.is_finished() {
                let (pending, handle) = self.tasks.swap_remove(i);
                resolve(app, pending, handle.await);
            } else {
                i += 1;
            }
        }
    }

    /// Cancel outstanding requests and release their conversations.
    async fn shutdown(self, app: &mut App) {
        self.cancel.cancel();
        for (pending, handle) in self.tasks {
            resolve(app, pending, handle.await);
        }
    }
}

fn resolve(app: &mut App, pending: PendingAsk, joined: Result<Option<AskOutcome>, JoinError>) {
    match joined {
        Ok(Some(outcome)) => app.apply_outcome(pending, outcome),
        Ok(None) => app.abandon(pending),
        Err(e) => {
            warn!(error = %e, "Ask task failed");
            app.apply_outcome(pending, Err(AskFailure::server_unreachable()));
        }
    }
}

/// Get the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
