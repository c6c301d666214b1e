//! Terminal User Interface Implementation
//!
//! Terminal setup and the main display loop. The loop multiplexes three
//! sources with `tokio::select!`: the one-second timer, finished fetch
//! cycles, and terminal key events. Rendering happens after each of them.

use super::state::{map_key, KeyAction, UiState};
use super::widgets::{render_dashboard, AppTheme};
use crate::live::{DashboardSession, FetchCompletion};
use crate::timestamp_parser::local_now;
use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Update interval for the display (milliseconds)
const UPDATE_INTERVAL_MS: u64 = 1000;

/// Terminal backend type alias
type TerminalBackend = CrosstermBackend<Stdout>;

/// Main display manager for the dashboard TUI
pub struct LiveDisplayManager {
    terminal: Terminal<TerminalBackend>,
    ui: UiState,
    theme: AppTheme,
    restored: bool,
}

impl LiveDisplayManager {
    /// Enter raw mode and the alternate screen
    pub fn new() -> Result<Self> {
        let terminal = setup_terminal()?;
        Ok(Self {
            terminal,
            ui: UiState::default(),
            theme: AppTheme::default(),
            restored: false,
        })
    }

    /// Run the display loop until the user quits
    pub async fn run(
        &mut self,
        session: &mut DashboardSession,
        completions: &mut mpsc::Receiver<FetchCompletion>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_millis(UPDATE_INTERVAL_MS));
        let mut events = EventStream::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    session.tick(local_now());
                }
                Some(completion) = completions.recv() => {
                    session.apply_completion(completion, local_now());
                }
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) => {
                            if let Some(action) = map_key(&key).and_then(|a| self.ui.apply(a)) {
                                self.dispatch(session, action);
                            }
                        }
                        // Resize and other events only need a redraw
                        Some(Ok(_)) => {}
                        Some(Err(e)) => warn!(error = %e, "terminal event error"),
                        None => {
                            debug!("terminal event stream closed");
                            self.ui.should_quit = true;
                        }
                    }
                }
            }

            if self.ui.should_quit {
                break;
            }
            self.render(session)?;
        }

        self.restore()
    }

    fn dispatch(&mut self, session: &mut DashboardSession, action: KeyAction) {
        let now = local_now();
        match action {
            KeyAction::Refresh => {
                session.force_refresh(now);
            }
            KeyAction::NextPage => {
                session.next_page(now);
            }
            KeyAction::PrevPage => {
                session.prev_page(now);
            }
            KeyAction::Quit | KeyAction::ToggleHelp | KeyAction::CloseOverlay => {}
        }
    }

    /// Render the current session state
    fn render(&mut self, session: &DashboardSession) -> Result<()> {
        let view = session.view(local_now());
        let ui = &self.ui;
        let theme = &self.theme;
        self.terminal
            .draw(|frame| render_dashboard(frame, &view, ui, theme))
            .context("Failed to draw frame")?;
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        cleanup_terminal(&mut self.terminal)
    }
}

impl Drop for LiveDisplayManager {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Setup the terminal for TUI mode
fn setup_terminal() -> Result<Terminal<TerminalBackend>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Cleanup terminal and restore normal mode
fn cleanup_terminal(terminal: &mut Terminal<TerminalBackend>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("Failed to cleanup terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_interval_constant() {
        assert_eq!(UPDATE_INTERVAL_MS, 1000);
    }
}
