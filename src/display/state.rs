//! Display State Management
//!
//! UI-local state that has no bearing on refreshing: the help overlay and the
//! key bindings. Everything data-related lives in [`crate::view::DashboardView`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks the dashboard to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Refresh,
    NextPage,
    PrevPage,
    ToggleHelp,
    CloseOverlay,
}

/// Map a terminal key event onto a dashboard action
pub fn map_key(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(KeyAction::Quit),
        KeyCode::Char('q') => Some(KeyAction::Quit),
        KeyCode::Char('r') => Some(KeyAction::Refresh),
        KeyCode::Char('n') => Some(KeyAction::NextPage),
        KeyCode::Char('p') => Some(KeyAction::PrevPage),
        KeyCode::Char('?') => Some(KeyAction::ToggleHelp),
        KeyCode::Esc => Some(KeyAction::CloseOverlay),
        _ => None,
    }
}

/// Overlay and exit flags of the live display
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UiState {
    pub show_help: bool,
    pub should_quit: bool,
}

impl UiState {
    /// Apply UI-only actions; returns the action if the session must handle it
    pub fn apply(&mut self, action: KeyAction) -> Option<KeyAction> {
        match action {
            KeyAction::Quit => {
                self.should_quit = true;
                None
            }
            KeyAction::ToggleHelp => {
                self.show_help = !self.show_help;
                None
            }
            KeyAction::CloseOverlay => {
                self.show_help = false;
                None
            }
            KeyAction::Refresh | KeyAction::NextPage | KeyAction::PrevPage => {
                // Any session action dismisses the help overlay
                self.show_help = false;
                Some(action)
            }
        }
    }
}

/// Key help shown in the overlay
pub const HELP_LINES: &[(&str, &str)] = &[
    ("q / Ctrl+C", "quit"),
    ("r", "refresh now (ignored while rate limited)"),
    ("n", "next usage-log page"),
    ("p", "previous usage-log page"),
    ("?", "toggle this help"),
    ("Esc", "close overlay"),
];
