//! Display Module for the Terminal Dashboard
//!
//! Renders a [`crate::view::DashboardView`] with ratatui on a crossterm
//! backend and turns key presses into session actions.
//!
//! ## Core Components
//!
//! - [`LiveDisplayManager`] - Terminal setup and the `select!` display loop
//! - [`UiState`] / [`map_key`] - Help overlay and key bindings
//! - [`render_dashboard`] - Lays out and draws every widget
//!
//! ## TUI Layout
//!
//! ```text
//! [WARN] Rate limited (429), backing off. Next retry: 2026-02-07 12:00:07
//! Balance: $5.7001                                       ver: 0.3.0
//! ████████████░░░░░░░░░░░░░░ $60 / $100  60%
//! ┌─ Package 1 · pro ──────┐┌─ Package 2 · lite ─────┐
//! │ Reset today  reset     ││ Reset today  —         │
//! │ Quota        $40/$100  ││ Quota        —         │
//! └────────────────────────┘└────────────────────────┘
//! ┌─ Usage by model ─────────────────────────────────┐
//! │ Model      Requests  Tokens     Cost       Share │
//! └──────────────────────────────────────────────────┘
//! ┌─ Usage log  (p prev / n next  page 1 / 3) ───────┐
//! └──────────────────────────────────────────────────┘
//! ┌─ Token trend ────────────────────────────────────┐
//! ┌─ Burn / ETA ─────────────────────────────────────┐
//! Last OK: … | Next refresh: … | Backoff: — | Stale: no | Degraded: — | Range: 24h
//! ```
//!
//! ## Keys
//!
//! `q`/Ctrl+C quit, `r` refresh, `n`/`p` page the usage log, `?` help.

pub mod state;
pub mod tui;
pub mod widgets;

pub use state::*;
pub use tui::*;
pub use widgets::*;

use crate::live::{DashboardSession, FetchCompletion};
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

/// Main entry point for running the dashboard
///
/// Takes over the terminal until the user quits, then restores it.
pub async fn run_dashboard(
    mut session: DashboardSession,
    mut completions: mpsc::Receiver<FetchCompletion>,
) -> Result<()> {
    let mut manager = LiveDisplayManager::new()?;
    let result = manager.run(&mut session, &mut completions).await;
    drop(manager);

    info!(cycles = session.dispatched(), "dashboard closed");
    result
}
