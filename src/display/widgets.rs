//! Custom TUI Widgets for the Dashboard
//!
//! Each section of the dashboard is a small widget with a `render(frame, area)`
//! method. Widgets only read from [`DashboardView`]; they never compute metrics.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Sparkline, Table, Wrap},
    Frame,
};

use super::state::{UiState, HELP_LINES};
use crate::models::{ModelUsageRow, StatsTotals, UseLogRow};
use crate::normalizer::{billing_rate_label, billing_source_label};
use crate::scheduler::{Banner, BannerLevel};
use crate::view::{
    fmt_balance, fmt_cost, fmt_count, fmt_pct_short, fmt_share, reset_today_label,
    DashboardView, SubscriptionCard, MODEL_ROW_LIMIT, PLACEHOLDER, USE_LOG_ROW_LIMIT,
};

/// Style constants for consistent theming
pub struct AppTheme {
    pub primary: Style,
    pub secondary: Style,
    pub accent: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub muted: Style,
}

impl Default for AppTheme {
    fn default() -> Self {
        Self {
            primary: Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            secondary: Style::default().fg(Color::Cyan),
            accent: Style::default().fg(Color::Yellow),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),
            muted: Style::default().fg(Color::DarkGray),
        }
    }
}

impl AppTheme {
    /// Green below 60% used, yellow below 90%, red beyond
    pub fn usage_style(&self, used_pct: Option<f64>) -> Style {
        match used_pct {
            None => self.muted,
            Some(pct) if pct >= 0.9 => self.error,
            Some(pct) if pct >= 0.6 => self.warning,
            Some(_) => self.success,
        }
    }

    fn banner_style(&self, level: BannerLevel) -> Style {
        match level {
            BannerLevel::Info => self.secondary,
            BannerLevel::Warn => self.warning,
            BannerLevel::Error => self.error,
        }
    }
}

fn section_block<'a>(title: &'a str, theme: &AppTheme) -> Block<'a> {
    Block::default()
        .title(title)
        .title_style(theme.primary)
        .borders(Borders::ALL)
        .border_style(theme.secondary)
}

/// One-line notice at the top
pub struct BannerWidget<'a> {
    banner: Option<&'a Banner>,
    theme: &'a AppTheme,
}

impl<'a> BannerWidget<'a> {
    pub fn new(banner: Option<&'a Banner>, theme: &'a AppTheme) -> Self {
        Self { banner, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let line = match self.banner {
            Some(banner) => {
                let prefix = match banner.level {
                    BannerLevel::Info => "",
                    BannerLevel::Warn => "[WARN] ",
                    BannerLevel::Error => "[ERROR] ",
                };
                Line::from(Span::styled(
                    format!("{prefix}{}", banner.text),
                    self.theme.banner_style(banner.level),
                ))
            }
            None => Line::from(""),
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Balance line plus the overall quota gauge
pub struct OverviewWidget<'a> {
    view: &'a DashboardView,
    theme: &'a AppTheme,
}

impl<'a> OverviewWidget<'a> {
    pub fn new(view: &'a DashboardView, theme: &'a AppTheme) -> Self {
        Self { view, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let metrics = self.view.metrics.as_ref();
        let balance = fmt_balance(metrics.and_then(|m| m.balance));
        let version = format!("ver: {}", env!("CARGO_PKG_VERSION"));
        let header = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(version.len() as u16)])
            .split(rows[0]);
        frame.render_widget(
            Paragraph::new(Span::styled(format!("Balance: {balance}"), self.theme.primary)),
            header[0],
        );
        frame.render_widget(
            Paragraph::new(Span::styled(version, self.theme.muted)).alignment(Alignment::Right),
            header[1],
        );

        let label = metrics
            .map(|m| m.quota_label())
            .unwrap_or_else(|| format!("{PLACEHOLDER} / {PLACEHOLDER}"));
        let pct = metrics.and_then(|m| m.quota.used_pct());
        let gauge = Gauge::default()
            .gauge_style(self.theme.usage_style(pct))
            .ratio(pct.unwrap_or(0.0).clamp(0.0, 1.0))
            .label(format!("{label}  {}", fmt_pct_short(pct)));
        frame.render_widget(gauge, rows[1]);
    }
}

/// One card per subscription package
pub struct SubscriptionsWidget<'a> {
    cards: &'a [SubscriptionCard],
    theme: &'a AppTheme,
}

impl<'a> SubscriptionsWidget<'a> {
    pub fn new(cards: &'a [SubscriptionCard], theme: &'a AppTheme) -> Self {
        Self { cards, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if self.cards.is_empty() {
            let empty = Paragraph::new(format!("Subscriptions: {PLACEHOLDER}"))
                .style(self.theme.muted)
                .block(section_block("Subscriptions", self.theme));
            frame.render_widget(empty, area);
            return;
        }

        let count = self.cards.len() as u32;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(self.cards.iter().map(|_| Constraint::Ratio(1, count)))
            .split(area);

        for (idx, (card, column)) in self.cards.iter().zip(columns.iter()).enumerate() {
            let border = match card.record.reset_today {
                Some(false) => self.theme.secondary,
                Some(true) => self.theme.success,
                None => self.theme.warning,
            };
            let title = format!("Package {} · {}", idx + 1, card.record.tier_id);
            let block = Block::default()
                .title(title)
                .title_style(self.theme.primary)
                .borders(Borders::ALL)
                .border_style(border);

            let text = Text::from(vec![
                kv_line("Reset today", reset_today_label(card.record.reset_today), self.theme),
                kv_line("Obtained", &card.record.obtained_at.display(), self.theme),
                kv_line("Expires", &card.record.expires_at.display(), self.theme),
                kv_line("Quota", &card.quota_line(), self.theme),
                Line::from(vec![
                    Span::styled(format!("{:<12}", "Used"), self.theme.muted),
                    Span::styled(
                        format!("{} {}", bar_text(card.used_pct(), 12), fmt_pct_short(card.used_pct())),
                        self.theme.usage_style(card.used_pct()),
                    ),
                ]),
            ]);
            frame.render_widget(Paragraph::new(text).block(block), *column);
        }
    }
}

fn kv_line<'a>(key: &'a str, value: &str, theme: &AppTheme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{key:<12}"), theme.muted),
        Span::raw(value.to_string()),
    ])
}

/// Character progress bar used inside cards
pub fn bar_text(pct: Option<f64>, width: usize) -> String {
    match pct {
        None => "░".repeat(width),
        Some(pct) => {
            let filled = ((pct.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
            format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
        }
    }
}

/// Per-model usage table with a totals row
pub struct ModelTableWidget<'a> {
    rows: &'a [ModelUsageRow],
    totals: Option<&'a StatsTotals>,
    theme: &'a AppTheme,
}

impl<'a> ModelTableWidget<'a> {
    pub fn new(rows: &'a [ModelUsageRow], totals: Option<&'a StatsTotals>, theme: &'a AppTheme) -> Self {
        Self { rows, totals, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = section_block("Usage by model", self.theme);
        let totals_empty = self.totals.map_or(true, StatsTotals::is_empty);
        if self.rows.is_empty() && totals_empty {
            frame.render_widget(
                Paragraph::new(PLACEHOLDER).style(self.theme.muted).block(block),
                area,
            );
            return;
        }

        let header = Row::new(["Model", "Requests", "Tokens", "Cost", "Share"]).style(self.theme.primary);
        let mut rows: Vec<Row> = self
            .rows
            .iter()
            .take(MODEL_ROW_LIMIT)
            .map(|r| {
                Row::new([
                    Cell::from(r.model.clone()),
                    Cell::from(fmt_count(r.requests)),
                    Cell::from(fmt_count(r.tokens)),
                    Cell::from(fmt_cost(r.cost)),
                    Cell::from(fmt_share(r.share)),
                ])
            })
            .collect();

        let totals = self.totals.copied().unwrap_or_default();
        rows.push(
            Row::new([
                Cell::from("Total"),
                Cell::from(fmt_count(totals.requests)),
                Cell::from(fmt_count(totals.tokens)),
                Cell::from(fmt_cost(totals.cost)),
                Cell::from("100%"),
            ])
            .style(self.theme.accent),
        );

        let widths = [
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(8),
        ];
        let table = Table::new(rows, widths).header(header).block(block).column_spacing(2);
        frame.render_widget(table, area);
    }
}

/// Current page of the usage log
pub struct UseLogTableWidget<'a> {
    rows: &'a [UseLogRow],
    page_note: &'a str,
    theme: &'a AppTheme,
}

impl<'a> UseLogTableWidget<'a> {
    pub fn new(rows: &'a [UseLogRow], page_note: &'a str, theme: &'a AppTheme) -> Self {
        Self { rows, page_note, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!("Usage log  (p prev / n next  {})", self.page_note);
        let block = Block::default()
            .title(title)
            .title_style(self.theme.primary)
            .borders(Borders::ALL)
            .border_style(self.theme.secondary);

        if self.rows.is_empty() {
            frame.render_widget(
                Paragraph::new(PLACEHOLDER).style(self.theme.muted).block(block),
                area,
            );
            return;
        }

        let text = |value: &Option<String>| value.clone().unwrap_or_else(|| PLACEHOLDER.to_string());
        let header = Row::new([
            "Time", "Key", "Model", "Channel", "Tokens", "Rate", "Billed to", "Cost", "IP",
        ])
        .style(self.theme.primary);
        let rows: Vec<Row> = self
            .rows
            .iter()
            .take(USE_LOG_ROW_LIMIT)
            .map(|r| {
                Row::new([
                    Cell::from(text(&r.time)),
                    Cell::from(text(&r.key_name)),
                    Cell::from(text(&r.model)),
                    Cell::from(text(&r.channel)),
                    Cell::from(fmt_count(r.tokens)),
                    Cell::from(billing_rate_label(r.billing_rate)),
                    Cell::from(billing_source_label(r.billing_source.as_deref())),
                    Cell::from(fmt_cost(r.cost)),
                    Cell::from(text(&r.ip)),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(19),
            Constraint::Length(10),
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Length(15),
        ];
        frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
    }
}

/// Token trend sparkline
pub struct TrendWidget<'a> {
    series: &'a [f64],
    theme: &'a AppTheme,
}

impl<'a> TrendWidget<'a> {
    pub fn new(series: &'a [f64], theme: &'a AppTheme) -> Self {
        Self { series, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let data: Vec<u64> = self
            .series
            .iter()
            .map(|v| if v.is_finite() && *v > 0.0 { v.round() as u64 } else { 0 })
            .collect();
        let sparkline = Sparkline::default()
            .block(section_block("Token trend", self.theme))
            .style(self.theme.secondary)
            .data(&data);
        frame.render_widget(sparkline, area);
    }
}

/// Burn rate, ETA and live countdown
pub struct BurnEtaWidget<'a> {
    view: &'a DashboardView,
    theme: &'a AppTheme,
}

impl<'a> BurnEtaWidget<'a> {
    pub fn new(view: &'a DashboardView, theme: &'a AppTheme) -> Self {
        Self { view, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let text = Text::from(vec![
            Line::from(Span::styled(self.view.burn_line(), self.theme.accent)),
            Line::from(self.view.eta_line()),
            Line::from(Span::styled(self.view.remaining_tokens_line(), self.theme.muted)),
        ]);
        frame.render_widget(
            Paragraph::new(text).block(section_block("Burn / ETA", self.theme)),
            area,
        );
    }
}

/// Scheduler status at the bottom
pub struct StatusWidget<'a> {
    view: &'a DashboardView,
    theme: &'a AppTheme,
}

impl<'a> StatusWidget<'a> {
    pub fn new(view: &'a DashboardView, theme: &'a AppTheme) -> Self {
        Self { view, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let style = if self.view.is_stale() {
            self.theme.warning
        } else {
            self.theme.muted
        };
        let line = Line::from(vec![
            Span::styled(self.view.status.render(), style),
            Span::styled("   ? help", self.theme.muted),
        ]);
        frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: true }), area);
    }
}

/// Key help popup
pub struct HelpOverlayWidget<'a> {
    theme: &'a AppTheme,
}

impl<'a> HelpOverlayWidget<'a> {
    pub fn new(theme: &'a AppTheme) -> Self {
        Self { theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup_area);

        let lines: Vec<Line> = HELP_LINES
            .iter()
            .map(|(key, what)| {
                Line::from(vec![
                    Span::styled(format!("{key:<12}"), self.theme.accent),
                    Span::raw(*what),
                ])
            })
            .collect();
        let block = Block::default()
            .title("Keys")
            .title_style(self.theme.primary)
            .borders(Borders::ALL)
            .border_style(self.theme.accent);
        frame.render_widget(Paragraph::new(lines).block(block), popup_area);
    }
}

/// Create the vertical layout of the dashboard
pub fn create_main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Banner
            Constraint::Length(2), // Balance and quota gauge
            Constraint::Length(7), // Subscription cards
            Constraint::Min(5),    // Per-model table
            Constraint::Min(5),    // Usage log
            Constraint::Length(4), // Trend
            Constraint::Length(5), // Burn / ETA
            Constraint::Length(1), // Status line
        ])
        .split(area)
        .to_vec()
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Render one complete dashboard frame
pub fn render_dashboard(frame: &mut Frame, view: &DashboardView, ui: &UiState, theme: &AppTheme) {
    let area = frame.area();
    let chunks = create_main_layout(area);
    let metrics = view.metrics.as_ref();

    BannerWidget::new(view.banner.as_ref(), theme).render(frame, chunks[0]);
    OverviewWidget::new(view, theme).render(frame, chunks[1]);
    SubscriptionsWidget::new(metrics.map(|m| m.subscriptions.as_slice()).unwrap_or_default(), theme)
        .render(frame, chunks[2]);
    ModelTableWidget::new(
        metrics.map(|m| m.models.as_slice()).unwrap_or_default(),
        metrics.map(|m| &m.totals),
        theme,
    )
    .render(frame, chunks[3]);

    let page_note = view.page_note();
    UseLogTableWidget::new(metrics.map(|m| m.use_logs.as_slice()).unwrap_or_default(), &page_note, theme)
        .render(frame, chunks[4]);
    TrendWidget::new(metrics.map(|m| m.trend.as_slice()).unwrap_or_default(), theme).render(frame, chunks[5]);
    BurnEtaWidget::new(view, theme).render(frame, chunks[6]);
    StatusWidget::new(view, theme).render(frame, chunks[7]);

    if ui.show_help {
        HelpOverlayWidget::new(theme).render(frame, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 50);
        let centered = centered_rect(50, 50, area);

        assert_eq!(centered.x, 25);
        assert_eq!(centered.y, 12);
        assert_eq!(centered.width, 50);
        assert_eq!(centered.height, 25);
    }

    #[test]
    fn test_main_layout_constraints() {
        let area = Rect::new(0, 0, 120, 50);
        let layout = create_main_layout(area);

        assert_eq!(layout.len(), 8);
        assert_eq!(layout[0].height, 1); // Banner
        assert_eq!(layout[2].height, 7); // Cards
        assert_eq!(layout[7].height, 1); // Status
        assert!(layout[3].height >= 5);
        assert!(layout[4].height >= 5);
    }

    #[test]
    fn test_bar_text() {
        assert_eq!(bar_text(None, 4), "░░░░");
        assert_eq!(bar_text(Some(0.5), 4), "██░░");
        assert_eq!(bar_text(Some(1.7), 4), "████");
    }

    #[test]
    fn test_usage_style_thresholds() {
        let theme = AppTheme::default();
        assert_eq!(theme.usage_style(Some(0.95)), theme.error);
        assert_eq!(theme.usage_style(Some(0.6)), theme.warning);
        assert_eq!(theme.usage_style(Some(0.1)), theme.success);
        assert_eq!(theme.usage_style(None), theme.muted);
    }
}
