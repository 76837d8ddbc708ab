use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AppState, Tab};

use super::styles;
use super::tabs::{profile, projects};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(8),    // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title = "  projectdeck";
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let tabs = [
        ("[1] Projects", app.current_tab == Tab::Projects),
        ("[2] Profile", app.current_tab == Tab::Profile),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, selected)) in tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(*label, styles::tab_style(*selected)));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Projects => projects::render(frame, app, area),
        Tab::Profile => profile::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let session = &app.session_state;
    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else if session.is_loading() {
        " Checking saved session... ".to_string()
    } else if session.is_logged_in() {
        " Logged in ".to_string()
    } else {
        " Not logged in ".to_string()
    };

    let shortcuts = if app.is_editing_login() {
        "[tab] next field | [esc] back"
    } else {
        "[r]efresh | [q]uit"
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(44, 14, frame.area());
    frame.render_widget(Clear, area);

    let bindings = [
        ("1 / 2", "Switch tab"),
        ("← / →", "Previous / next tab"),
        ("↑ / ↓", "Move selection"),
        ("r", "Reload projects"),
        ("l", "Log out (Profile tab)"),
        ("tab", "Next login field"),
        ("enter", "Submit login"),
        ("esc", "Leave login form"),
        ("q", "Quit"),
        ("?", "Toggle help"),
    ];

    let mut lines = vec![Line::from("")];
    for (key, desc) in bindings {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<10}", key), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ]));
    }

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
