use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use projectdeck_core::StorageBackend;

use crate::app::{App, LoginFocus};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

/// Width of the email and password input boxes
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Profile ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let session = &app.session_state;

    if session.is_loading() {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("Checking saved session...", styles::highlight_style())),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    if session.is_logged_in() {
        let saved_to = match app.config.storage {
            StorageBackend::File => "Session saved on this device.",
            StorageBackend::Keyring => "Session saved in the system keychain.",
            StorageBackend::Memory => "Session ends when you quit.",
        };
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("Welcome!", styles::success_style())),
            Line::from(""),
            Line::from("You are logged in."),
            Line::from(Span::styled(saved_to, styles::muted_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("[l]", styles::help_key_style()),
                Span::styled(" Log out", styles::error_style()),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    frame.render_widget(block, area);
    render_login_form(frame, app, area);
}

fn input_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    // Keep the tail visible once the value outgrows the box
    let skip = value.chars().count().saturating_sub(FIELD_WIDTH);
    let shown: String = value.chars().skip(skip).collect();

    Line::from(vec![
        Span::styled(format!("{:>10}: [", label), styles::muted_style()),
        Span::styled(format!("{:<width$}{}", shown, cursor, width = FIELD_WIDTH), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_form(frame: &mut Frame, app: &App, area: Rect) {
    let height = if app.login_error.is_some() { 10 } else { 8 };
    let form_area = centered_rect_fixed(44, height, area);

    let mut lines = vec![
        Line::from(Span::styled("Log in", styles::title_style())),
        Line::from(""),
        input_line("Email", &app.login_email, app.login_focus == LoginFocus::Email),
        input_line(
            "Password",
            &"*".repeat(app.login_password.chars().count()),
            app.login_focus == LoginFocus::Password,
        ),
        Line::from(""),
    ];

    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let label = if app.login_in_progress {
        " Signing in... "
    } else if button_focused {
        " ▶ Log in ◀ "
    } else {
        "   Log in   "
    };
    lines.push(Line::from(vec![
        Span::raw("["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), styles::error_style())));
    }

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, form_area);
}
