use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ProjectsView};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" My Projects ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    match app.projects {
        ProjectsView::Loading => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled("Loading projects...", styles::highlight_style())),
            ];
            let paragraph = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
        }
        ProjectsView::Failed(ref message) => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(format!("Error: {}", message), styles::error_style())),
                Line::from(""),
                Line::from(Span::styled(
                    "Make sure the backend server is running.",
                    styles::muted_style(),
                )),
                Line::from(Span::styled(
                    format!("URL: {}", app.api.projects_url()),
                    styles::muted_style(),
                )),
            ];
            let paragraph = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(paragraph, area);
        }
        ProjectsView::Loaded(ref projects) if projects.is_empty() => {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled("No projects yet", styles::muted_style())),
            ])
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(paragraph, area);
        }
        ProjectsView::Loaded(ref projects) => {
            let items: Vec<ListItem> = projects
                .iter()
                .map(|project| {
                    ListItem::new(vec![
                        Line::from(Span::styled(project.title.clone(), styles::card_title_style())),
                        Line::from(Span::styled(
                            format!("  {}", project.display_description()),
                            styles::list_item_style(),
                        )),
                        Line::from(""),
                    ])
                })
                .collect();

            let list = List::new(items)
                .block(block)
                .highlight_style(styles::selected_style());

            let mut state = ListState::default().with_selected(Some(app.project_selection));
            frame.render_stateful_widget(list, area, &mut state);
        }
    }
}
