//! Layout rendering (top bar, sidebar)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Padding, Paragraph},
    Frame,
};

use crate::model::{ActiveSection, UiState, Visibility};
use super::utils::{border_style, render_scrollable_list};

pub fn render_top_bar(frame: &mut Frame, area: Rect, ui_state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Search input
            Constraint::Length(25), // Signed-in user
        ])
        .split(area);

    let searching = ui_state.active_section == ActiveSection::Search;
    let search_style = if searching {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::White)
    };

    let search_text = if ui_state.search_query.is_empty() {
        "Type to search..."
    } else {
        &ui_state.search_query
    };

    let search = Paragraph::new(search_text).style(search_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Search ")
            .padding(Padding::horizontal(1))
            .border_style(border_style(ui_state.active_section, ActiveSection::Search)),
    );
    frame.render_widget(search, chunks[0]);

    let user = Paragraph::new(format!("👤 {}", ui_state.username))
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" User "));
    frame.render_widget(user, chunks[1]);
}

pub fn render_sidebar(frame: &mut Frame, area: Rect, ui_state: &UiState) {
    let focused = ui_state.active_section == ActiveSection::Playlists;

    let items: Vec<ListItem> = ui_state
        .playlists
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == ui_state.playlist_selected && focused {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if i == ui_state.playlist_selected {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else if !item.owned {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };

            let marker = match (item.owned, item.summary.publicity) {
                (false, _) => "◦",
                (true, Visibility::Public) => "●",
                (true, Visibility::Private) => "○",
            };
            ListItem::new(format!("{} {}", marker, item.summary.name)).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Playlists ")
        .padding(Padding::horizontal(1))
        .border_style(border_style(ui_state.active_section, ActiveSection::Playlists));

    if items.is_empty() {
        let empty = Paragraph::new("No playlists yet\nPress C to create one")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    render_scrollable_list(frame, area, items, ui_state.playlist_selected, block);
}
