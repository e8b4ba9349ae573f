//! Main content area rendering (playlist tracks, search results, track catalog)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Padding, Paragraph},
    Frame,
};

use crate::model::{
    ActiveSection, CatalogTrack, ContentState, ContentView, PlaylistDetail, SearchHit, UiState,
};
use super::utils::{border_style, calculate_num_width, render_scrollable_list, truncate_string};

pub fn render_main_content(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    content_state: &ContentState,
    current_source_id: Option<&str>,
) {
    let is_focused = ui_state.active_section == ActiveSection::MainContent;
    let borders = border_style(ui_state.active_section, ActiveSection::MainContent);

    if content_state.is_loading {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Content ")
                    .border_style(borders),
            );
        frame.render_widget(loading, area);
        return;
    }

    match &content_state.view {
        ContentView::Empty => {
            let content = Paragraph::new(
                "Open a playlist, search for music or press T for all tracks\n\nTab: switch sections\n↑/↓: select\nEnter: open / play\nH: all keys",
            )
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .padding(Padding::horizontal(1))
                    .border_style(borders),
            );
            frame.render_widget(content, area);
        }
        ContentView::PlaylistDetail {
            detail,
            selected_index,
            editable,
        } => {
            render_playlist_detail(
                frame,
                area,
                detail,
                *selected_index,
                *editable,
                is_focused,
                current_source_id,
            );
        }
        ContentView::SearchResults {
            query,
            results,
            selected_index,
        } => {
            let target = content_state.target_playlist.as_ref().map(|p| p.name.as_str());
            render_search_results(
                frame,
                area,
                query,
                results,
                *selected_index,
                target,
                is_focused,
                current_source_id,
            );
        }
        ContentView::Catalog {
            tracks,
            selected_index,
        } => {
            render_catalog(frame, area, tracks, *selected_index, is_focused, current_source_id);
        }
    }
}

fn row_style(is_selected: bool, is_focused: bool, is_playing: bool) -> Style {
    if is_selected && is_focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if is_playing {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if is_selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

/// Header row followed by one row per track; the playing one is marked
fn render_track_rows<'a>(
    rows: impl ExactSizeIterator<Item = (&'a str, &'a str, &'a str)>,
    selected_index: usize,
    is_focused: bool,
    current_source_id: Option<&str>,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(rows.len());
    let fixed_width = 1 + num_width + 3 + 3;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    let mut items: Vec<ListItem<'static>> = vec![ListItem::new(format!(
        " {:<num_width$}   {:<title_width$}   {:<artist_width$}",
        "#", "Title", "Artist",
    ))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))];

    items.extend(rows.enumerate().map(|(i, (source_id, name, author))| {
        let is_playing = current_source_id.is_some_and(|id| id == source_id);
        let playing_indicator = if is_playing { "▶" } else { " " };
        let track_num = format!("{}{:<num_width$}", playing_indicator, i + 1);

        ListItem::new(format!(
            "{}   {}   {}",
            track_num,
            truncate_string(name, title_width),
            truncate_string(author, artist_width),
        ))
        .style(row_style(i == selected_index, is_focused, is_playing))
    }));
    items
}

fn render_playlist_detail(
    frame: &mut Frame,
    area: Rect,
    detail: &PlaylistDetail,
    selected_index: usize,
    editable: bool,
    is_focused: bool,
    current_source_id: Option<&str>,
) {
    let borders = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(0),    // Tracks
        ])
        .split(area);

    let hints = if editable {
        "Enter: Play | Del: Remove | R: Rename | V: Visibility"
    } else {
        "Enter: Play | read-only"
    };
    let header_text = format!(
        "📻 {} ({})\n {} tracks | {}",
        detail.summary.name,
        detail.summary.publicity,
        detail.tracks.len(),
        hints
    );
    let header = Paragraph::new(header_text)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .padding(Padding::horizontal(1))
                .borders(Borders::ALL)
                .border_style(borders),
        );
    frame.render_widget(header, chunks[0]);

    let tracks_block = Block::default()
        .borders(Borders::ALL)
        .title(" Tracks ")
        .padding(Padding::horizontal(1))
        .border_style(borders);

    if detail.tracks.is_empty() {
        let empty = Paragraph::new("This playlist is empty. Search and press A to add tracks.")
            .style(Style::default().fg(Color::DarkGray))
            .block(tracks_block);
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let content_width = chunks[1].width.saturating_sub(4) as usize;
    let rows = detail
        .tracks
        .iter()
        .map(|t| (t.source_id.as_str(), t.name.as_str(), t.author.as_str()));
    let items = render_track_rows(rows, selected_index, is_focused, current_source_id, content_width);

    // +1 for the header row
    render_scrollable_list(frame, chunks[1], items, selected_index + 1, tracks_block);
}

#[allow(clippy::too_many_arguments)]
fn render_search_results(
    frame: &mut Frame,
    area: Rect,
    query: &str,
    results: &[SearchHit],
    selected_index: usize,
    target_playlist: Option<&str>,
    is_focused: bool,
    current_source_id: Option<&str>,
) {
    let borders = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    let add_hint = match target_playlist {
        Some(name) => format!("A: Add to \"{}\"", name),
        None => "Open one of your playlists to add tracks".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Results for \"{}\" ", query))
        .title_bottom(format!(" Enter: Play | {} ", add_hint))
        .padding(Padding::horizontal(1))
        .border_style(borders);

    if results.is_empty() {
        let empty = Paragraph::new("No results")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let content_width = area.width.saturating_sub(4) as usize;
    let rows = results
        .iter()
        .map(|hit| (hit.id.as_str(), hit.track.as_str(), hit.artist.as_str()));
    let items = render_track_rows(rows, selected_index, is_focused, current_source_id, content_width);

    render_scrollable_list(frame, area, items, selected_index + 1, block);
}

fn catalog_status(row: &CatalogTrack) -> String {
    match (row.result, row.is_playable()) {
        (true, _) => format!("ready @ {}", row.host.as_deref().unwrap_or("N/A")),
        (false, true) => format!("pending, {} fails", row.fails),
        (false, false) => "unavailable".to_string(),
    }
}

fn render_catalog(
    frame: &mut Frame,
    area: Rect,
    tracks: &[CatalogTrack],
    selected_index: usize,
    is_focused: bool,
    current_source_id: Option<&str>,
) {
    let borders = if is_focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" All tracks ({}) ", tracks.len()))
        .title_bottom(" Enter: Play ")
        .padding(Padding::horizontal(1))
        .border_style(borders);

    if tracks.is_empty() {
        let empty = Paragraph::new("No tracks have been processed yet. Play tracks from your playlists to add them here.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let artists: Vec<String> = tracks
        .iter()
        .map(|row| format!("{} ({})", row.track.author, catalog_status(row)))
        .collect();
    let content_width = area.width.saturating_sub(4) as usize;
    let rows = tracks
        .iter()
        .zip(&artists)
        .map(|(row, artist)| (row.track.source_id.as_str(), row.track.name.as_str(), artist.as_str()));
    let items = render_track_rows(rows, selected_index, is_focused, current_source_id, content_width);

    render_scrollable_list(frame, area, items, selected_index + 1, block);
}
