//! Utility functions for rendering UI components

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, List, ListItem, ListState},
    Frame,
};

use crate::model::ActiveSection;

pub fn border_style(active: ActiveSection, section: ActiveSection) -> Style {
    if active == section {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}

pub fn render_scrollable_list(
    frame: &mut Frame,
    area: Rect,
    items: Vec<ListItem>,
    selected_index: usize,
    block: Block,
) {
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(selected_index));

    frame.render_stateful_widget(list, area, &mut list_state);
}

pub fn format_duration(ms: u32) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Width of the index column (digits plus one space)
pub fn calculate_num_width(item_count: usize) -> usize {
    if item_count == 0 {
        2
    } else {
        let digits = (item_count as f64).log10().floor() as usize + 1;
        digits + 1
    }
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_width)
    } else {
        format!("{:<width$}", s, width = max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_as_minutes_and_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65_400), "1:05");
        assert_eq!(format_duration(3_600_000), "60:00");
    }

    #[test]
    fn long_strings_are_cut_and_short_ones_padded() {
        assert_eq!(truncate_string("Bohemian Rhapsody", 10), "Bohemia...");
        assert_eq!(truncate_string("Song", 6), "Song  ");
    }

    #[test]
    fn index_column_fits_largest_number() {
        assert_eq!(calculate_num_width(0), 2);
        assert_eq!(calculate_num_width(9), 2);
        assert_eq!(calculate_num_width(120), 4);
    }
}
