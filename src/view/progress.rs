//! Transport bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::model::PlaybackInfo;
use super::utils::format_duration;

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    if !playback.visible {
        let idle = Paragraph::new(" Nothing playing. Pick a track and press Enter.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(idle, area);
        return;
    }

    let indicator = if playback.is_loading {
        "…"
    } else if playback.is_playing {
        "▶"
    } else {
        "⏸"
    };
    let title = format!(" {} {} | {} ", indicator, playback.track.name, playback.track.author);

    let context = playback
        .playlist_name
        .as_deref()
        .map(|name| format!("From: {} | ", name))
        .unwrap_or_default();
    let controls_info = format!(" {}Vol: {}% ", context, playback.volume_percent);

    let time_str = format!(
        "{} / {}",
        format_duration(playback.progress_ms),
        format_duration(playback.duration_ms)
    );

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(playback.progress_percent() / 100.0)
        .label(time_str);

    frame.render_widget(gauge, area);
}
