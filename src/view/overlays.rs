//! Overlay rendering (message notification, text prompt, help popup)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::model::{MessageLevel, Prompt, PromptKind, UiState};

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

pub fn render_message_notification(frame: &mut Frame, ui_state: &UiState) {
    let Some(message) = ui_state.message.as_ref() else {
        return;
    };
    let area = frame.area();

    let popup_width = 52.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(4).max(1) as usize;

    // Wrapped line count for the message body
    let line_count = message.chars().count().div_ceil(inner_width) as u16;
    let popup_height = (2 + line_count.max(1)).min(area.height.saturating_sub(4));
    let popup_area = centered(area, popup_width, popup_height);

    let (color, title) = match ui_state.message_level {
        MessageLevel::Error => (Color::Red, " Error (Esc to dismiss) "),
        MessageLevel::Info => (Color::Cyan, " Notice (Esc to dismiss) "),
    };

    frame.render_widget(Clear, popup_area);

    let widget = Paragraph::new(message.as_str())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title)
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        );

    frame.render_widget(widget, popup_area);
}

pub fn render_prompt(frame: &mut Frame, prompt: &Prompt) {
    let popup_area = centered(frame.area(), 50, 3);
    frame.render_widget(Clear, popup_area);

    let (text, color, hint) = match &prompt.kind {
        PromptKind::ConfirmDelete { name, .. } => (
            format!("Delete \"{}\"? This cannot be undone.", name),
            Color::Red,
            " Y/Enter: delete | N/Esc: keep ",
        ),
        _ => (format!("{}▏", prompt.input), Color::Green, " Enter: save | Esc: cancel "),
    };

    let input = Paragraph::new(text)
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(prompt.title())
                .title_bottom(hint)
                .style(Style::default().bg(Color::Black)),
        );

    frame.render_widget(input, popup_area);
}

pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();

    let keybindings = [
        ("", "── Navigation ──"),
        ("Tab / Shift+Tab", "Cycle sections"),
        ("↑ / ↓", "Move selection"),
        ("Enter", "Open playlist / Play track"),
        ("/", "Focus search"),
        ("T", "All tracks"),
        ("", ""),
        ("", "── Playback ──"),
        ("Space", "Play / Pause"),
        ("N", "Next track"),
        ("P", "Previous track"),
        ("S", "Stop"),
        ("+ / -", "Volume up / down"),
        (", / .", "Seek back / forward"),
        ("0", "Restart track"),
        ("", ""),
        ("", "── Playlists ──"),
        ("C", "Create playlist"),
        ("R", "Rename playlist"),
        ("V", "Toggle public / private"),
        ("A", "Add search result to playlist"),
        ("Delete", "Delete playlist / Remove track"),
        ("", ""),
        ("", "── General ──"),
        ("H", "Toggle this help"),
        ("Q", "Quit"),
    ];

    let popup_height = (keybindings.len() as u16 + 2).min(area.height.saturating_sub(4));
    let popup_area = centered(area, 62, popup_height);

    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                Line::from(Span::styled(
                    format!("{:^38}", desc),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>18}", key),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(Color::White)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help (H or Esc to close) ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        )
        .style(Style::default().bg(Color::Black));

    frame.render_widget(help_text, popup_area);
}
