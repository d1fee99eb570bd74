//! Key bar: bottom line with the global key bindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_PRIMARY, C_SECONDARY, C_SEPARATOR};

const GLOBAL_KEYS: &[(&str, &str)] = &[
    ("↑↓", "select"),
    ("enter", "run"),
    ("c", "copy song"),
    ("l", "log"),
    ("q", "quit"),
];

const OVERLAY_KEYS: &[(&str, &str)] = &[("y", "yes"), ("n", "no")];

pub fn draw_key_bar(frame: &mut Frame, area: Rect, overlay_open: bool) {
    let keys = if overlay_open { OVERLAY_KEYS } else { GLOBAL_KEYS };

    let mut spans = Vec::with_capacity(keys.len() * 3);
    for (i, (key, desc)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(C_SEPARATOR)));
        }
        spans.push(Span::styled(
            *key,
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {}", desc), Style::default().fg(C_SECONDARY)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
