//! Header component: current station, current song and the status line.
//!
//! Not focusable.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::{
    app_state::AppState,
    component::Component,
    theme::{style_border, style_playing, style_secondary, C_ACCENT, C_BUSY, C_PRIMARY},
};

pub struct Header;

impl Header {
    pub fn height() -> u16 {
        5
    }
}

impl Component for Header {
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let station = match &state.station {
            Some(name) => Span::styled(name.clone(), style_playing().add_modifier(Modifier::BOLD)),
            None => Span::styled("None", style_secondary()),
        };
        let status = match state.busy {
            Some(progress) => Span::styled(format!("{}…", progress), Style::default().fg(C_BUSY)),
            None => Span::styled(state.status.clone(), Style::default().fg(C_PRIMARY)),
        };

        let lines = vec![
            Line::from(vec![Span::styled("Station  ", style_secondary()), station]),
            Line::from(vec![
                Span::styled("Song     ", style_secondary()),
                Span::styled(state.song.clone(), Style::default().fg(C_PRIMARY)),
            ]),
            Line::from(vec![Span::styled("Status   ", style_secondary()), status]),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border())
            .title(Span::styled(
                " cli-radio ",
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ));
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            area,
        );
    }
}
