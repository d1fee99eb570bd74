//! LogPanel component: recent warnings and errors from the log layer.
//!
//! Collapsed it shows the newest line only; expanded it fills the remaining
//! space, newest at the bottom.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    theme::{style_border, style_muted, style_secondary},
};

pub struct LogPanel {
    pub expanded: bool,
    /// Lines scrolled up from the bottom.
    pub scroll_back: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            expanded: false,
            scroll_back: 0,
        }
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
        self.scroll_back = 0;
    }
}

impl Component for LogPanel {
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Option<Action> {
        if key.kind == KeyEventKind::Release || !self.expanded {
            return None;
        }
        match key.code {
            KeyCode::PageUp => {
                self.scroll_back = (self.scroll_back + 5).min(state.logs.len().saturating_sub(1));
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
            }
            _ => {}
        }
        None
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height == 0 {
            return;
        }

        if !self.expanded || area.height < 3 {
            let last = state
                .logs
                .back()
                .map(String::as_str)
                .unwrap_or("(no warnings)");
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(" log ", style_muted()),
                    Span::styled(last.to_string(), style_secondary()),
                ])),
                area,
            );
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border())
            .title(" log ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let height = inner.height as usize;
        let end = state.logs.len().saturating_sub(self.scroll_back);
        let start = end.saturating_sub(height);
        let lines: Vec<Line> = state
            .logs
            .iter()
            .skip(start)
            .take(end - start)
            .map(|line| Line::from(Span::styled(format!(" {}", line), style_muted())))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
