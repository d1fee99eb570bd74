//! Menu component: the command list.  Arrows move, enter runs the
//! selected entry, hotkeys run an entry directly.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::{
    action::{Action, MenuItem},
    app_state::AppState,
    component::Component,
    theme::{style_border, style_muted, style_secondary, style_selected},
};

pub struct Menu {
    selected: usize,
}

impl Menu {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    pub fn selected(&self) -> MenuItem {
        MenuItem::ALL[self.selected.min(MenuItem::ALL.len() - 1)]
    }

    /// Rows needed including the border.
    pub fn height() -> u16 {
        MenuItem::ALL.len() as u16 + 2
    }
}

impl Component for Menu {
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(MenuItem::ALL.len() - 1);
                None
            }
            KeyCode::Enter => Some(Action::Run(self.selected())),
            KeyCode::Char(c) => MenuItem::from_hotkey(c).map(|item| {
                if let Some(i) = MenuItem::ALL.iter().position(|m| *m == item) {
                    self.selected = i;
                }
                Action::Run(item)
            }),
            _ => None,
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        let lines: Vec<Line> = MenuItem::ALL
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let hint = Span::styled(format!(" {} ", item.hotkey()), style_muted());
                if i == self.selected {
                    Line::from(vec![
                        Span::styled("> ", style_selected()),
                        Span::styled(item.label(), style_selected()),
                        hint,
                    ])
                } else {
                    Line::from(vec![
                        Span::raw("  "),
                        Span::styled(item.label(), style_secondary()),
                        hint,
                    ])
                }
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border())
            .title(" menu ");
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_clamp_and_enter_runs_selection() {
        let state = AppState::new("");
        let mut menu = Menu::new();

        assert_eq!(menu.handle_key(key(KeyCode::Up), &state), None);
        assert_eq!(menu.selected(), MenuItem::PlayStation);
        for _ in 0..10 {
            menu.handle_key(key(KeyCode::Down), &state);
        }
        assert_eq!(menu.selected(), MenuItem::Stop);
        menu.handle_key(key(KeyCode::Up), &state);
        assert_eq!(
            menu.handle_key(key(KeyCode::Enter), &state),
            Some(Action::Run(MenuItem::DetectSong))
        );
    }

    #[test]
    fn test_hotkey_runs_and_selects() {
        let state = AppState::new("");
        let mut menu = Menu::new();
        assert_eq!(
            menu.handle_key(key(KeyCode::Char('b')), &state),
            Some(Action::Run(MenuItem::PreviousStation))
        );
        assert_eq!(menu.selected(), MenuItem::PreviousStation);
        assert_eq!(menu.handle_key(key(KeyCode::Char('x')), &state), None);
    }
}
