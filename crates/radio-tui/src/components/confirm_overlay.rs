//! ConfirmOverlay component: centered y/n popup.  While open it owns all
//! key input.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, Question},
    app_state::AppState,
    component::Component,
    theme::{style_muted, C_OVERLAY_BG, C_OVERLAY_BORDER, C_PRIMARY},
};

pub struct ConfirmOverlay {
    question: Option<Question>,
}

impl ConfirmOverlay {
    pub fn new() -> Self {
        Self { question: None }
    }

    pub fn is_open(&self) -> bool {
        self.question.is_some()
    }

    pub fn ask(&mut self, question: Question) {
        self.question = Some(question);
    }

    /// Close the overlay, handing back the question that was answered.
    pub fn take(&mut self) -> Option<Question> {
        self.question.take()
    }
}

impl Component for ConfirmOverlay {
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Option<Action> {
        if key.kind == KeyEventKind::Release || self.question.is_none() {
            return None;
        }
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(Action::Answer(true)),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::Answer(false)),
            _ => None,
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        let Some(question) = &self.question else {
            return;
        };

        let mut lines: Vec<Line> = question
            .prompt()
            .lines()
            .map(|l| {
                Line::from(Span::styled(
                    format!(" {}", l),
                    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
                ))
            })
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" y / enter: yes    n / esc: no", style_muted())));

        let popup = centered_rect(70, lines.len() as u16 + 4, area);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(C_OVERLAY_BORDER))
                        .style(Style::default().bg(C_OVERLAY_BG)),
                )
                .wrap(Wrap { trim: false }),
            popup,
        );
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}
