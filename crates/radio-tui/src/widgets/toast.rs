//! Toasts: short-lived messages in the top-right corner, plus one spinner
//! row while a background job runs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::theme::{C_BUSY, C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS};

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    fn lifetime(self) -> Duration {
        match self {
            Severity::Info | Severity::Success => Duration::from_secs(3),
            Severity::Error => Duration::from_secs(5),
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Severity::Info => "·",
            Severity::Success => "✓",
            Severity::Error => "✗",
        }
    }

    fn style(self) -> Style {
        let color = match self {
            Severity::Info => C_TOAST_INFO,
            Severity::Success => C_TOAST_SUCCESS,
            Severity::Error => C_TOAST_ERROR,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

#[derive(Default)]
pub struct ToastManager {
    toasts: VecDeque<Toast>,
    spinner: Option<(String, usize)>,
}

impl ToastManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        self.toasts.retain(|t| t.message != message);
        self.toasts.push_back(Toast {
            message,
            severity,
            expires: Instant::now() + severity.lifetime(),
        });
        while self.toasts.len() > MAX_VISIBLE {
            self.toasts.pop_front();
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Success);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Info);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Error);
    }

    pub fn start_spinner(&mut self, message: impl Into<String>) {
        self.spinner = Some((message.into(), 0));
    }

    pub fn stop_spinner(&mut self) {
        self.spinner = None;
    }

    /// Drop expired toasts and advance the spinner.  Call every tick.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| t.expires > now);
        if let Some((_, frame)) = &mut self.spinner {
            *frame = (*frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.toasts.iter().map(|t| t.message.as_str())
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let spinner = self.spinner.as_ref().map(|(message, i)| {
            (
                format!(" {} {} ", SPINNER_FRAMES[*i % SPINNER_FRAMES.len()], message),
                Style::default().fg(C_BUSY).add_modifier(Modifier::BOLD),
            )
        });
        let rows = spinner.into_iter().chain(
            self.toasts
                .iter()
                .rev()
                .map(|t| (format!(" {} {} ", t.severity.icon(), t.message), t.severity.style())),
        );

        let max_width = (area.width / 2).clamp(20, 60);
        for (row, (text, style)) in rows.enumerate() {
            let y = area.y + 1 + row as u16;
            if y >= area.y + area.height {
                break;
            }
            let width = (text.chars().count() as u16).min(max_width);
            let rect = Rect {
                x: area.x + area.width.saturating_sub(width + 1),
                y,
                width,
                height: 1,
            };
            frame.render_widget(Clear, rect);
            frame.render_widget(Paragraph::new(Line::from(Span::styled(text, style))), rect);
        }
    }
}
