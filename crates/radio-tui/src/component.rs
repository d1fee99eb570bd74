//! Component trait: the interface every UI panel implements.
//!
//! Components own their own view state, read `AppState`, and answer keys
//! with an optional `Action` for the App to dispatch.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::Action;
use crate::app_state::AppState;

pub trait Component {
    /// Handle a key press.  Only called for the component that owns input.
    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Option<Action> {
        None
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState);
}
