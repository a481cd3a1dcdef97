//! Echoes recent keystrokes in the bottom-right corner, vim style.

use std::{any::Any, time::Instant};

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{prelude::*, widgets::*};

use super::Component;
use crate::{action::Action, config::key_event_to_string, tui::Frame};

const COOLDOWN_SECS: f64 = 1.0;
const MAX_KEYS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Keystrokes {
    last_key_at: Instant,
    key_history: Vec<KeyEvent>,
}

impl Default for Keystrokes {
    fn default() -> Self {
        Self::new()
    }
}

impl Keystrokes {
    pub fn new() -> Self {
        Self { last_key_at: Instant::now(), key_history: Vec::new() }
    }

    fn app_tick(&mut self) {
        if self.last_key_at.elapsed().as_secs_f64() >= COOLDOWN_SECS {
            self.key_history.clear();
        }
    }

    fn format_key_events(key_events: &[KeyEvent]) -> String {
        key_events.iter().map(key_event_to_string).collect()
    }
}

impl Component for Keystrokes {
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        if let Action::Tick = action {
            self.app_tick()
        };
        Ok(None)
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        self.key_history.push(key);
        if self.key_history.len() > MAX_KEYS {
            self.key_history.remove(0);
        }
        self.last_key_at = Instant::now();
        Ok(Some(Action::Render))
    }

    fn draw(&mut self, f: &mut Frame<'_>, rect: Rect) -> Result<()> {
        let s = Keystrokes::format_key_events(&self.key_history);
        let block = Block::default().title(block::Title::from(s.dim()).alignment(Alignment::Right));
        let rect = Rect::new(rect.x, rect.height.saturating_sub(1), rect.width, 1);
        f.render_widget(block, rect);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_history_is_capped() {
        let mut keystrokes = Keystrokes::new();
        for c in "abcdefghijkl".chars() {
            keystrokes.handle_key_events(key(c)).unwrap();
        }
        assert_eq!(keystrokes.key_history.len(), MAX_KEYS);
        assert_eq!(Keystrokes::format_key_events(&keystrokes.key_history), "cdefghijkl");
    }

    #[test]
    fn test_history_clears_after_cooldown() {
        let mut keystrokes = Keystrokes::new();
        keystrokes.handle_key_events(key('g')).unwrap();
        keystrokes.last_key_at = Instant::now() - std::time::Duration::from_secs(2);
        keystrokes.update(Action::Tick).unwrap();
        assert!(keystrokes.key_history.is_empty());
    }
}
