//! The `:` command / `/` search input line. In search mode every edit is
//! pushed out immediately so the active table filters as the user types.

use std::any::Any;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::Rect,
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use super::Component;
use crate::{
    action::Action,
    colors::{ACTIVE_BORDER_COLOR, BG_COLOR, BODY_COLOR, GREEN_COLOR, PINK_COLOR},
    event::AppEvent,
    mode::Mode,
    tui::Frame,
};

#[derive(Default)]
pub struct CommandPalette {
    buffer: String,
    cursor_position: usize,
    action_tx: Option<UnboundedSender<Action>>,
    event_tx: Option<UnboundedSender<AppEvent>>,
    mode: Mode,
    active: bool,
}

impl CommandPalette {
    pub fn new() -> Self {
        Self::default()
    }

    fn show(&mut self) {
        trace!("Showing command palette ({:?})", self.mode);
        self.active = true;
        self.buffer.clear();
        self.cursor_position = 0;
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(AppEvent::CommandPaletteOpened);
        }
    }

    fn hide(&mut self) {
        trace!("Hiding command palette");
        self.active = false;
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(AppEvent::CommandPaletteClosed);
        }
    }

    /// The cursor counts chars; the buffer is indexed in bytes.
    fn byte_index(&self) -> usize {
        self.buffer.char_indices().nth(self.cursor_position).map(|(i, _)| i).unwrap_or(self.buffer.len())
    }

    /// In search mode the buffer is the live filter.
    fn push_incremental_search(&self) -> Result<()> {
        if self.mode != Mode::Search {
            return Ok(());
        }
        if let Some(tx) = &self.action_tx {
            tx.send(Action::ExecuteSearch(self.buffer.trim().to_string()))?;
        }
        Ok(())
    }
}

impl Component for CommandPalette {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(tx);
        Ok(())
    }

    fn register_event_handler(&mut self, tx: UnboundedSender<AppEvent>) -> Result<()> {
        self.event_tx = Some(tx);
        Ok(())
    }

    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if !self.is_active() {
            return Ok(None);
        }
        match key.code {
            KeyCode::Char(c) => {
                let index = self.byte_index();
                self.buffer.insert(index, c);
                self.cursor_position += 1;
                self.push_incremental_search()?;
                return Ok(Some(Action::Render));
            },
            KeyCode::Backspace => {
                if self.cursor_position > 0 {
                    self.cursor_position -= 1;
                    let index = self.byte_index();
                    self.buffer.remove(index);
                    self.push_incremental_search()?;
                    return Ok(Some(Action::Render));
                }
            },
            KeyCode::Left => {
                self.cursor_position = self.cursor_position.saturating_sub(1);
                return Ok(Some(Action::Render));
            },
            KeyCode::Right => {
                self.cursor_position = std::cmp::min(self.cursor_position + 1, self.buffer.chars().count());
                return Ok(Some(Action::Render));
            },
            KeyCode::Esc => {
                trace!("Command palette cancelled");
                self.buffer.clear();
                self.cursor_position = 0;
                if let Some(tx) = &self.action_tx {
                    if self.mode == Mode::Search {
                        // Cancelling a search restores the unfiltered view.
                        tx.send(Action::ExecuteSearch(String::new()))?;
                    }
                    tx.send(Action::ChangeMode(Mode::Normal))?;
                    tx.send(Action::Render)?;
                }
            },
            KeyCode::Enter => {
                let input = self.buffer.trim().to_string();
                self.buffer.clear();
                self.cursor_position = 0;
                if let Some(tx) = &self.action_tx {
                    match self.mode {
                        Mode::Command if !input.is_empty() => tx.send(Action::ExecuteCommand(input))?,
                        // The search filter was already applied incrementally.
                        _ => {},
                    }
                    tx.send(Action::ChangeMode(Mode::Normal))?;
                    tx.send(Action::Render)?;
                }
            },
            _ => {},
        }
        Ok(None)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        if let Action::ChangeMode(mode) = action {
            self.mode = mode;
            match mode {
                Mode::Command | Mode::Search => self.show(),
                Mode::Normal => self.hide(),
            }
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let title = match self.mode {
            Mode::Command => " Command ",
            Mode::Search => " Search ",
            Mode::Normal => "",
        };
        let prompt = match self.mode {
            Mode::Command => Span::styled(":", Style::default().fg(PINK_COLOR)),
            Mode::Search => Span::styled("/", Style::default().fg(GREEN_COLOR)),
            Mode::Normal => Span::default(),
        };
        let paragraph =
            Paragraph::new(Text::from(Line::from(vec![prompt, Span::styled(self.buffer.clone(), Style::default())])))
                .style(Style::default().bg(BG_COLOR).fg(BODY_COLOR))
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(ACTIVE_BORDER_COLOR)),
                );
        let palette_area =
            Rect { x: area.x + 2, y: area.y + area.height / 4, width: area.width.saturating_sub(4), height: 3 };
        f.render_widget(Clear, palette_area);
        f.render_widget(paragraph, palette_area);
        f.set_cursor(palette_area.x + self.cursor_position as u16 + 2, palette_area.y + 1);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn palette_in_mode(mode: Mode) -> (CommandPalette, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut palette = CommandPalette::new();
        palette.register_action_handler(tx).unwrap();
        palette.update(Action::ChangeMode(mode)).unwrap();
        (palette, rx)
    }

    #[test]
    fn test_inactive_palette_ignores_keys() {
        let (mut palette, _rx) = palette_in_mode(Mode::Normal);
        assert_eq!(palette.handle_key_events(key(KeyCode::Char('x'))).unwrap(), None);
        assert!(palette.buffer.is_empty());
    }

    #[test]
    fn test_search_is_incremental() {
        let (mut palette, mut rx) = palette_in_mode(Mode::Search);
        palette.handle_key_events(key(KeyCode::Char('a'))).unwrap();
        palette.handle_key_events(key(KeyCode::Char('b'))).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Action::ExecuteSearch("a".into()));
        assert_eq!(rx.try_recv().unwrap(), Action::ExecuteSearch("ab".into()));
    }

    #[test]
    fn test_command_fires_only_on_enter() {
        let (mut palette, mut rx) = palette_in_mode(Mode::Command);
        palette.handle_key_events(key(KeyCode::Char('m'))).unwrap();
        palette.handle_key_events(key(KeyCode::Char('e'))).unwrap();
        palette.handle_key_events(key(KeyCode::Enter)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Action::ExecuteCommand("me".into()));
        assert_eq!(rx.try_recv().unwrap(), Action::ChangeMode(Mode::Normal));
    }

    #[test]
    fn test_escaping_a_search_clears_the_filter() {
        let (mut palette, mut rx) = palette_in_mode(Mode::Search);
        palette.handle_key_events(key(KeyCode::Char('a'))).unwrap();
        rx.try_recv().unwrap();
        palette.handle_key_events(key(KeyCode::Esc)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Action::ExecuteSearch(String::new()));
        assert_eq!(rx.try_recv().unwrap(), Action::ChangeMode(Mode::Normal));
    }

    #[test]
    fn test_multibyte_input_edits_at_char_boundaries() {
        let (mut palette, _rx) = palette_in_mode(Mode::Command);
        palette.handle_key_events(key(KeyCode::Char('é'))).unwrap();
        palette.handle_key_events(key(KeyCode::Char('b'))).unwrap();
        palette.handle_key_events(key(KeyCode::Left)).unwrap();
        palette.handle_key_events(key(KeyCode::Char('ü'))).unwrap();
        assert_eq!(palette.buffer, "éüb");
        palette.handle_key_events(key(KeyCode::Backspace)).unwrap();
        assert_eq!(palette.buffer, "éb");
    }

    #[test]
    fn test_backspace_edits_the_buffer() {
        let (mut palette, _rx) = palette_in_mode(Mode::Command);
        palette.handle_key_events(key(KeyCode::Char('a'))).unwrap();
        palette.handle_key_events(key(KeyCode::Char('b'))).unwrap();
        palette.handle_key_events(key(KeyCode::Backspace)).unwrap();
        assert_eq!(palette.buffer, "a");
    }
}
