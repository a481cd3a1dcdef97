//! Transient in-app notifications, stacked in the top-right corner and
//! dropped after a few seconds.

use std::{
    any::Any,
    time::{Duration, Instant},
};

use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::Component;
use crate::{
    action::Action,
    colors::{BLUE_COLOR, RED_COLOR, YELLOW_COLOR},
    tui::Frame,
};

const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display, Deserialize)]
pub enum Toast {
    Info(String),
    Warning(String),
    Error(String),
}

impl Toast {
    fn message(&self) -> &str {
        match self {
            Toast::Info(s) | Toast::Warning(s) | Toast::Error(s) => s,
        }
    }

    fn color(&self) -> Color {
        match self {
            Toast::Info(_) => BLUE_COLOR,
            Toast::Warning(_) => YELLOW_COLOR,
            Toast::Error(_) => RED_COLOR,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Toasts {
    toasts: Vec<(Toast, Instant)>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, toast: Toast) {
        self.toasts.push((toast, Instant::now()));
    }

    fn drop_expired(&mut self) {
        self.toasts.retain(|(_, shown_at)| shown_at.elapsed() < TOAST_TTL);
    }
}

impl Component for Toasts {
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::Tick => self.drop_expired(),
            Action::Notify(toast) => self.push(toast),
            Action::Error(message) => self.push(Toast::Error(message)),
            _ => {},
        };
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, rect: Rect) -> Result<()> {
        if self.toasts.is_empty() {
            return Ok(());
        }
        let items = self
            .toasts
            .iter()
            .map(|(toast, _)| {
                ListItem::new(
                    Text::from(toast.message().to_string())
                        .style(Style::default().fg(toast.color()))
                        .alignment(Alignment::Right),
                )
            })
            .collect::<Vec<_>>();
        let width = 50.min(rect.width);
        let rect = Rect::new(rect.width.saturating_sub(width), 0, width, 10.min(rect.height));
        f.render_widget(List::new(items).block(Block::default()), rect);
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
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_notify_and_error_actions_add_toasts() {
        let mut toasts = Toasts::new();
        toasts.update(Action::Notify(Toast::Info("merged".into()))).unwrap();
        toasts.update(Action::Error("request failed".into())).unwrap();
        assert_eq!(toasts.toasts.len(), 2);
        assert_eq!(toasts.toasts[1].0, Toast::Error("request failed".into()));
    }

    #[test]
    fn test_tick_drops_expired_toasts() {
        let mut toasts = Toasts::new();
        toasts.toasts.push((Toast::Info("old".into()), Instant::now() - TOAST_TTL * 2));
        toasts.push(Toast::Info("fresh".into()));
        toasts.update(Action::Tick).unwrap();
        assert_eq!(toasts.toasts.len(), 1);
        assert_eq!(toasts.toasts[0].0, Toast::Info("fresh".into()));
    }
}
