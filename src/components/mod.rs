pub mod command_palette;
pub mod issue_list;
pub mod keystrokes;
pub mod notification_list;
pub mod pull_request_info_overlay;
pub mod pull_request_list;
pub mod repo_list;
pub mod toasts;
pub mod utils;
pub mod workflow_list;

use std::{any::Any, sync::Arc};

use color_eyre::eyre::Result;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    action::Action,
    config::Config,
    event::AppEvent,
    github::client::GithubApi,
    tui::{Event, Frame},
};

/// A visual and/or logical unit of the application. Components receive every
/// action broadcast by the app and draw themselves into the frame; most hooks
/// are optional.
pub trait Component {
    #[allow(unused_variables)]
    fn init(&mut self, area: Rect) -> Result<()> {
        Ok(())
    }

    #[allow(unused_variables)]
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        Ok(())
    }

    #[allow(unused_variables)]
    fn register_event_handler(&mut self, tx: UnboundedSender<AppEvent>) -> Result<()> {
        Ok(())
    }

    #[allow(unused_variables)]
    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        Ok(())
    }

    /// Hands the component a shared API client; list components build their
    /// page-fetch closures from it.
    #[allow(unused_variables)]
    fn register_api_handler(&mut self, api: Arc<dyn GithubApi>) -> Result<()> {
        Ok(())
    }

    fn handle_events(&mut self, event: Option<Event>) -> Result<Option<Action>> {
        let r = match event {
            Some(Event::Key(key_event)) => self.handle_key_events(key_event)?,
            Some(Event::Mouse(mouse_event)) => self.handle_mouse_events(mouse_event)?,
            _ => None,
        };
        Ok(r)
    }

    #[allow(unused_variables)]
    fn handle_key_events(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    #[allow(unused_variables)]
    fn handle_mouse_events(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    #[allow(unused_variables)]
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn is_active(&self) -> bool {
        true
    }
}
