use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::Rect;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, trace};

use crate::{
    action::{Action, Pane},
    components::{
        command_palette::CommandPalette, issue_list::IssueList, keystrokes::Keystrokes,
        notification_list::NotificationList, pull_request_list::PullRequestList, repo_list::RepoList, toasts::Toasts,
        workflow_list::WorkflowList, Component,
    },
    config::Config,
    event::AppEvent,
    github::client::{GithubApi, RestGithubClient},
    mode::Mode,
    tui,
};

/// Palette commands handled by the app itself rather than a pane.
pub fn pane_for_command(cmd: &str) -> Option<Pane> {
    match cmd {
        "repos" | "repositories" => Some(Pane::Repos),
        "issues" => Some(Pane::Issues),
        "prs" | "pulls" => Some(Pane::PullRequests),
        "workflows" | "actions" => Some(Pane::Workflows),
        "notifications" | "notifs" => Some(Pane::Notifications),
        _ => None,
    }
}

pub fn is_global_command(cmd: &str) -> bool {
    matches!(cmd, "q" | "quit" | "exit") || pane_for_command(cmd).is_some()
}

pub struct App {
    pub config: Config,
    pub tick_rate: f64,
    pub frame_rate: f64,
    pub should_quit: bool,
    pub should_suspend: bool,
    mode: Mode,
    pane: Pane,
    pub last_tick_key_events: Vec<KeyEvent>,
    action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
    event_tx: UnboundedSender<AppEvent>,
    event_rx: UnboundedReceiver<AppEvent>,
    components: Vec<Box<dyn Component>>,
}

impl App {
    pub fn new(tick_rate: f64, frame_rate: f64) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let config = Config::new()?;

        let components: Vec<Box<dyn Component>> = vec![
            Box::new(RepoList::new(&config)),
            Box::new(IssueList::new(&config)),
            Box::new(PullRequestList::new(&config)),
            Box::new(WorkflowList::new(&config)),
            Box::new(NotificationList::new(&config)),
            Box::new(CommandPalette::new()),
            Box::new(Toasts::new()),
            Box::new(Keystrokes::default()),
        ];

        Ok(Self {
            tick_rate,
            frame_rate,
            components,
            should_quit: false,
            should_suspend: false,
            config,
            mode: Mode::Normal,
            pane: Pane::Repos,
            last_tick_key_events: Vec::new(),
            action_tx,
            action_rx,
            event_tx,
            event_rx,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let action_tx = self.action_tx.clone();
        let event_tx = self.event_tx.clone();

        let api: Arc<dyn GithubApi> = Arc::new(RestGithubClient::from_env().await?);

        let mut tui = tui::Tui::new()?.tick_rate(self.tick_rate).frame_rate(self.frame_rate);
        tui.enter()?;

        for component in self.components.iter_mut() {
            component.register_action_handler(action_tx.clone())?;
        }

        for component in self.components.iter_mut() {
            component.register_event_handler(event_tx.clone())?;
        }

        for component in self.components.iter_mut() {
            component.register_config_handler(self.config.clone())?;
        }

        for component in self.components.iter_mut() {
            component.register_api_handler(api.clone())?;
        }

        for component in self.components.iter_mut() {
            component.init(tui.size()?)?;
        }

        // Identify the authenticated user in the background.
        {
            let api = api.clone();
            let tx = action_tx.clone();
            tokio::spawn(async move {
                match api.current_user().await {
                    Ok(user) => {
                        let _ = tx.send(Action::CurrentUserLoaded(user.login));
                    },
                    Err(err) => {
                        let _ = tx.send(Action::Error(format!("Failed to identify user: {err}")));
                    },
                }
            });
        }

        loop {
            if let Some(e) = tui.next().await {
                match e {
                    tui::Event::Quit => action_tx.send(Action::Quit)?,
                    tui::Event::Tick => action_tx.send(Action::Tick)?,
                    tui::Event::Render => action_tx.send(Action::Render)?,
                    tui::Event::Resize(x, y) => action_tx.send(Action::Resize(x, y))?,
                    tui::Event::Key(key) => {
                        if let Some(keymap) = self.config.keybindings.get(&self.mode) {
                            if let Some(action) = keymap.get(&vec![key]) {
                                action_tx.send(action.clone())?;
                            } else {
                                // If the key was not handled as a single key action,
                                // then consider it for multi-key combinations.
                                self.last_tick_key_events.push(key);

                                if let Some(action) = keymap.get(&self.last_tick_key_events) {
                                    action_tx.send(action.clone())?;
                                }
                            }
                        };
                    },
                    _ => {},
                }
                for component in self.components.iter_mut() {
                    if let Some(action) = component.handle_events(Some(e.clone()))? {
                        action_tx.send(action)?;
                    }
                }
            }

            while let Ok(event) = self.event_rx.try_recv() {
                trace!("{event:?}");
                match event {
                    AppEvent::CommandPaletteOpened => debug!("Command palette opened"),
                    AppEvent::CommandPaletteClosed => self.mode = Mode::Normal,
                }
            }

            while let Ok(action) = self.action_rx.try_recv() {
                if action != Action::Tick && action != Action::Render {
                    debug!("{action:?}");
                }
                match action {
                    Action::Tick => {
                        self.last_tick_key_events.drain(..);
                    },
                    Action::Quit => self.should_quit = true,
                    Action::Suspend => self.should_suspend = true,
                    Action::Resume => self.should_suspend = false,
                    Action::Resize(w, h) => {
                        tui.resize(Rect::new(0, 0, w, h))?;
                        self.draw(&mut tui)?;
                    },
                    Action::Render => {
                        self.draw(&mut tui)?;
                    },
                    Action::EnterCommandMode => {
                        action_tx.send(Action::ChangeMode(Mode::Command))?;
                    },
                    Action::EnterSearchMode => {
                        action_tx.send(Action::ChangeMode(Mode::Search))?;
                    },
                    Action::ChangeMode(mode) => {
                        self.mode = mode;
                    },
                    Action::ShowPane(pane) => {
                        debug!("Switching from {} to {pane}", self.pane);
                        self.pane = pane;
                    },
                    Action::CurrentUserLoaded(ref login) => {
                        info!("Authenticated as {login}");
                    },
                    Action::ExecuteCommand(ref cmd) => {
                        match cmd.as_str() {
                            "q" | "quit" | "exit" => self.should_quit = true,
                            cmd => {
                                if let Some(pane) = pane_for_command(cmd) {
                                    action_tx.send(Action::ShowPane(pane))?;
                                    action_tx.send(Action::Render)?;
                                }
                                // Anything else is offered to the active pane.
                            },
                        }
                    },
                    Action::Error(ref err) => {
                        error!("{err}");
                    },
                    _ => {},
                }
                for component in self.components.iter_mut() {
                    if let Some(action) = component.update(action.clone())? {
                        action_tx.send(action)?
                    };
                }
            }

            if self.should_suspend {
                tui.suspend()?;
                action_tx.send(Action::Resume)?;
                tui = tui::Tui::new()?.tick_rate(self.tick_rate).frame_rate(self.frame_rate);
                tui.enter()?;
            } else if self.should_quit {
                tui.stop()?;
                break;
            }
        }
        tui.exit()?;
        Ok(())
    }

    fn draw(&mut self, tui: &mut tui::Tui) -> Result<()> {
        let action_tx = self.action_tx.clone();
        tui.draw(|f| {
            for component in self.components.iter_mut() {
                let r = component.draw(f, f.size());
                if let Err(e) = r {
                    let _ = action_tx.send(Action::Error(format!("Failed to draw: {:?}", e)));
                }
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("repos", Some(Pane::Repos))]
    #[case("repositories", Some(Pane::Repos))]
    #[case("issues", Some(Pane::Issues))]
    #[case("prs", Some(Pane::PullRequests))]
    #[case("pulls", Some(Pane::PullRequests))]
    #[case("workflows", Some(Pane::Workflows))]
    #[case("notifications", Some(Pane::Notifications))]
    #[case("merge", None)]
    fn test_pane_for_command(#[case] cmd: &str, #[case] expected: Option<Pane>) {
        assert_eq!(pane_for_command(cmd), expected);
    }

    #[rstest]
    #[case("quit", true)]
    #[case("issues", true)]
    #[case("new-issue something", false)]
    fn test_is_global_command(#[case] cmd: &str, #[case] expected: bool) {
        assert_eq!(is_global_command(cmd), expected);
    }
}
