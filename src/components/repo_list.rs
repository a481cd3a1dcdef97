//! The repositories pane. Globally cached, favorites pinned to the top, and
//! the entry point into everything repo-scoped: selecting a row broadcasts
//! the repository to the other panes.

use std::{any::Any, sync::Arc};

use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::{
    utils::{centered_rect, sortable_header},
    Component,
};
use crate::{
    action::{Action, Pane},
    cache::{CacheScope, TableCache},
    colors::{ACTIVE_BORDER_COLOR, BG_COLOR, BODY_COLOR, INACTIVE_BORDER_COLOR},
    config::{get_keybinding_for_action, key_event_to_string, Config},
    github::{client::GithubApi, models::Repository},
    mode::Mode,
    table::{result_set::TableRecord, LazyTable, PendingFetch},
    tui::Frame,
};

pub struct RepoList {
    command_tx: Option<UnboundedSender<Action>>,
    config: Config,
    api: Option<Arc<dyn GithubApi>>,
    table: LazyTable<Repository>,
    table_state: TableState,
    selected_column: usize,
    active: bool,
}

impl RepoList {
    pub fn new(config: &Config) -> Self {
        let table = LazyTable::new(
            TableCache::new(config.cache_dir()),
            CacheScope::Global,
            "repos",
            2,
            false,
            config.settings.page_size,
            config.settings.load_buffer,
        );
        Self {
            command_tx: None,
            config: config.clone(),
            api: None,
            table,
            table_state: TableState::default(),
            selected_column: 2,
            active: true,
        }
    }

    fn spawn(&self, fetch: PendingFetch<Repository>) {
        let Some(tx) = self.command_tx.clone() else { return };
        let page = fetch.batch;
        tokio::spawn(async move {
            match fetch.run().await {
                Ok(repos) => {
                    let _ = tx.send(Action::ReposLoaded(repos));
                },
                Err(err) => {
                    let _ = tx.send(Action::ReposLoadFailed(format!("Failed to load repositories page {page}: {err}")));
                },
            }
        });
    }

    fn maybe_fetch_more(&mut self) {
        if let Some(fetch) = self.table.start_load() {
            self.spawn(fetch);
        }
    }

    fn refresh(&mut self) {
        if let Some(fetch) = self.table.start_refresh() {
            self.spawn(fetch);
        }
    }

    fn mark_favorites(&self, repos: &mut [Repository]) {
        for repo in repos.iter_mut() {
            repo.favorited = self.config.settings.favorites.iter().any(|f| f == &repo.full_name);
        }
    }

    fn render_placeholder(&self, f: &mut Frame<'_>, area: Rect) {
        let text = Paragraph::new(
            if let Some(refresh_key) =
                get_keybinding_for_action(&self.config.keybindings, Mode::Normal, &Action::Refresh)
            {
                format!("Loading repositories... (or press '{}' to retry)", key_event_to_string(&refresh_key[0]))
            } else {
                String::from("Loading repositories...")
            },
        )
        .style(Style::default().fg(BODY_COLOR))
        .alignment(Alignment::Center);
        f.render_widget(text, centered_rect(area, 100, 10))
    }
}

impl Component for RepoList {
    fn init(&mut self, _area: Rect) -> Result<()> {
        self.table.hydrate_from_cache();
        self.refresh();
        Ok(())
    }

    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.config = config;
        Ok(())
    }

    fn register_api_handler(&mut self, api: Arc<dyn GithubApi>) -> Result<()> {
        let load_api = api.clone();
        self.table.set_load_fn(Arc::new(move |per_page, page| {
            let api = load_api.clone();
            Box::pin(async move { api.list_repositories(page, per_page).await })
        }));
        self.api = Some(api);
        Ok(())
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::ShowPane(pane) => self.active = pane == Pane::Repos,
            Action::ReposLoaded(mut repos) => {
                debug!("Loaded {} repositories", repos.len());
                self.mark_favorites(&mut repos);
                self.table.finish_load(repos);
                return Ok(Some(Action::Render));
            },
            Action::ReposLoadFailed(err) => {
                self.table.abort_load();
                return Ok(Some(Action::Error(err)));
            },
            Action::Refresh if self.active => self.refresh(),
            Action::ExecuteSearch(query) if self.active => {
                self.table.apply_search(&query);
                return Ok(Some(Action::Render));
            },
            Action::Up if self.active => {
                self.table.cursor_up(1);
                return Ok(Some(Action::Render));
            },
            Action::Down if self.active => {
                self.table.cursor_down(1);
                self.maybe_fetch_more();
                return Ok(Some(Action::Render));
            },
            Action::PageUp if self.active => {
                self.table.cursor_up(10);
                return Ok(Some(Action::Render));
            },
            Action::PageDn if self.active => {
                self.table.cursor_down(10);
                self.maybe_fetch_more();
                return Ok(Some(Action::Render));
            },
            Action::Left if self.active => {
                self.selected_column = self.selected_column.saturating_sub(1);
                self.table.set_sort(self.selected_column, false);
                return Ok(Some(Action::Render));
            },
            Action::Right if self.active => {
                self.selected_column = std::cmp::min(self.selected_column + 1, Repository::header().len() - 1);
                self.table.set_sort(self.selected_column, false);
                return Ok(Some(Action::Render));
            },
            Action::Enter if self.active => {
                if let Some(repo) = self.table.selected().cloned() {
                    debug!("Selected repository {}", repo.full_name);
                    if let Some(tx) = &self.command_tx {
                        tx.send(Action::ShowPane(Pane::Issues))?;
                    }
                    return Ok(Some(Action::SelectRepo(repo)));
                }
            },
            Action::Open if self.active => {
                if let Some(repo) = self.table.selected() {
                    let _ = open::that(format!("https://github.com/{}", repo.full_name));
                }
            },
            _ => {},
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let area = Rect { height: area.height.saturating_sub(1), ..area };
        let rows: Vec<Row> = self.table.visible().iter().map(|r| r.row()).collect();
        if rows.is_empty() {
            self.render_placeholder(f, area);
            return Ok(());
        }
        self.table_state.select(Some(self.table.selected_row()));
        let table = Table::default()
            .widths(Constraint::from_lengths([2, 7, 40, 16, 60]))
            .rows(rows)
            .column_spacing(1)
            .header(
                Row::new(sortable_header(Repository::header(), self.selected_column)).bottom_margin(1),
            )
            .block(
                Block::default()
                    .title(" Repositories ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(if self.active { ACTIVE_BORDER_COLOR } else { INACTIVE_BORDER_COLOR })
                    .style(Style::default().bg(BG_COLOR).fg(BODY_COLOR)),
            )
            .highlight_style(Style::new().reversed().add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, area, &mut self.table_state);
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
