//! The pull requests pane for the selected repository, with an info overlay
//! and merge/create commands.

use std::{any::Any, sync::Arc};

use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::{
    pull_request_info_overlay::PullRequestInfoOverlay,
    toasts::Toast,
    utils::{centered_rect, sortable_header},
    Component,
};
use crate::{
    action::{Action, Pane},
    cache::{CacheScope, TableCache},
    colors::{ACTIVE_BORDER_COLOR, BG_COLOR, BODY_COLOR, INACTIVE_BORDER_COLOR},
    config::Config,
    github::{
        client::GithubApi,
        models::{IssueOrPullRequest, PullRequest, Repository},
    },
    table::{result_set::TableRecord, LazyTable},
    tui::Frame,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PrCommand {
    Merge,
    NewPr { head: String, title: String },
}

fn parse_command(input: &str) -> Option<PrCommand> {
    let (verb, rest) = match input.trim().split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input.trim(), ""),
    };
    match verb {
        "merge" if rest.is_empty() => Some(PrCommand::Merge),
        "new-pr" => {
            let (head, title) = rest.split_once(' ')?;
            let title = title.trim();
            if title.is_empty() {
                return None;
            }
            Some(PrCommand::NewPr { head: head.to_string(), title: title.to_string() })
        },
        _ => None,
    }
}

pub struct PullRequestList {
    command_tx: Option<UnboundedSender<Action>>,
    config: Config,
    api: Option<Arc<dyn GithubApi>>,
    repo: Option<Repository>,
    table: LazyTable<PullRequest>,
    table_state: TableState,
    selected_column: usize,
    overlay: PullRequestInfoOverlay,
    show_info_overlay: bool,
    active: bool,
}

impl PullRequestList {
    pub fn new(config: &Config) -> Self {
        let table = LazyTable::new(
            TableCache::new(config.cache_dir()),
            CacheScope::Global,
            "pull_requests",
            0,
            true,
            config.settings.page_size,
            config.settings.load_buffer,
        );
        Self {
            command_tx: None,
            config: config.clone(),
            api: None,
            repo: None,
            table,
            table_state: TableState::default(),
            selected_column: 0,
            overlay: PullRequestInfoOverlay::new(),
            show_info_overlay: false,
            active: false,
        }
    }

    fn spawn_fetch(&self, page: usize) {
        let (Some(api), Some(repo), Some(tx)) = (self.api.clone(), self.repo.clone(), self.command_tx.clone()) else {
            return;
        };
        let per_page = self.table.batch_size();
        let state = self.config.settings.state_filter;
        let owner = self.config.settings.owner_filter;
        tokio::spawn(async move {
            match api.list_issues(&repo, state, owner, page, per_page).await {
                Ok(items) => {
                    let _ = tx.send(Action::PullRequestsLoaded(repo.full_name.clone(), items));
                },
                Err(err) => {
                    let _ = tx.send(Action::PullRequestsLoadFailed(
                        repo.full_name.clone(),
                        format!("Failed to load pull requests: {err}"),
                    ));
                },
            }
        });
    }

    fn is_current_repo(&self, full_name: &str) -> bool {
        self.repo.as_ref().is_some_and(|repo| repo.full_name == full_name)
    }

    fn maybe_fetch_more(&mut self) {
        if self.api.is_none() || self.repo.is_none() {
            return;
        }
        if let Some(page) = self.table.request_batch() {
            self.spawn_fetch(page);
        }
    }

    fn refresh(&mut self) {
        if self.api.is_none() || self.repo.is_none() {
            return;
        }
        if let Some(page) = self.table.request_refresh() {
            self.spawn_fetch(page);
        }
    }

    fn open_info_overlay(&mut self) -> Result<()> {
        let Some(pr) = self.table.selected().cloned() else { return Ok(()) };
        self.show_info_overlay = true;
        let number = pr.issue.number;
        self.overlay.update(Action::ShownPullRequestChanged(Box::new(pr)))?;

        let (Some(api), Some(repo), Some(tx)) = (self.api.clone(), self.repo.clone(), self.command_tx.clone()) else {
            return Ok(());
        };
        tokio::spawn(async move {
            let details = match api.get_full_pull_request(&repo, number).await {
                Ok(details) => details,
                Err(err) => {
                    let _ = tx.send(Action::Error(format!("Failed to load #{number}: {err}")));
                    return;
                },
            };
            let reviews = match api.get_reviews(&repo, number).await {
                Ok(reviews) => reviews,
                Err(err) => {
                    let _ = tx.send(Action::Error(format!("Failed to load reviews for #{number}: {err}")));
                    return;
                },
            };
            let _ = tx.send(Action::PullRequestDetailsLoaded(Box::new(details), reviews));
        });
        Ok(())
    }

    fn run_command(&mut self, command: PrCommand) -> Result<()> {
        let (Some(api), Some(repo), Some(tx)) = (self.api.clone(), self.repo.clone(), self.command_tx.clone()) else {
            return Ok(());
        };
        match command {
            PrCommand::Merge => {
                let Some(number) = self.table.selected().map(|pr| pr.issue.number) else {
                    tx.send(Action::Notify(Toast::Warning("No pull request selected".into())))?;
                    return Ok(());
                };
                let method = self.config.settings.preferred_merge_method;
                tokio::spawn(async move {
                    let result = async {
                        let full = api.get_full_pull_request(&repo, number).await?;
                        api.merge_pull_request(&full, &repo, method).await
                    }
                    .await;
                    match result {
                        Ok(merge) => {
                            let _ = tx.send(Action::PullRequestMerged(merge));
                        },
                        Err(err) => {
                            let _ = tx.send(Action::Error(format!("Failed to merge #{number}: {err}")));
                        },
                    }
                });
            },
            PrCommand::NewPr { head, title } => {
                tokio::spawn(async move {
                    let base = repo.default_branch.clone();
                    match api.create_pull_request(&repo, &title, "", &base, &head, false).await {
                        Ok(pr) => {
                            let _ = tx.send(Action::PullRequestCreated(Box::new(pr)));
                        },
                        Err(err) => {
                            let _ = tx.send(Action::Error(format!("Failed to create pull request: {err}")));
                        },
                    }
                });
            },
        }
        Ok(())
    }

    fn render_placeholder(&self, f: &mut Frame<'_>, area: Rect) {
        let text = Paragraph::new(match &self.repo {
            Some(repo) => format!("Loading pull requests for {}...", repo.full_name),
            None => String::from("Select a repository first (:repos)"),
        })
        .style(Style::default().fg(BODY_COLOR))
        .alignment(Alignment::Center);
        f.render_widget(text, centered_rect(area, 100, 10))
    }
}

impl Component for PullRequestList {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.config = config;
        Ok(())
    }

    fn register_api_handler(&mut self, api: Arc<dyn GithubApi>) -> Result<()> {
        self.api = Some(api);
        Ok(())
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        // Overlay-bound actions take priority while it is shown.
        if self.show_info_overlay && self.active {
            match action {
                Action::Escape | Action::Back | Action::Info => {
                    self.show_info_overlay = false;
                    return Ok(Some(Action::Render));
                },
                Action::Up | Action::Down | Action::PageUp | Action::PageDn | Action::Open => {
                    self.overlay.update(action)?;
                    return Ok(Some(Action::Render));
                },
                _ => {},
            }
        }
        match action {
            Action::ShowPane(pane) => self.active = pane == Pane::PullRequests,
            Action::SelectRepo(repo) => {
                debug!("Pull requests pane switching to {}", repo.full_name);
                self.show_info_overlay = false;
                self.table.set_scope(CacheScope::repo(&repo.full_name));
                self.repo = Some(repo);
                self.table.hydrate_from_cache();
                self.refresh();
                return Ok(Some(Action::Render));
            },
            Action::PullRequestsLoaded(repo_name, items) => {
                // A page that raced a repo switch belongs to the old scope.
                if !self.is_current_repo(&repo_name) {
                    debug!("Dropping a stale pull requests page for {repo_name}");
                    return Ok(None);
                }
                let fetched = items.len();
                let prs: Vec<PullRequest> =
                    items.into_iter().filter_map(IssueOrPullRequest::into_pull_request).collect();
                debug!("Loaded {} pull requests out of a page of {fetched}", prs.len());
                self.table.finish_load_counted(fetched, prs);
                return Ok(Some(Action::Render));
            },
            Action::PullRequestsLoadFailed(repo_name, err) => {
                if self.is_current_repo(&repo_name) {
                    self.table.abort_load();
                    return Ok(Some(Action::Error(err)));
                }
            },
            Action::PullRequestDetailsLoaded(..) => {
                self.overlay.update(action)?;
                return Ok(Some(Action::Render));
            },
            Action::PullRequestCreated(pr) => {
                let number = pr.pull.issue.number;
                self.table.add_item(pr.pull);
                if let Some(tx) = &self.command_tx {
                    tx.send(Action::Notify(Toast::Info(format!("Created pull request #{number}"))))?;
                }
                return Ok(Some(Action::Render));
            },
            Action::PullRequestMerged(result) => {
                if let Some(tx) = &self.command_tx {
                    let toast = if result.merged {
                        Toast::Info(result.message)
                    } else {
                        Toast::Warning(result.message)
                    };
                    tx.send(Action::Notify(toast))?;
                }
                self.refresh();
                return Ok(Some(Action::Render));
            },
            Action::Error(_) => {
                self.overlay.update(action)?;
            },
            Action::Refresh if self.active => self.refresh(),
            Action::ExecuteSearch(query) if self.active => {
                self.table.apply_search(&query);
                return Ok(Some(Action::Render));
            },
            Action::ExecuteCommand(input) if self.active => {
                match parse_command(&input) {
                    Some(command) => self.run_command(command)?,
                    None if !crate::app::is_global_command(&input) => {
                        if let Some(tx) = &self.command_tx {
                            tx.send(Action::Notify(Toast::Warning(format!("Unknown command: {input}"))))?;
                        }
                    },
                    None => {},
                }
            },
            Action::Info if self.active => {
                self.open_info_overlay()?;
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
                self.table.set_sort(self.selected_column, self.selected_column == 0);
                return Ok(Some(Action::Render));
            },
            Action::Right if self.active => {
                self.selected_column = std::cmp::min(self.selected_column + 1, PullRequest::header().len() - 1);
                self.table.set_sort(self.selected_column, self.selected_column == 0);
                return Ok(Some(Action::Render));
            },
            Action::Open if self.active => {
                if let Some(pr) = self.table.selected() {
                    let _ = open::that(pr.issue.html_url.clone());
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
        let title = match &self.repo {
            Some(repo) => format!(" Pull requests ({}) ", repo.full_name),
            None => String::from(" Pull requests "),
        };
        let table = Table::default()
            .widths(Constraint::from_lengths([5, 6, 60, 16, 10, 10]))
            .rows(rows)
            .column_spacing(1)
            .header(Row::new(sortable_header(PullRequest::header(), self.selected_column)).bottom_margin(1))
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(if self.active { ACTIVE_BORDER_COLOR } else { INACTIVE_BORDER_COLOR })
                    .style(Style::default().bg(BG_COLOR).fg(BODY_COLOR)),
            )
            .highlight_style(Style::new().reversed().add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, area, &mut self.table_state);

        if self.show_info_overlay {
            self.overlay.draw(f, centered_rect(area, 80, 80))?;
        }
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
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn test_list(dir: &std::path::Path) -> PullRequestList {
        let mut config = Config::default();
        config.settings.cache_dir = Some(dir.into());
        let mut list = PullRequestList::new(&config);
        list.active = true;
        list.table.set_scope(CacheScope::repo("octo/repo"));
        list.repo = Some(repo("octo/repo"));
        list
    }

    fn repo(full_name: &str) -> Repository {
        Repository {
            name: full_name.split('/').next_back().unwrap_or_default().to_string(),
            full_name: full_name.to_string(),
            default_branch: "main".into(),
            private: false,
            archived: false,
            owner: crate::github::models::User { login: "octo".into(), id: 1, name: None, html_url: String::new() },
            description: None,
            favorited: false,
        }
    }

    fn raw_item(number: u64, pull_request: bool) -> IssueOrPullRequest {
        let mut raw = json!({
            "id": number + 1000,
            "number": number,
            "state": "open",
            "title": format!("Item {number}"),
            "user": {"login": "octocat", "id": 1},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
        });
        if pull_request {
            raw["draft"] = json!(false);
        }
        IssueOrPullRequest::from_value(raw).unwrap()
    }

    #[test]
    fn test_loaded_page_keeps_only_pull_requests() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path());
        list.update(Action::PullRequestsLoaded(
            "octo/repo".into(),
            vec![raw_item(1, true), raw_item(2, false), raw_item(3, true)],
        ))
        .unwrap();
        assert_eq!(list.table.len(), 2);
        assert!(list.table.is_exhausted());
    }

    #[test]
    fn test_stale_page_for_another_repo_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path());
        list.update(Action::SelectRepo(repo("octo/new"))).unwrap();

        list.update(Action::PullRequestsLoaded("octo/repo".into(), vec![raw_item(1, true)])).unwrap();
        assert_eq!(list.table.len(), 0);
        assert_eq!(list.table.current_batch(), 0);
        assert!(!dir.path().join("octo_new_pull_requests.json").exists());
    }

    #[rstest]
    #[case(Action::Info)]
    #[case(Action::Escape)]
    #[case(Action::Back)]
    fn test_dismiss_info_overlay_actions(#[case] action: Action) {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path());
        list.update(Action::PullRequestsLoaded("octo/repo".into(), vec![raw_item(1, true)])).unwrap();
        list.update(Action::Info).unwrap();
        assert!(list.show_info_overlay);

        list.update(action).unwrap();
        assert!(!list.show_info_overlay);
    }

    #[rstest]
    #[case("merge", Some(PrCommand::Merge))]
    #[case("merge now", None)]
    #[case("new-pr feature-branch Add the thing", Some(PrCommand::NewPr { head: "feature-branch".into(), title: "Add the thing".into() }))]
    #[case("new-pr feature-branch", None)]
    #[case("dispatch", None)]
    fn test_parse_command(#[case] input: &str, #[case] expected: Option<PrCommand>) {
        assert_eq!(parse_command(input), expected);
    }
}
