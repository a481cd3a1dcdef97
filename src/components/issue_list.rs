//! The issues pane for the selected repository. The backing endpoint returns
//! issues and pull requests interleaved; this pane keeps the issues and lets
//! the raw page length drive pagination.

use std::{any::Any, sync::Arc};

use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::{
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
        models::{Issue, IssueOrPullRequest, Repository},
    },
    table::{result_set::TableRecord, LazyTable},
    tui::Frame,
};

/// Palette commands this pane responds to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IssueCommand {
    NewIssue(String),
    Comment(String),
}

fn parse_command(input: &str) -> Option<IssueCommand> {
    let (verb, rest) = match input.trim().split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input.trim(), ""),
    };
    match verb {
        "new-issue" if !rest.is_empty() => Some(IssueCommand::NewIssue(rest.to_string())),
        "comment" if !rest.is_empty() => Some(IssueCommand::Comment(rest.to_string())),
        _ => None,
    }
}

pub struct IssueList {
    command_tx: Option<UnboundedSender<Action>>,
    config: Config,
    api: Option<Arc<dyn GithubApi>>,
    repo: Option<Repository>,
    table: LazyTable<Issue>,
    table_state: TableState,
    selected_column: usize,
    active: bool,
}

impl IssueList {
    pub fn new(config: &Config) -> Self {
        let table = LazyTable::new(
            TableCache::new(config.cache_dir()),
            CacheScope::Global,
            "issues",
            0,
            // Highest issue number first.
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
                    let _ = tx.send(Action::IssuesLoaded(repo.full_name.clone(), items));
                },
                Err(err) => {
                    let _ = tx.send(Action::IssuesLoadFailed(
                        repo.full_name.clone(),
                        format!("Failed to load issues: {err}"),
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

    fn run_command(&mut self, command: IssueCommand) -> Result<()> {
        let (Some(api), Some(repo), Some(tx)) = (self.api.clone(), self.repo.clone(), self.command_tx.clone()) else {
            return Ok(());
        };
        match command {
            IssueCommand::NewIssue(title) => {
                tokio::spawn(async move {
                    match api.create_issue(&repo, &title, "").await {
                        Ok(issue) => {
                            let _ = tx.send(Action::IssueCreated(issue));
                        },
                        Err(err) => {
                            let _ = tx.send(Action::Error(format!("Failed to create issue: {err}")));
                        },
                    }
                });
            },
            IssueCommand::Comment(body) => {
                let Some(number) = self.table.selected().map(|issue| issue.number) else {
                    tx.send(Action::Notify(Toast::Warning("No issue selected".into())))?;
                    return Ok(());
                };
                tokio::spawn(async move {
                    match api.create_comment(&repo, number, &body).await {
                        Ok(_) => {
                            let _ = tx.send(Action::Notify(Toast::Info(format!("Commented on #{number}"))));
                        },
                        Err(err) => {
                            let _ = tx.send(Action::Error(format!("Failed to comment on #{number}: {err}")));
                        },
                    }
                });
            },
        }
        Ok(())
    }

    fn render_placeholder(&self, f: &mut Frame<'_>, area: Rect) {
        let text = Paragraph::new(match &self.repo {
            Some(repo) => format!("Loading issues for {}...", repo.full_name),
            None => String::from("Select a repository first (:repos)"),
        })
        .style(Style::default().fg(BODY_COLOR))
        .alignment(Alignment::Center);
        f.render_widget(text, centered_rect(area, 100, 10))
    }
}

impl Component for IssueList {
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
        match action {
            Action::ShowPane(pane) => self.active = pane == Pane::Issues,
            Action::SelectRepo(repo) => {
                debug!("Issues pane switching to {}", repo.full_name);
                self.table.set_scope(CacheScope::repo(&repo.full_name));
                self.repo = Some(repo);
                self.table.hydrate_from_cache();
                self.refresh();
                return Ok(Some(Action::Render));
            },
            Action::IssuesLoaded(repo_name, items) => {
                // A page that raced a repo switch belongs to the old scope.
                if !self.is_current_repo(&repo_name) {
                    debug!("Dropping a stale issues page for {repo_name}");
                    return Ok(None);
                }
                let fetched = items.len();
                let issues: Vec<Issue> = items.into_iter().filter_map(IssueOrPullRequest::into_issue).collect();
                debug!("Loaded {} issues out of a page of {fetched}", issues.len());
                self.table.finish_load_counted(fetched, issues);
                return Ok(Some(Action::Render));
            },
            Action::IssuesLoadFailed(repo_name, err) => {
                if self.is_current_repo(&repo_name) {
                    self.table.abort_load();
                    return Ok(Some(Action::Error(err)));
                }
            },
            Action::IssueCreated(issue) => {
                let number = issue.number;
                self.table.add_item(issue);
                if let Some(tx) = &self.command_tx {
                    tx.send(Action::Notify(Toast::Info(format!("Created issue #{number}"))))?;
                }
                return Ok(Some(Action::Render));
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
                self.selected_column = std::cmp::min(self.selected_column + 1, Issue::header().len() - 1);
                self.table.set_sort(self.selected_column, self.selected_column == 0);
                return Ok(Some(Action::Render));
            },
            Action::Open if self.active => {
                if let Some(issue) = self.table.selected() {
                    let _ = open::that(issue.html_url.clone());
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
            Some(repo) => format!(" Issues ({}) ", repo.full_name),
            None => String::from(" Issues "),
        };
        let table = Table::default()
            .widths(Constraint::from_lengths([5, 6, 60, 16, 10, 10, 8]))
            .rows(rows)
            .column_spacing(1)
            .header(Row::new(sortable_header(Issue::header(), self.selected_column)).bottom_margin(1))
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

    fn test_list(dir: &std::path::Path, full_name: &str) -> IssueList {
        let mut config = Config::default();
        config.settings.cache_dir = Some(dir.into());
        let mut list = IssueList::new(&config);
        list.table.set_scope(CacheScope::repo(full_name));
        list.repo = Some(repo(full_name));
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
    fn test_loaded_page_keeps_issues_and_counts_the_raw_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), "octo/repo");
        list.update(Action::IssuesLoaded(
            "octo/repo".into(),
            vec![raw_item(1, false), raw_item(2, true), raw_item(3, false)],
        ))
        .unwrap();
        // The pull request is dropped but the page of 3 still counts as short.
        assert_eq!(list.table.len(), 2);
        assert!(list.table.is_exhausted());
        assert_eq!(list.table.current_batch(), 1);
    }

    #[test]
    fn test_selecting_a_repo_clears_the_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), "octo/old");
        list.update(Action::IssuesLoaded("octo/old".into(), vec![raw_item(1, false)])).unwrap();
        assert_eq!(list.table.len(), 1);

        list.update(Action::SelectRepo(repo("octo/new"))).unwrap();
        assert_eq!(list.table.len(), 0);
        assert_eq!(list.table.current_batch(), 0);
    }

    #[test]
    fn test_stale_page_for_another_repo_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), "octo/old");
        list.update(Action::SelectRepo(repo("octo/new"))).unwrap();

        // A page fetched for the old repo lands after the switch.
        list.update(Action::IssuesLoaded("octo/old".into(), vec![raw_item(1, false)])).unwrap();
        assert_eq!(list.table.len(), 0);
        assert_eq!(list.table.current_batch(), 0);
        // And nothing was snapshotted into the new repo's cache file.
        assert!(!dir.path().join("octo_new_issues.json").exists());
    }

    #[test]
    fn test_only_own_failures_release_the_fetch_guard() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), "octo/repo");
        assert_eq!(list.table.request_batch(), Some(1));

        // Neither another pane's error nor a stale failure touches the guard.
        list.update(Action::Error("workflows went sideways".into())).unwrap();
        list.update(Action::IssuesLoadFailed("octo/other".into(), "rate limited".into())).unwrap();
        assert_eq!(list.table.request_batch(), None);

        // This pane's own failure releases it and surfaces the error.
        let forwarded = list.update(Action::IssuesLoadFailed("octo/repo".into(), "rate limited".into())).unwrap();
        assert_eq!(forwarded, Some(Action::Error("rate limited".into())));
        assert_eq!(list.table.request_batch(), Some(1));
    }

    #[rstest]
    #[case("new-issue fix the flaky test", Some(IssueCommand::NewIssue("fix the flaky test".into())))]
    #[case("comment looks good to me", Some(IssueCommand::Comment("looks good to me".into())))]
    #[case("new-issue", None)]
    #[case("merge", None)]
    #[case("", None)]
    fn test_parse_command(#[case] input: &str, #[case] expected: Option<IssueCommand>) {
        assert_eq!(parse_command(input), expected);
    }
}
