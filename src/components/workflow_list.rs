//! The workflows pane: a lazily paginated table of workflow runs for the
//! selected repository, plus a `:dispatch` command driven by the repository's
//! workflow list.

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
        models::{Repository, Workflow, WorkflowRun},
    },
    table::{result_set::TableRecord, LazyTable, PendingFetch},
    tui::Frame,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct DispatchCommand {
    workflow: String,
    ref_name: Option<String>,
}

fn parse_command(input: &str) -> Option<DispatchCommand> {
    let mut parts = input.trim().split_whitespace();
    if parts.next()? != "dispatch" {
        return None;
    }
    let workflow = parts.next()?.to_string();
    let ref_name = parts.next().map(ToString::to_string);
    if parts.next().is_some() {
        return None;
    }
    Some(DispatchCommand { workflow, ref_name })
}

pub struct WorkflowList {
    command_tx: Option<UnboundedSender<Action>>,
    api: Option<Arc<dyn GithubApi>>,
    repo: Option<Repository>,
    table: LazyTable<WorkflowRun>,
    /// The repository's workflows, fetched once per repo selection; the
    /// lookup target for `:dispatch`.
    workflows: Vec<Workflow>,
    table_state: TableState,
    selected_column: usize,
    active: bool,
}

impl WorkflowList {
    pub fn new(config: &Config) -> Self {
        let table = LazyTable::new(
            TableCache::new(config.cache_dir()),
            CacheScope::Global,
            "workflow_runs",
            0,
            // Newest run first.
            true,
            config.settings.page_size,
            config.settings.load_buffer,
        );
        Self {
            command_tx: None,
            api: None,
            repo: None,
            table,
            workflows: Vec::new(),
            table_state: TableState::default(),
            selected_column: 0,
            active: false,
        }
    }

    fn spawn(&self, fetch: PendingFetch<WorkflowRun>) {
        let Some(tx) = self.command_tx.clone() else { return };
        let Some(repo_name) = self.repo.as_ref().map(|repo| repo.full_name.clone()) else { return };
        let page = fetch.batch;
        tokio::spawn(async move {
            match fetch.run().await {
                Ok(runs) => {
                    let _ = tx.send(Action::WorkflowRunsLoaded(repo_name, runs));
                },
                Err(err) => {
                    let _ = tx.send(Action::WorkflowRunsLoadFailed(
                        repo_name,
                        format!("Failed to load workflow runs page {page}: {err}"),
                    ));
                },
            }
        });
    }

    fn is_current_repo(&self, full_name: &str) -> bool {
        self.repo.as_ref().is_some_and(|repo| repo.full_name == full_name)
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

    fn fetch_workflows(&self) {
        let (Some(api), Some(repo), Some(tx)) = (self.api.clone(), self.repo.clone(), self.command_tx.clone()) else {
            return;
        };
        tokio::spawn(async move {
            // One page is plenty; repositories rarely carry more workflows.
            match api.list_workflows(&repo, 1, 100).await {
                Ok(workflows) => {
                    let _ = tx.send(Action::WorkflowsLoaded(repo.full_name.clone(), workflows));
                },
                Err(err) => {
                    let _ = tx.send(Action::Error(format!("Failed to load workflows: {err}")));
                },
            }
        });
    }

    fn find_workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.name == name || w.path == name || w.path.ends_with(&format!("/{name}")))
    }

    fn run_dispatch(&mut self, command: DispatchCommand) -> Result<()> {
        let (Some(api), Some(repo), Some(tx)) = (self.api.clone(), self.repo.clone(), self.command_tx.clone()) else {
            return Ok(());
        };
        let Some(workflow) = self.find_workflow(&command.workflow).cloned() else {
            tx.send(Action::Notify(Toast::Warning(format!("No workflow named '{}'", command.workflow))))?;
            return Ok(());
        };
        let ref_name = command.ref_name.unwrap_or_else(|| repo.default_branch.clone());
        tokio::spawn(async move {
            match api.dispatch_workflow(&repo, &workflow, &ref_name).await {
                Ok(()) => {
                    let _ = tx.send(Action::WorkflowDispatched(workflow));
                },
                Err(err) => {
                    let _ = tx.send(Action::Error(format!("Failed to dispatch {}: {err}", workflow.name)));
                },
            }
        });
        Ok(())
    }

    fn render_placeholder(&self, f: &mut Frame<'_>, area: Rect) {
        let text = Paragraph::new(match &self.repo {
            Some(repo) => format!("Loading workflow runs for {}...", repo.full_name),
            None => String::from("Select a repository first (:repos)"),
        })
        .style(Style::default().fg(BODY_COLOR))
        .alignment(Alignment::Center);
        f.render_widget(text, centered_rect(area, 100, 10))
    }
}

impl Component for WorkflowList {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn register_api_handler(&mut self, api: Arc<dyn GithubApi>) -> Result<()> {
        self.api = Some(api);
        Ok(())
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::ShowPane(pane) => self.active = pane == Pane::Workflows,
            Action::SelectRepo(repo) => {
                debug!("Workflows pane switching to {}", repo.full_name);
                self.table.set_scope(CacheScope::repo(&repo.full_name));
                self.workflows.clear();

                let load_repo = repo.clone();
                if let Some(api) = self.api.clone() {
                    self.table.set_load_fn(Arc::new(move |per_page, page| {
                        let api = api.clone();
                        let repo = load_repo.clone();
                        Box::pin(async move { api.list_workflow_runs(&repo, page, per_page).await })
                    }));
                }
                self.repo = Some(repo);
                self.table.hydrate_from_cache();
                self.refresh();
                self.fetch_workflows();
                return Ok(Some(Action::Render));
            },
            Action::WorkflowRunsLoaded(repo_name, runs) => {
                // A page that raced a repo switch belongs to the old scope.
                if !self.is_current_repo(&repo_name) {
                    debug!("Dropping a stale workflow runs page for {repo_name}");
                    return Ok(None);
                }
                debug!("Loaded {} workflow runs", runs.len());
                self.table.finish_load(runs);
                return Ok(Some(Action::Render));
            },
            Action::WorkflowRunsLoadFailed(repo_name, err) => {
                if self.is_current_repo(&repo_name) {
                    self.table.abort_load();
                    return Ok(Some(Action::Error(err)));
                }
            },
            Action::WorkflowsLoaded(repo_name, workflows) => {
                if !self.is_current_repo(&repo_name) {
                    return Ok(None);
                }
                debug!("Loaded {} workflows", workflows.len());
                self.workflows = workflows;
            },
            Action::WorkflowDispatched(workflow) => {
                if let Some(tx) = &self.command_tx {
                    tx.send(Action::Notify(Toast::Info(format!("Dispatched {}", workflow.name))))?;
                }
                self.refresh();
                return Ok(Some(Action::Render));
            },
            Action::Refresh if self.active => self.refresh(),
            Action::ExecuteSearch(query) if self.active => {
                self.table.apply_search(&query);
                return Ok(Some(Action::Render));
            },
            Action::ExecuteCommand(input) if self.active => {
                match parse_command(&input) {
                    Some(command) => self.run_dispatch(command)?,
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
                self.selected_column = std::cmp::min(self.selected_column + 1, WorkflowRun::header().len() - 1);
                self.table.set_sort(self.selected_column, self.selected_column == 0);
                return Ok(Some(Action::Render));
            },
            Action::Open if self.active => {
                if let Some(run) = self.table.selected() {
                    let _ = open::that(run.html_url.clone());
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
            Some(repo) => format!(" Workflow runs ({}) ", repo.full_name),
            None => String::from(" Workflow runs "),
        };
        let table = Table::default()
            .widths(Constraint::from_lengths([6, 24, 12, 20, 16, 10]))
            .rows(rows)
            .column_spacing(1)
            .header(Row::new(sortable_header(WorkflowRun::header(), self.selected_column)).bottom_margin(1))
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

    use super::*;

    fn test_list(dir: &std::path::Path) -> WorkflowList {
        let mut config = Config::default();
        config.settings.cache_dir = Some(dir.into());
        let mut list = WorkflowList::new(&config);
        list.table.set_scope(CacheScope::repo("octo/repo"));
        list.repo = Some(Repository {
            name: "repo".into(),
            full_name: "octo/repo".into(),
            default_branch: "main".into(),
            private: false,
            archived: false,
            owner: crate::github::models::User { login: "octo".into(), id: 1, name: None, html_url: String::new() },
            description: None,
            favorited: false,
        });
        list
    }

    fn workflow(name: &str, path: &str) -> Workflow {
        Workflow { id: 7, name: name.into(), path: path.into(), state: "active".into() }
    }

    #[rstest]
    #[case("dispatch ci", Some(DispatchCommand { workflow: "ci".into(), ref_name: None }))]
    #[case("dispatch ci release-1.2", Some(DispatchCommand { workflow: "ci".into(), ref_name: Some("release-1.2".into()) }))]
    #[case("dispatch", None)]
    #[case("dispatch ci main extra", None)]
    #[case("merge", None)]
    fn test_parse_command(#[case] input: &str, #[case] expected: Option<DispatchCommand>) {
        assert_eq!(parse_command(input), expected);
    }

    #[test]
    fn test_find_workflow_matches_name_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path());
        list.workflows = vec![workflow("CI", ".github/workflows/ci.yml")];
        assert!(list.find_workflow("CI").is_some());
        assert!(list.find_workflow("ci.yml").is_some());
        assert!(list.find_workflow(".github/workflows/ci.yml").is_some());
        assert!(list.find_workflow("deploy.yml").is_none());
    }

    #[test]
    fn test_loaded_workflows_are_kept_for_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path());
        list.update(Action::WorkflowsLoaded("octo/repo".into(), vec![workflow("CI", ".github/workflows/ci.yml")]))
            .unwrap();
        assert_eq!(list.workflows.len(), 1);
    }

    #[test]
    fn test_stale_results_for_another_repo_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path());
        list.update(Action::WorkflowsLoaded("octo/other".into(), vec![workflow("CI", ".github/workflows/ci.yml")]))
            .unwrap();
        assert!(list.workflows.is_empty());

        list.update(Action::WorkflowRunsLoaded("octo/other".into(), Vec::new())).unwrap();
        assert_eq!(list.table.current_batch(), 0);
        assert!(!list.table.is_exhausted());
    }
}
