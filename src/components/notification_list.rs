//! The notifications pane. Globally scoped; Enter marks the selected thread
//! read on the server and reflects it locally without waiting for a refresh.

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
    github::{client::GithubApi, models::Notification},
    table::{result_set::TableRecord, LazyTable, PendingFetch},
    tui::Frame,
};

pub struct NotificationList {
    command_tx: Option<UnboundedSender<Action>>,
    config: Config,
    api: Option<Arc<dyn GithubApi>>,
    table: LazyTable<Notification>,
    table_state: TableState,
    selected_column: usize,
    active: bool,
}

impl NotificationList {
    pub fn new(config: &Config) -> Self {
        let table = LazyTable::new(
            TableCache::new(config.cache_dir()),
            CacheScope::Global,
            "notifications",
            // Most recently updated first.
            5,
            true,
            config.settings.page_size,
            config.settings.load_buffer,
        );
        Self {
            command_tx: None,
            config: config.clone(),
            api: None,
            table,
            table_state: TableState::default(),
            selected_column: 5,
            active: false,
        }
    }

    fn spawn(&self, fetch: PendingFetch<Notification>) {
        let Some(tx) = self.command_tx.clone() else { return };
        let page = fetch.batch;
        tokio::spawn(async move {
            match fetch.run().await {
                Ok(notifications) => {
                    let _ = tx.send(Action::NotificationsLoaded(notifications));
                },
                Err(err) => {
                    let _ = tx.send(Action::NotificationsLoadFailed(format!(
                        "Failed to load notifications page {page}: {err}"
                    )));
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

    fn mark_selected_read(&mut self) -> Result<()> {
        let (Some(api), Some(tx)) = (self.api.clone(), self.command_tx.clone()) else { return Ok(()) };
        let Some(notification) = self.table.selected() else { return Ok(()) };
        if !notification.unread {
            return Ok(());
        }
        let thread_id = notification.id.clone();
        tokio::spawn(async move {
            match api.mark_notification_read(&thread_id).await {
                Ok(()) => {
                    let _ = tx.send(Action::NotificationRead(thread_id));
                },
                Err(err) => {
                    let _ = tx.send(Action::Error(format!("Failed to mark notification read: {err}")));
                },
            }
        });
        Ok(())
    }

    fn apply_read(&mut self, thread_id: &str) {
        if self.config.settings.show_read_notifications {
            if let Some(mut notification) = self.table.get(thread_id).cloned() {
                notification.unread = false;
                self.table.add_item(notification);
            }
        } else {
            self.table.remove(thread_id);
        }
    }

    fn render_placeholder(&self, f: &mut Frame<'_>, area: Rect) {
        let text = Paragraph::new("No notifications")
            .style(Style::default().fg(BODY_COLOR))
            .alignment(Alignment::Center);
        f.render_widget(text, centered_rect(area, 100, 10))
    }
}

impl Component for NotificationList {
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
        let all = self.config.settings.show_read_notifications;
        self.table.set_load_fn(Arc::new(move |per_page, page| {
            let api = load_api.clone();
            Box::pin(async move { api.list_notifications(all, page, per_page).await })
        }));
        self.api = Some(api);
        Ok(())
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::ShowPane(pane) => self.active = pane == Pane::Notifications,
            Action::NotificationsLoaded(notifications) => {
                debug!("Loaded {} notifications", notifications.len());
                self.table.finish_load(notifications);
                return Ok(Some(Action::Render));
            },
            Action::NotificationRead(thread_id) => {
                self.apply_read(&thread_id);
                if let Some(tx) = &self.command_tx {
                    tx.send(Action::Notify(Toast::Info("Notification marked read".into())))?;
                }
                return Ok(Some(Action::Render));
            },
            Action::NotificationsLoadFailed(err) => {
                self.table.abort_load();
                return Ok(Some(Action::Error(err)));
            },
            Action::Refresh if self.active => self.refresh(),
            Action::ExecuteSearch(query) if self.active => {
                self.table.apply_search(&query);
                return Ok(Some(Action::Render));
            },
            Action::Enter if self.active => {
                if self.config.settings.mark_notification_read_on_select {
                    self.mark_selected_read()?;
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
                self.table.set_sort(self.selected_column, self.selected_column == 5);
                return Ok(Some(Action::Render));
            },
            Action::Right if self.active => {
                self.selected_column = std::cmp::min(self.selected_column + 1, Notification::header().len() - 1);
                self.table.set_sort(self.selected_column, self.selected_column == 5);
                return Ok(Some(Action::Render));
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
            .widths(Constraint::from_lengths([6, 30, 14, 14, 50, 10]))
            .rows(rows)
            .column_spacing(1)
            .header(Row::new(sortable_header(Notification::header(), self.selected_column)).bottom_margin(1))
            .block(
                Block::default()
                    .title(" Notifications ")
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

    use super::*;
    use crate::github::models::{NotificationRepository, NotificationSubject};

    fn notification(id: &str, unread: bool) -> Notification {
        Notification {
            id: id.to_string(),
            unread,
            reason: "mention".into(),
            updated_at: chrono::Utc::now(),
            subject: NotificationSubject { title: format!("thread {id}"), url: None, kind: "Issue".into() },
            repository: NotificationRepository { full_name: "octo/repo".into() },
        }
    }

    fn test_list(dir: &std::path::Path, show_read: bool) -> NotificationList {
        let mut config = Config::default();
        config.settings.cache_dir = Some(dir.into());
        config.settings.show_read_notifications = show_read;
        NotificationList::new(&config)
    }

    #[test]
    fn test_read_notification_is_removed_when_read_are_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), false);
        list.update(Action::NotificationsLoaded(vec![notification("1", true), notification("2", true)])).unwrap();
        list.apply_read("1");
        assert_eq!(list.table.len(), 1);
        assert!(list.table.get("1").is_none());
    }

    #[test]
    fn test_read_notification_is_kept_when_read_are_shown() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), true);
        list.update(Action::NotificationsLoaded(vec![notification("1", true)])).unwrap();
        list.apply_read("1");
        assert_eq!(list.table.len(), 1);
        assert!(!list.table.get("1").unwrap().unread);
    }

    #[test]
    fn test_only_own_failures_release_the_fetch_guard() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), false);
        assert_eq!(list.table.request_batch(), Some(1));
        list.update(Action::Error("repos went sideways".into())).unwrap();
        assert_eq!(list.table.request_batch(), None);

        let forwarded = list.update(Action::NotificationsLoadFailed("rate limited".into())).unwrap();
        assert_eq!(forwarded, Some(Action::Error("rate limited".into())));
        assert_eq!(list.table.request_batch(), Some(1));
    }

    #[test]
    fn test_marking_an_absent_thread_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = test_list(dir.path(), false);
        list.update(Action::NotificationsLoaded(vec![notification("1", true)])).unwrap();
        list.apply_read("does-not-exist");
        assert_eq!(list.table.len(), 1);
    }
}
