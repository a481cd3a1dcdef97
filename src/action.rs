use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    components::toasts::Toast,
    github::models::{
        FullPullRequest, Issue, IssueOrPullRequest, Notification, PullRequest, PullRequestMergeResult, Repository,
        Review, Workflow, WorkflowRun,
    },
    mode::Mode,
};

/// Which of the main list panes is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Pane {
    Repos,
    Issues,
    PullRequests,
    Workflows,
    Notifications,
}

#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Suspend,
    Resume,
    Quit,
    Refresh,
    Error(String),
    Info,
    Help,

    // navigation
    Up,
    Down,
    Left,
    Right,
    Enter,
    Open,
    Escape,
    Back,
    PageUp,
    PageDn,
    Notify(Toast),

    // modes and panes
    ChangeMode(Mode),
    EnterCommandMode,
    EnterSearchMode,
    ExecuteCommand(String),
    ExecuteSearch(String),
    ShowPane(Pane),

    // ambient selection, injected instead of a global context singleton
    SelectRepo(Repository),
    CurrentUserLoaded(String),

    // page-fetch results and failures, one pair per resource table.
    // Repo-scoped results carry the full_name they were fetched for, so a
    // page that lands after the user switched repositories is dropped
    // instead of merged into the wrong table.
    ReposLoaded(Vec<Repository>),
    ReposLoadFailed(String),
    IssuesLoaded(String, Vec<IssueOrPullRequest>),
    IssuesLoadFailed(String, String),
    PullRequestsLoaded(String, Vec<IssueOrPullRequest>),
    PullRequestsLoadFailed(String, String),
    WorkflowsLoaded(String, Vec<Workflow>),
    WorkflowRunsLoaded(String, Vec<WorkflowRun>),
    WorkflowRunsLoadFailed(String, String),
    NotificationsLoaded(Vec<Notification>),
    NotificationsLoadFailed(String),

    // mutation results
    IssueCreated(Issue),
    PullRequestCreated(Box<FullPullRequest>),
    PullRequestMerged(PullRequestMergeResult),
    PullRequestDetailsLoaded(Box<FullPullRequest>, Vec<Review>),
    NotificationRead(String),
    WorkflowDispatched(Workflow),
    ShownPullRequestChanged(Box<PullRequest>),
}
