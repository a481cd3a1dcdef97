//! Serde models for the subset of the GitHub REST API that lazygh consumes.
//!
//! These are our own shapes rather than octocrab's so that the same structs
//! can round-trip through the table cache files.

use std::cmp::Ordering;

use ratatui::{
    style::Style,
    widgets::{Cell, Row},
};
use serde::{Deserialize, Serialize};

use crate::{
    colors::{BLUE_COLOR, GREEN_COLOR, PINK_COLOR, RED_COLOR, YELLOW_COLOR},
    table::result_set::TableRecord,
};

type DateTime = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
    pub owner: User,
    #[serde(default)]
    pub description: Option<String>,
    /// Not part of the API response; set from the favorites list in the user
    /// configuration after loading.
    #[serde(default)]
    pub favorited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    #[serde(default)]
    pub comments: u64,
    pub state: IssueState,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: User,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    #[serde(default)]
    pub closed_at: Option<DateTime>,
    #[serde(default)]
    pub html_url: String,
}

/// A pull request as returned by the list-issues endpoint; a superset of
/// [`Issue`] that is still missing the diff-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    #[serde(flatten)]
    pub issue: Issue,
    pub draft: bool,
}

/// The complete pull request shape from the get-pull-request endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPullRequest {
    #[serde(flatten)]
    pub pull: PullRequest,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub commits: u64,
    pub head: Ref,
    pub base: Ref,
    #[serde(default)]
    pub merged_at: Option<DateTime>,
    #[serde(default)]
    pub diff_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// The list-issues endpoint returns issues and pull requests interleaved in
/// one response. The split happens here, at the response boundary, so nothing
/// downstream ever sniffs for a `draft` field again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IssueOrPullRequest {
    Issue(Issue),
    PullRequest(PullRequest),
}

impl IssueOrPullRequest {
    pub fn from_value(raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        if raw.get("pull_request").is_some() || raw.get("draft").is_some() {
            Ok(Self::PullRequest(serde_json::from_value(raw)?))
        } else {
            Ok(Self::Issue(serde_json::from_value(raw)?))
        }
    }

    pub fn into_issue(self) -> Option<Issue> {
        match self {
            Self::Issue(issue) => Some(issue),
            Self::PullRequest(_) => None,
        }
    }

    pub fn into_pull_request(self) -> Option<PullRequest> {
        match self {
            Self::PullRequest(pr) => Some(pr),
            Self::Issue(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    #[serde(default)]
    pub user: Option<User>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    #[serde(flatten)]
    pub comment: IssueComment,
    pub pull_request_review_id: u64,
    pub path: String,
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(default)]
    pub in_reply_to_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub user: User,
    #[serde(default)]
    pub body: String,
    pub state: ReviewState,
    #[serde(default)]
    pub comments: Vec<ReviewComment>,
    #[serde(default)]
    pub submitted_at: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MergeMethod {
    Merge,
    #[default]
    Squash,
    Rebase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestMergeResult {
    #[serde(default)]
    pub sha: Option<String>,
    pub merged: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub run_number: u64,
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    pub head_branch: String,
    pub event: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub unread: bool,
    pub reason: String,
    pub updated_at: DateTime,
    pub subject: NotificationSubject,
    pub repository: NotificationRepository,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSubject {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRepository {
    pub full_name: String,
}

const IS_FAVORITED: &str = "★";
const IS_NOT_FAVORITED: &str = "☆";
const IS_PRIVATE: &str = "✔";
const IS_PUBLIC: &str = "✘";

fn short_date(date: &DateTime) -> String {
    format!("{}", date.format("%Y-%m-%d"))
}

impl TableRecord for Repository {
    fn key(&self) -> String {
        self.full_name.clone()
    }

    fn header() -> Vec<&'static str> {
        vec!["★", "Private", "Repository", "Default branch", "Description"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            if self.favorited { IS_FAVORITED } else { IS_NOT_FAVORITED }.to_string(),
            if self.private { IS_PRIVATE } else { IS_PUBLIC }.to_string(),
            self.full_name.clone(),
            self.default_branch.clone(),
            self.description.clone().unwrap_or_default(),
        ]
    }

    fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering {
        // Favorites sort before everything else regardless of column.
        other.favorited.cmp(&self.favorited).then_with(|| {
            match column {
                1 => self.private.cmp(&other.private),
                3 => self.default_branch.cmp(&other.default_branch),
                _ => self.full_name.cmp(&other.full_name),
            }
        })
    }

    fn row(&self) -> Row<'_> {
        let mut cells: Vec<Cell> = self.cells().into_iter().map(Cell::from).collect();
        if self.favorited {
            cells[0] = Cell::from(IS_FAVORITED).style(Style::new().fg(YELLOW_COLOR));
        }
        Row::new(cells)
    }
}

impl TableRecord for Issue {
    fn key(&self) -> String {
        self.number.to_string()
    }

    fn header() -> Vec<&'static str> {
        vec!["#", "State", "Title", "Author", "Created", "Updated", "Comments"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.number.to_string(),
            self.state.to_string(),
            self.title.clone(),
            self.user.login.clone(),
            short_date(&self.created_at),
            short_date(&self.updated_at),
            self.comments.to_string(),
        ]
    }

    fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering {
        match column {
            1 => self.state.cmp(&other.state),
            2 => self.title.cmp(&other.title),
            3 => self.user.login.cmp(&other.user.login),
            4 => self.created_at.cmp(&other.created_at),
            5 => self.updated_at.cmp(&other.updated_at),
            6 => self.comments.cmp(&other.comments),
            _ => self.number.cmp(&other.number),
        }
    }

    fn row(&self) -> Row<'_> {
        let mut cells: Vec<Cell> = self.cells().into_iter().map(Cell::from).collect();
        cells[1] = Cell::from(self.state.to_string()).style(Style::new().fg(match self.state {
            IssueState::Open => GREEN_COLOR,
            IssueState::Closed => RED_COLOR,
        }));
        Row::new(cells)
    }
}

impl PullRequest {
    fn state_label(&self) -> &'static str {
        match (self.issue.state, self.draft) {
            (IssueState::Open, true) => "DRAFT",
            (IssueState::Open, false) => "OPEN",
            (IssueState::Closed, _) => "CLOSED",
        }
    }
}

impl TableRecord for PullRequest {
    fn key(&self) -> String {
        self.issue.number.to_string()
    }

    fn header() -> Vec<&'static str> {
        vec!["#", "State", "Title", "Author", "Created", "Updated"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.issue.number.to_string(),
            self.state_label().to_string(),
            self.issue.title.clone(),
            self.issue.user.login.clone(),
            short_date(&self.issue.created_at),
            short_date(&self.issue.updated_at),
        ]
    }

    fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering {
        match column {
            1 => self.state_label().cmp(other.state_label()),
            2 => self.issue.title.cmp(&other.issue.title),
            3 => self.issue.user.login.cmp(&other.issue.user.login),
            4 => self.issue.created_at.cmp(&other.issue.created_at),
            5 => self.issue.updated_at.cmp(&other.issue.updated_at),
            _ => self.issue.number.cmp(&other.issue.number),
        }
    }

    fn row(&self) -> Row<'_> {
        let mut cells: Vec<Cell> = self.cells().into_iter().map(Cell::from).collect();
        cells[1] = Cell::from(self.state_label()).style(Style::new().fg(match (self.issue.state, self.draft) {
            (IssueState::Open, true) => BLUE_COLOR,
            (IssueState::Open, false) => GREEN_COLOR,
            (IssueState::Closed, _) => RED_COLOR,
        }));
        Row::new(cells)
    }
}

impl TableRecord for Workflow {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn header() -> Vec<&'static str> {
        vec!["Name", "Path", "State"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), self.path.clone(), self.state.clone()]
    }

    fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering {
        match column {
            1 => self.path.cmp(&other.path),
            2 => self.state.cmp(&other.state),
            _ => self.name.cmp(&other.name),
        }
    }
}

impl TableRecord for WorkflowRun {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn header() -> Vec<&'static str> {
        vec!["Run", "Workflow", "Status", "Branch", "Event", "Updated"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.run_number.to_string(),
            self.name.clone().unwrap_or_default(),
            self.conclusion.clone().unwrap_or_else(|| self.status.clone()),
            self.head_branch.clone(),
            self.event.clone(),
            short_date(&self.updated_at),
        ]
    }

    fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering {
        match column {
            1 => self.name.cmp(&other.name),
            2 => self.status.cmp(&other.status),
            3 => self.head_branch.cmp(&other.head_branch),
            4 => self.event.cmp(&other.event),
            5 => self.updated_at.cmp(&other.updated_at),
            _ => self.run_number.cmp(&other.run_number),
        }
    }

    fn row(&self) -> Row<'_> {
        let mut cells: Vec<Cell> = self.cells().into_iter().map(Cell::from).collect();
        let status = self.conclusion.as_deref().unwrap_or(&self.status);
        cells[2] = Cell::from(status.to_string()).style(Style::new().fg(match status {
            "success" => GREEN_COLOR,
            "failure" => RED_COLOR,
            "in_progress" | "queued" => YELLOW_COLOR,
            _ => BLUE_COLOR,
        }));
        Row::new(cells)
    }
}

impl TableRecord for Notification {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn header() -> Vec<&'static str> {
        vec!["Unread", "Repository", "Type", "Reason", "Title", "Updated"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            if self.unread { "●" } else { "" }.to_string(),
            self.repository.full_name.clone(),
            self.subject.kind.clone(),
            self.reason.clone(),
            self.subject.title.clone(),
            short_date(&self.updated_at),
        ]
    }

    fn cmp_by_column(&self, other: &Self, column: usize) -> Ordering {
        match column {
            1 => self.repository.full_name.cmp(&other.repository.full_name),
            2 => self.subject.kind.cmp(&other.subject.kind),
            3 => self.reason.cmp(&other.reason),
            4 => self.subject.title.cmp(&other.subject.title),
            _ => self.updated_at.cmp(&other.updated_at),
        }
    }

    fn row(&self) -> Row<'_> {
        let mut cells: Vec<Cell> = self.cells().into_iter().map(Cell::from).collect();
        if self.unread {
            cells[0] = Cell::from("●").style(Style::new().fg(PINK_COLOR));
        }
        Row::new(cells)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn raw_issue(number: u64) -> serde_json::Value {
        json!({
            "id": number + 1000,
            "number": number,
            "comments": 2,
            "state": "open",
            "title": format!("Issue {number}"),
            "body": "something is broken",
            "user": {"login": "octocat", "id": 1, "html_url": "https://github.com/octocat"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "html_url": format!("https://github.com/octo/repo/issues/{number}"),
        })
    }

    #[test]
    fn test_issue_parses_as_issue() {
        let parsed = IssueOrPullRequest::from_value(raw_issue(12)).unwrap();
        match parsed {
            IssueOrPullRequest::Issue(issue) => assert_eq!(issue.number, 12),
            IssueOrPullRequest::PullRequest(_) => panic!("plain issue parsed as a pull request"),
        }
    }

    #[test]
    fn test_draft_field_marks_a_pull_request() {
        let mut raw = raw_issue(7);
        raw["draft"] = json!(true);
        raw["pull_request"] = json!({"url": "https://api.github.com/repos/octo/repo/pulls/7"});
        let parsed = IssueOrPullRequest::from_value(raw).unwrap();
        match parsed {
            IssueOrPullRequest::PullRequest(pr) => {
                assert_eq!(pr.issue.number, 7);
                assert!(pr.draft);
            },
            IssueOrPullRequest::Issue(_) => panic!("pull request parsed as a plain issue"),
        }
    }

    #[test]
    fn test_pull_request_state_label() {
        let mut raw = raw_issue(3);
        raw["draft"] = json!(true);
        let pr = IssueOrPullRequest::from_value(raw).unwrap().into_pull_request().unwrap();
        assert_eq!(pr.state_label(), "DRAFT");
    }

    #[test]
    fn test_issue_record_key_and_cells() {
        let issue: Issue = serde_json::from_value(raw_issue(42)).unwrap();
        assert_eq!(issue.key(), "42");
        assert_eq!(issue.cells()[2], "Issue 42");
    }
}
