use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{
    config::{OwnerFilter, StateFilter},
    github::models::{
        FullPullRequest, Issue, IssueComment, IssueOrPullRequest, MergeMethod, Notification, PullRequestMergeResult,
        Repository, Review, ReviewComment, User, Workflow, WorkflowRun,
    },
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("github request failed: {0}")]
    Request(#[from] octocrab::Error),
    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("authentication unavailable: {0}")]
    Auth(String),
    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Everything the UI needs from the GitHub REST API. Kept as a trait so list
/// components can be driven by a stub in tests.
#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn current_user(&self) -> Result<User, ApiError>;

    async fn list_repositories(&self, page: usize, per_page: usize) -> Result<Vec<Repository>, ApiError>;

    async fn get_repository(&self, full_name: &str) -> Result<Repository, ApiError>;

    /// Lists issues AND pull requests; GitHub interleaves them in one
    /// endpoint and the split into a tagged union happens here.
    async fn list_issues(
        &self,
        repo: &Repository,
        state: StateFilter,
        owner: OwnerFilter,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<IssueOrPullRequest>, ApiError>;

    async fn get_full_pull_request(&self, repo: &Repository, number: u64) -> Result<FullPullRequest, ApiError>;

    async fn get_reviews(&self, repo: &Repository, number: u64) -> Result<Vec<Review>, ApiError>;

    async fn create_issue(&self, repo: &Repository, title: &str, body: &str) -> Result<Issue, ApiError>;

    async fn create_comment(&self, repo: &Repository, number: u64, body: &str) -> Result<IssueComment, ApiError>;

    async fn create_pull_request(
        &self,
        repo: &Repository,
        title: &str,
        body: &str,
        base_ref: &str,
        head_ref: &str,
        draft: bool,
    ) -> Result<FullPullRequest, ApiError>;

    async fn merge_pull_request(
        &self,
        pr: &FullPullRequest,
        repo: &Repository,
        method: MergeMethod,
    ) -> Result<PullRequestMergeResult, ApiError>;

    async fn list_workflows(&self, repo: &Repository, page: usize, per_page: usize) -> Result<Vec<Workflow>, ApiError>;

    async fn list_workflow_runs(
        &self,
        repo: &Repository,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkflowRun>, ApiError>;

    async fn dispatch_workflow(&self, repo: &Repository, workflow: &Workflow, ref_name: &str) -> Result<(), ApiError>;

    async fn list_notifications(
        &self,
        all: bool,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<Notification>, ApiError>;

    async fn mark_notification_read(&self, thread_id: &str) -> Result<(), ApiError>;
}

pub struct RestGithubClient {
    oc: Octocrab,
}

impl RestGithubClient {
    /// Builds a client from `GITHUB_TOKEN`, falling back to whatever token
    /// the `gh` CLI has cached.
    pub async fn from_env() -> Result<Self, ApiError> {
        let token = match std::env::var("GITHUB_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => gh_cli_token().await?,
        };
        let oc = Octocrab::builder().personal_token(token).build()?;
        Ok(Self { oc })
    }
}

/// Shells out to the standard GitHub CLI for a token when `GITHUB_TOKEN` is
/// not set.
async fn gh_cli_token() -> Result<String, ApiError> {
    let output = tokio::process::Command::new("gh").args(["auth", "token"]).output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::Auth("GITHUB_TOKEN is not set and the gh CLI is not installed".into())
        } else {
            ApiError::Auth(format!("failed to run gh: {e}"))
        }
    })?;
    if !output.status.success() {
        return Err(ApiError::Auth("GITHUB_TOKEN is not set and `gh auth token` returned nothing".into()));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ApiError::Auth("`gh auth token` produced an empty token".into()));
    }
    Ok(token)
}

#[async_trait]
impl GithubApi for RestGithubClient {
    async fn current_user(&self) -> Result<User, ApiError> {
        let user: User = self.oc.get("/user", None::<&()>).await?;
        Ok(user)
    }

    async fn list_repositories(&self, page: usize, per_page: usize) -> Result<Vec<Repository>, ApiError> {
        debug!("Listing repositories (page: {page}, per_page: {per_page})");
        let url = format!("/user/repos?sort=full_name&direction=asc&page={page}&per_page={per_page}");
        let repos: Vec<Repository> = self.oc.get(&url, None::<&()>).await?;
        Ok(repos)
    }

    async fn get_repository(&self, full_name: &str) -> Result<Repository, ApiError> {
        let repo: Repository = self.oc.get(format!("/repos/{full_name}"), None::<&()>).await?;
        Ok(repo)
    }

    async fn list_issues(
        &self,
        repo: &Repository,
        state: StateFilter,
        owner: OwnerFilter,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<IssueOrPullRequest>, ApiError> {
        debug!("Listing issues for {} (state: {state}, page: {page})", repo.full_name);
        let mut url = format!("/repos/{}/issues?state={state}&page={page}&per_page={per_page}", repo.full_name);
        if owner == OwnerFilter::Mine {
            let user = self.current_user().await?;
            url.push_str(&format!("&creator={}", user.login));
        }
        let raw: Vec<serde_json::Value> = self.oc.get(&url, None::<&()>).await?;
        raw.into_iter().map(|value| IssueOrPullRequest::from_value(value).map_err(ApiError::from)).collect()
    }

    async fn get_full_pull_request(&self, repo: &Repository, number: u64) -> Result<FullPullRequest, ApiError> {
        let url = format!("/repos/{}/pulls/{number}", repo.full_name);
        let pr: FullPullRequest = self.oc.get(&url, None::<&()>).await?;
        Ok(pr)
    }

    async fn get_reviews(&self, repo: &Repository, number: u64) -> Result<Vec<Review>, ApiError> {
        let url = format!("/repos/{}/pulls/{number}/reviews", repo.full_name);
        let mut reviews: Vec<Review> = self.oc.get(&url, None::<&()>).await?;
        // The review comments live on a separate endpoint, keyed by review.
        for review in reviews.iter_mut() {
            let url = format!("/repos/{}/pulls/{number}/reviews/{}/comments", repo.full_name, review.id);
            let comments: Vec<ReviewComment> = self.oc.get(&url, None::<&()>).await?;
            review.comments = comments;
        }
        Ok(reviews)
    }

    async fn create_issue(&self, repo: &Repository, title: &str, body: &str) -> Result<Issue, ApiError> {
        let url = format!("/repos/{}/issues", repo.full_name);
        let request_body = json!({ "title": title, "body": body });
        let issue: Issue = self.oc.post(&url, Some(&request_body)).await?;
        Ok(issue)
    }

    async fn create_comment(&self, repo: &Repository, number: u64, body: &str) -> Result<IssueComment, ApiError> {
        let url = format!("/repos/{}/issues/{number}/comments", repo.full_name);
        let comment: IssueComment = self.oc.post(&url, Some(&json!({ "body": body }))).await?;
        Ok(comment)
    }

    async fn create_pull_request(
        &self,
        repo: &Repository,
        title: &str,
        body: &str,
        base_ref: &str,
        head_ref: &str,
        draft: bool,
    ) -> Result<FullPullRequest, ApiError> {
        let url = format!("/repos/{}/pulls", repo.full_name);
        let request_body = json!({
            "title": title,
            "body": body,
            "draft": draft,
            "base": base_ref,
            "head": format!("{}:{}", repo.owner.login, head_ref),
        });
        let pr: FullPullRequest = self.oc.post(&url, Some(&request_body)).await?;
        Ok(pr)
    }

    async fn merge_pull_request(
        &self,
        pr: &FullPullRequest,
        repo: &Repository,
        method: MergeMethod,
    ) -> Result<PullRequestMergeResult, ApiError> {
        let url = format!("/repos/{}/pulls/{}/merge", repo.full_name, pr.pull.issue.number);
        // The head sha must still match or GitHub rejects the merge.
        let body = json!({ "merge_method": method.to_string(), "sha": pr.head.sha });
        let result: PullRequestMergeResult = self.oc.put(&url, Some(&body)).await?;
        Ok(result)
    }

    async fn list_workflows(&self, repo: &Repository, page: usize, per_page: usize) -> Result<Vec<Workflow>, ApiError> {
        #[derive(Deserialize)]
        struct WorkflowsResponse {
            #[serde(default)]
            workflows: Vec<Workflow>,
        }
        let url = format!("/repos/{}/actions/workflows?page={page}&per_page={per_page}", repo.full_name);
        let response: WorkflowsResponse = self.oc.get(&url, None::<&()>).await?;
        Ok(response.workflows)
    }

    async fn list_workflow_runs(
        &self,
        repo: &Repository,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<WorkflowRun>, ApiError> {
        #[derive(Deserialize)]
        struct WorkflowRunsResponse {
            #[serde(default)]
            workflow_runs: Vec<WorkflowRun>,
        }
        let url = format!("/repos/{}/actions/runs?page={page}&per_page={per_page}", repo.full_name);
        let response: WorkflowRunsResponse = self.oc.get(&url, None::<&()>).await?;
        Ok(response.workflow_runs)
    }

    async fn dispatch_workflow(&self, repo: &Repository, workflow: &Workflow, ref_name: &str) -> Result<(), ApiError> {
        debug!("Dispatching workflow {} on {} at {ref_name}", workflow.name, repo.full_name);
        self.oc
            .actions()
            .create_workflow_dispatch(&repo.owner.login, &repo.name, workflow.id.to_string(), ref_name)
            .send()
            .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        all: bool,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<Notification>, ApiError> {
        let url = format!("/notifications?all={all}&page={page}&per_page={per_page}");
        let notifications: Vec<Notification> = self.oc.get(&url, None::<&()>).await?;
        Ok(notifications)
    }

    async fn mark_notification_read(&self, thread_id: &str) -> Result<(), ApiError> {
        let id: u64 = thread_id
            .parse()
            .map_err(|_| ApiError::Invalid(format!("notification thread id is not numeric: {thread_id}")))?;
        self.oc.activity().notifications().mark_as_read(id.into()).await?;
        Ok(())
    }
}
