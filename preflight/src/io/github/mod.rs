//! GitHub API abstraction.
//!
//! The [`GithubApi`] trait decouples the pipeline from the REST transport.
//! [`rest::RestGithub`] talks to the real API; tests use the recording fake in
//! `test_support`.

pub mod rest;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::context::Repository;

/// The issue or pull request a run is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityData {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub author: String,
    pub state: String,
    pub is_pr: bool,
    /// Pull request only.
    pub head_ref: Option<String>,
    pub head_sha: Option<String>,
    pub base_ref: Option<String>,
    pub merged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueComment {
    pub id: u64,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewComment {
    pub id: u64,
    pub author: String,
    pub path: String,
    pub line: Option<u64>,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub id: u64,
    pub author: String,
    pub state: String,
    pub body: String,
}

/// Everything prompt generation may read about the entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GithubData {
    pub entity: EntityData,
    pub comments: Vec<IssueComment>,
    pub review_comments: Vec<ReviewComment>,
    pub changed_files: Vec<ChangedFile>,
    pub reviews: Vec<ReviewSummary>,
}

/// Parameters of `POST /repos/{owner}/{repo}/pulls/{number}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewCommentParams {
    pub path: String,
    pub body: String,
    pub commit_id: String,
    pub line: u64,
    pub side: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_side: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CreatedReviewComment {
    pub id: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub line: Option<u64>,
}

/// Blocking GitHub operations the pipeline needs.
pub trait GithubApi {
    /// Collaborator permission of `actor` (`admin`, `write`, `read`, `none`).
    fn permission_level(&self, repo: &Repository, actor: &str) -> Result<String>;

    fn default_branch(&self, repo: &Repository) -> Result<String>;

    fn fetch_data(&self, repo: &Repository, number: u64, is_pr: bool) -> Result<GithubData>;

    fn list_issue_comments(&self, repo: &Repository, number: u64) -> Result<Vec<IssueComment>>;

    fn create_issue_comment(&self, repo: &Repository, number: u64, body: &str)
    -> Result<IssueComment>;

    fn update_issue_comment(
        &self,
        repo: &Repository,
        comment_id: u64,
        body: &str,
    ) -> Result<IssueComment>;

    /// Current head commit SHA of a pull request.
    fn pull_request_head_sha(&self, repo: &Repository, number: u64) -> Result<String>;

    fn create_review_comment(
        &self,
        repo: &Repository,
        number: u64,
        params: &ReviewCommentParams,
    ) -> Result<CreatedReviewComment>;
}

impl<T: GithubApi + ?Sized> GithubApi for &T {
    fn permission_level(&self, repo: &Repository, actor: &str) -> Result<String> {
        (**self).permission_level(repo, actor)
    }

    fn default_branch(&self, repo: &Repository) -> Result<String> {
        (**self).default_branch(repo)
    }

    fn fetch_data(&self, repo: &Repository, number: u64, is_pr: bool) -> Result<GithubData> {
        (**self).fetch_data(repo, number, is_pr)
    }

    fn list_issue_comments(&self, repo: &Repository, number: u64) -> Result<Vec<IssueComment>> {
        (**self).list_issue_comments(repo, number)
    }

    fn create_issue_comment(
        &self,
        repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<IssueComment> {
        (**self).create_issue_comment(repo, number, body)
    }

    fn update_issue_comment(
        &self,
        repo: &Repository,
        comment_id: u64,
        body: &str,
    ) -> Result<IssueComment> {
        (**self).update_issue_comment(repo, comment_id, body)
    }

    fn pull_request_head_sha(&self, repo: &Repository, number: u64) -> Result<String> {
        (**self).pull_request_head_sha(repo, number)
    }

    fn create_review_comment(
        &self,
        repo: &Repository,
        number: u64,
        params: &ReviewCommentParams,
    ) -> Result<CreatedReviewComment> {
        (**self).create_review_comment(repo, number, params)
    }
}

/// Write access means `admin` or `write` collaborator permission.
pub fn has_write_permission(api: &dyn GithubApi, repo: &Repository, actor: &str) -> Result<bool> {
    let level = api.permission_level(repo, actor)?;
    let allowed = matches!(level.as_str(), "admin" | "write");
    tracing::debug!(actor, permission = %level, allowed, "checked actor permission");
    Ok(allowed)
}
