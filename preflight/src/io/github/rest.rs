//! Blocking REST implementation of [`GithubApi`].

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::{
    ChangedFile, CreatedReviewComment, EntityData, GithubApi, GithubData, IssueComment,
    ReviewComment, ReviewCommentParams, ReviewSummary,
};
use crate::core::context::Repository;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize, Default)]
struct ApiUser {
    #[serde(default)]
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiRef {
    #[serde(default, rename = "ref")]
    name: String,
    #[serde(default)]
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiPull {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    head: ApiRef,
    #[serde(default)]
    base: ApiRef,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct ApiReviewComment {
    id: u64,
    #[serde(default)]
    body: String,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    path: String,
    #[serde(default)]
    line: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    filename: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiReview {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
    #[serde(default)]
    state: String,
}

fn login(user: Option<ApiUser>) -> String {
    user.map(|u| u.login).unwrap_or_default()
}

impl From<ApiComment> for IssueComment {
    fn from(c: ApiComment) -> Self {
        Self {
            id: c.id,
            author: login(c.user),
            body: c.body.unwrap_or_default(),
            created_at: c.created_at,
        }
    }
}

/// GitHub REST client authenticated with a bearer token.
pub struct RestGithub {
    http: Client,
    api_base: String,
}

impl RestGithub {
    pub fn new(api_base: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("preflight"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_header).context("invalid github authorization header")?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, repo: &Repository, rest: &str) -> String {
        format!("{}/repos/{}/{}{rest}", self.api_base, repo.owner, repo.repo)
    }

    fn request_json<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .with_context(|| format!("github api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "github api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        response
            .json::<T>()
            .with_context(|| format!("failed to decode github {operation}"))
    }

    fn paginate<T: DeserializeOwned>(&self, operation: &str, url: &str) -> Result<Vec<T>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let per_page = PER_PAGE.to_string();
            let chunk: Vec<T> = self.request_json(
                operation,
                self.http
                    .get(url)
                    .query(&[("per_page", per_page.as_str()), ("page", page_value.as_str())]),
            )?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < PER_PAGE {
                break;
            }
            page = page.saturating_add(1);
        }
        debug!(operation, rows = rows.len(), "fetched paginated rows");
        Ok(rows)
    }

    fn fetch_issue(&self, repo: &Repository, number: u64) -> Result<EntityData> {
        let issue: ApiIssue = self.request_json(
            "get issue",
            self.http.get(self.repo_url(repo, &format!("/issues/{number}"))),
        )?;
        Ok(EntityData {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            author: login(issue.user),
            state: issue.state,
            is_pr: false,
            ..EntityData::default()
        })
    }

    fn fetch_pull(&self, repo: &Repository, number: u64) -> Result<EntityData> {
        let pull: ApiPull = self.request_json(
            "get pull request",
            self.http.get(self.repo_url(repo, &format!("/pulls/{number}"))),
        )?;
        Ok(EntityData {
            number: pull.number,
            title: pull.title,
            body: pull.body,
            author: login(pull.user),
            state: pull.state,
            is_pr: true,
            head_ref: Some(pull.head.name),
            head_sha: Some(pull.head.sha),
            base_ref: Some(pull.base.name),
            merged: pull.merged,
        })
    }
}

impl GithubApi for RestGithub {
    #[instrument(skip_all, fields(repo = %repo.full_name, actor = %actor))]
    fn permission_level(&self, repo: &Repository, actor: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Permission {
            permission: String,
        }
        let response: Permission = self.request_json(
            "get collaborator permission",
            self.http
                .get(self.repo_url(repo, &format!("/collaborators/{actor}/permission"))),
        )?;
        Ok(response.permission)
    }

    #[instrument(skip_all, fields(repo = %repo.full_name))]
    fn default_branch(&self, repo: &Repository) -> Result<String> {
        #[derive(Deserialize)]
        struct Repo {
            default_branch: String,
        }
        let response: Repo =
            self.request_json("get repository", self.http.get(self.repo_url(repo, "")))?;
        Ok(response.default_branch)
    }

    #[instrument(skip_all, fields(repo = %repo.full_name, number = number, is_pr = is_pr))]
    fn fetch_data(&self, repo: &Repository, number: u64, is_pr: bool) -> Result<GithubData> {
        let comments = self.list_issue_comments(repo, number)?;
        if !is_pr {
            return Ok(GithubData {
                entity: self.fetch_issue(repo, number)?,
                comments,
                ..GithubData::default()
            });
        }

        let entity = self.fetch_pull(repo, number)?;
        let review_comments: Vec<ApiReviewComment> = self.paginate(
            "list review comments",
            &self.repo_url(repo, &format!("/pulls/{number}/comments")),
        )?;
        let files: Vec<ApiFile> = self.paginate(
            "list pull request files",
            &self.repo_url(repo, &format!("/pulls/{number}/files")),
        )?;
        let reviews: Vec<ApiReview> = self.paginate(
            "list reviews",
            &self.repo_url(repo, &format!("/pulls/{number}/reviews")),
        )?;

        Ok(GithubData {
            entity,
            comments,
            review_comments: review_comments
                .into_iter()
                .map(|c| ReviewComment {
                    id: c.id,
                    author: login(c.user),
                    path: c.path,
                    line: c.line,
                    body: c.body,
                })
                .collect(),
            changed_files: files
                .into_iter()
                .map(|f| ChangedFile {
                    filename: f.filename,
                    status: f.status,
                    additions: f.additions,
                    deletions: f.deletions,
                    sha: f.sha,
                })
                .collect(),
            reviews: reviews
                .into_iter()
                .map(|r| ReviewSummary {
                    id: r.id,
                    author: login(r.user),
                    state: r.state,
                    body: r.body.unwrap_or_default(),
                })
                .collect(),
        })
    }

    fn list_issue_comments(&self, repo: &Repository, number: u64) -> Result<Vec<IssueComment>> {
        let rows: Vec<ApiComment> = self.paginate(
            "list issue comments",
            &self.repo_url(repo, &format!("/issues/{number}/comments")),
        )?;
        Ok(rows.into_iter().map(IssueComment::from).collect())
    }

    #[instrument(skip_all, fields(repo = %repo.full_name, number = number))]
    fn create_issue_comment(
        &self,
        repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<IssueComment> {
        let created: ApiComment = self.request_json(
            "create issue comment",
            self.http
                .post(self.repo_url(repo, &format!("/issues/{number}/comments")))
                .json(&json!({ "body": body })),
        )?;
        Ok(created.into())
    }

    #[instrument(skip_all, fields(repo = %repo.full_name, comment_id = comment_id))]
    fn update_issue_comment(
        &self,
        repo: &Repository,
        comment_id: u64,
        body: &str,
    ) -> Result<IssueComment> {
        let updated: ApiComment = self.request_json(
            "update issue comment",
            self.http
                .patch(self.repo_url(repo, &format!("/issues/comments/{comment_id}")))
                .json(&json!({ "body": body })),
        )?;
        Ok(updated.into())
    }

    fn pull_request_head_sha(&self, repo: &Repository, number: u64) -> Result<String> {
        let pull = self.fetch_pull(repo, number)?;
        pull.head_sha
            .filter(|sha| !sha.is_empty())
            .with_context(|| format!("pull request #{number} has no head commit"))
    }

    #[instrument(skip_all, fields(repo = %repo.full_name, number = number, path = %params.path))]
    fn create_review_comment(
        &self,
        repo: &Repository,
        number: u64,
        params: &ReviewCommentParams,
    ) -> Result<CreatedReviewComment> {
        self.request_json(
            "create review comment",
            self.http
                .post(self.repo_url(repo, &format!("/pulls/{number}/comments")))
                .json(params),
        )
    }
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
