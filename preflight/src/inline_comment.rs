//! Inline review comments on a pull request diff.
//!
//! Backs `preflight inline-comment`, the tool the agent uses to leave a single
//! line or line-range comment without being able to approve or reject.

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::context::Repository;
use crate::io::github::{GithubApi, ReviewCommentParams};

/// Diff side: `LEFT` is the old code, `RIGHT` the new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

/// Tool input as the agent sends it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InlineCommentRequest {
    pub path: String,
    pub body: String,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default, rename = "startLine")]
    pub start_line: Option<u64>,
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub commit_id: Option<String>,
}

impl InlineCommentRequest {
    /// Resolve into API parameters, commenting on `head_sha` unless the
    /// request names a commit.
    pub fn into_params(self, head_sha: &str) -> Result<ReviewCommentParams> {
        let Some(line) = self.line else {
            bail!(
                "Either 'line' for single-line comments or both 'startLine' and 'line' for multi-line comments must be provided"
            );
        };
        let side = self.side.as_str().to_string();
        Ok(ReviewCommentParams {
            path: self.path,
            body: self.body,
            commit_id: self
                .commit_id
                .filter(|sha| !sha.is_empty())
                .unwrap_or_else(|| head_sha.to_string()),
            line,
            start_line: self.start_line,
            start_side: self.start_line.map(|_| side.clone()),
            side,
        })
    }

    fn location(&self) -> String {
        match (self.start_line, self.line) {
            (Some(start), Some(end)) => format!("from line {start} to {end}"),
            (_, Some(line)) => format!("at line {line}"),
            _ => String::new(),
        }
    }
}

/// Tool result reported back to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineCommentOutcome {
    pub success: bool,
    pub comment_id: u64,
    pub html_url: String,
    pub path: String,
    pub line: Option<u64>,
    pub message: String,
}

#[instrument(skip_all, fields(repo = %repo.full_name, pr = number))]
pub fn create_inline_comment(
    api: &dyn GithubApi,
    repo: &Repository,
    number: u64,
    request: InlineCommentRequest,
) -> Result<InlineCommentOutcome> {
    let location = request.location();
    let path = request.path.clone();

    let head_sha = match request.commit_id.as_deref().filter(|sha| !sha.is_empty()) {
        Some(sha) => sha.to_string(),
        None => api
            .pull_request_head_sha(repo, number)
            .context("look up pull request head")?,
    };
    let params = request.into_params(&head_sha)?;
    let created = api.create_review_comment(repo, number, &params)?;
    info!(comment_id = created.id, path = %created.path, "created inline comment");

    Ok(InlineCommentOutcome {
        success: true,
        comment_id: created.id,
        html_url: created.html_url,
        path: created.path,
        line: created.line.or(Some(params.line)),
        message: format!("Inline comment created successfully on {path} {location}"),
    })
}

/// Error text for the agent, with a hint for the common API failures.
pub fn describe_failure(err: &anyhow::Error) -> String {
    let message = format!("{err:#}");
    let hint = if message.contains("Validation Failed") {
        "\n\nThis usually means the line number doesn't exist in the diff or the file path is incorrect. Make sure you're commenting on lines that are part of the PR's changes."
    } else if message.contains("Not Found") {
        "\n\nThis usually means the PR number, repository, or file path is incorrect."
    } else {
        ""
    };
    format!("Error creating inline comment: {message}{hint}")
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::test_support::FakeGithub;

    fn request(json: &str) -> InlineCommentRequest {
        serde_json::from_str(json).expect("request")
    }

    fn repo() -> Repository {
        Repository::new("octo", "widgets")
    }

    #[test]
    fn single_line_defaults_to_right_side_and_head_commit() {
        let github = FakeGithub::default();
        let outcome = create_inline_comment(
            &github,
            &repo(),
            9,
            request(r#"{"path": "src/lib.rs", "body": "nit", "line": 12}"#),
        )
        .expect("created");

        assert_eq!(
            outcome.message,
            "Inline comment created successfully on src/lib.rs at line 12"
        );
        let sent = github.review_comments.borrow();
        assert_eq!(sent[0].side, "RIGHT");
        assert_eq!(sent[0].commit_id, "abc123");
        assert_eq!(sent[0].start_line, None);
        assert_eq!(sent[0].start_side, None);
        assert_eq!(
            github.calls(),
            vec![
                "pull_request_head_sha 9".to_string(),
                "create_review_comment 9".to_string()
            ]
        );
    }

    #[test]
    fn range_sets_start_side_and_keeps_explicit_commit() {
        let github = FakeGithub::default();
        let outcome = create_inline_comment(
            &github,
            &repo(),
            9,
            request(
                r#"{"path": "a.rs", "body": "b", "startLine": 3, "line": 8, "side": "LEFT", "commit_id": "fff"}"#,
            ),
        )
        .expect("created");

        assert!(outcome.message.ends_with("from line 3 to 8"), "{}", outcome.message);
        let sent = github.review_comments.borrow();
        assert_eq!(sent[0].start_line, Some(3));
        assert_eq!(sent[0].start_side.as_deref(), Some("LEFT"));
        assert_eq!(sent[0].commit_id, "fff");
        assert!(!github.calls().contains(&"pull_request_head_sha 9".to_string()));
    }

    #[test]
    fn missing_line_is_rejected_before_posting() {
        let github = FakeGithub::default();
        let err = create_inline_comment(
            &github,
            &repo(),
            9,
            request(r#"{"path": "a.rs", "body": "b", "startLine": 3, "commit_id": "fff"}"#),
        )
        .expect_err("no line");
        assert!(err.to_string().contains("'line'"), "{err}");
        assert!(github.review_comments.borrow().is_empty());
    }

    #[test]
    fn invalid_side_does_not_parse() {
        let parsed: Result<InlineCommentRequest, _> =
            serde_json::from_str(r#"{"path": "a", "body": "b", "line": 1, "side": "MIDDLE"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn failures_carry_hints() {
        let validation = describe_failure(&anyhow!("status 422: Validation Failed"));
        assert!(validation.starts_with("Error creating inline comment: status 422"));
        assert!(validation.contains("part of the PR's changes"));

        let missing = describe_failure(&anyhow!("Not Found"));
        assert!(missing.contains("file path is incorrect"));

        assert_eq!(
            describe_failure(&anyhow!("boom")),
            "Error creating inline comment: boom"
        );
    }
}
