//! Test-only fakes and deterministic context builders.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::core::config::{ActionConfig, keys};
use crate::core::context::{Context, Repository};
use crate::core::event::EventName;
use crate::core::normalize::{RawEvent, normalize};
use crate::io::config::RunEnvironment;
use crate::io::git::BranchOps;
use crate::io::github::{
    CreatedReviewComment, GithubApi, GithubData, IssueComment, ReviewCommentParams,
};
use crate::io::outputs::OutputSink;
use crate::io::token::TokenProvider;

pub const TEST_REPOSITORY: &str = "octo/widgets";
pub const TEST_ACTOR: &str = "octocat";
pub const TEST_RUN_ID: &str = "1234";
pub const TEST_ACTION_PATH: &str = "/opt/action";

/// Runner metadata for `event`, overlaid with `pairs`.
pub fn config_for(event: &str, pairs: &[(&str, &str)]) -> ActionConfig {
    let mut all = vec![
        (keys::EVENT_NAME, event),
        (keys::REPOSITORY, TEST_REPOSITORY),
        (keys::ACTOR, TEST_ACTOR),
        (keys::RUN_ID, TEST_RUN_ID),
    ];
    all.extend_from_slice(pairs);
    ActionConfig::from_pairs(all.into_iter().map(|(k, v)| (k.to_string(), v.to_string())))
}

/// Normalize `payload` as `event`; panics on failure.
pub fn context_for(event: EventName, payload: Value, pairs: &[(&str, &str)]) -> Context {
    let config = config_for(event.as_str(), pairs);
    let raw = RawEvent::from_config(&config, payload).expect("raw event");
    normalize(raw, &config).expect("normalize")
}

pub fn issue_comment_payload(body: &str, is_pr: bool) -> Value {
    let mut issue = json!({
        "number": 7,
        "title": "Widget crashes on save",
        "body": "Steps to reproduce inside.",
        "user": {"login": "reporter"},
        "state": "open",
        "labels": [],
    });
    if is_pr {
        issue["pull_request"] = json!({"url": "https://api.github.com/repos/octo/widgets/pulls/7"});
    }
    json!({
        "action": "created",
        "issue": issue,
        "comment": {"id": 101, "body": body, "user": {"login": "commenter"}},
    })
}

/// Issue comment #101 by `commenter` on entity #7.
pub fn issue_comment_context(body: &str, is_pr: bool, pairs: &[(&str, &str)]) -> Context {
    context_for(
        EventName::IssueComment,
        issue_comment_payload(body, is_pr),
        pairs,
    )
}

pub fn issues_payload(action: &str, body: &str) -> Value {
    json!({
        "action": action,
        "issue": {
            "number": 7,
            "title": "Widget crashes on save",
            "body": body,
            "user": {"login": "reporter"},
            "state": "open",
            "labels": [{"name": "bug"}],
        },
    })
}

pub fn issues_context(action: &str, body: &str, pairs: &[(&str, &str)]) -> Context {
    context_for(EventName::Issues, issues_payload(action, body), pairs)
}

pub fn pull_request_payload(action: &str) -> Value {
    json!({
        "action": action,
        "pull_request": {
            "number": 9,
            "title": "Add retry to uploads",
            "body": "Retries failed uploads.",
            "user": {"login": "author"},
            "state": "open",
            "head": {"ref": "feature/retry", "sha": "abc123"},
            "base": {"ref": "main", "sha": "def456"},
            "labels": [],
        },
    })
}

/// Pull request #9 from `feature/retry` into `main`.
pub fn pull_request_context(action: &str, pairs: &[(&str, &str)]) -> Context {
    context_for(EventName::PullRequest, pull_request_payload(action), pairs)
}

pub fn automation_context(event: EventName, pairs: &[(&str, &str)]) -> Context {
    let payload = match event {
        EventName::WorkflowDispatch => json!({"inputs": {}, "ref": "refs/heads/main"}),
        EventName::Schedule => json!({"schedule": "0 3 * * 1"}),
        other => panic!("{other} is not an automation event"),
    };
    context_for(event, payload, pairs)
}

pub fn run_environment(runner_temp: &Path) -> RunEnvironment {
    RunEnvironment {
        runner_temp: runner_temp.to_path_buf(),
        workspace: runner_temp.join("workspace"),
        action_path: PathBuf::from(TEST_ACTION_PATH),
        api_url: "https://api.github.com".to_string(),
        server_url: "https://github.com".to_string(),
        mcp_config_override: None,
    }
}

/// Scratch runner directory with an event file.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn env(&self) -> RunEnvironment {
        run_environment(self.path())
    }

    pub fn write_event(&self, payload: &Value) -> PathBuf {
        let path = self.path().join("event.json");
        fs::write(&path, payload.to_string()).expect("write event");
        path
    }

    pub fn read_prompt(&self) -> String {
        fs::read_to_string(self.env().prompt_path()).expect("prompt file")
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

/// [`OutputSink`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct RecordingOutputs {
    pub outputs: Vec<(String, String)>,
    pub variables: Vec<(String, String)>,
    pub warnings: Vec<String>,
    pub failures: Vec<String>,
}

impl RecordingOutputs {
    /// Last value set for output `name`.
    pub fn output(&self, name: &str) -> Option<&str> {
        last_value(&self.outputs, name)
    }

    /// Last value exported for variable `name`.
    pub fn exported(&self, name: &str) -> Option<&str> {
        last_value(&self.variables, name)
    }
}

fn last_value<'a>(entries: &'a [(String, String)], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .rev()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

impl OutputSink for RecordingOutputs {
    fn set_output(&mut self, name: &str, value: &str) -> Result<()> {
        self.outputs.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn export_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.variables.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn set_failed(&mut self, message: &str) {
        self.failures.push(message.to_string());
    }
}

/// Token provider that always returns the same token.
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn exchange(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Token provider that must never be asked.
pub struct NoExchange;

impl TokenProvider for NoExchange {
    fn exchange(&self) -> Result<String> {
        bail!("token exchange was not expected")
    }
}

/// Recording [`GithubApi`] fake with canned responses.
pub struct FakeGithub {
    pub permission: String,
    pub default_branch: String,
    pub data: GithubData,
    pub existing_comments: Vec<IssueComment>,
    pub head_sha: String,
    /// Error message returned by `create_review_comment`, when set.
    pub review_comment_error: Option<String>,
    calls: RefCell<Vec<String>>,
    pub created_comments: RefCell<Vec<String>>,
    pub updated_comments: RefCell<Vec<(u64, String)>>,
    pub review_comments: RefCell<Vec<ReviewCommentParams>>,
}

impl Default for FakeGithub {
    fn default() -> Self {
        Self {
            permission: "write".to_string(),
            default_branch: "main".to_string(),
            data: GithubData::default(),
            existing_comments: Vec::new(),
            head_sha: "abc123".to_string(),
            review_comment_error: None,
            calls: RefCell::new(Vec::new()),
            created_comments: RefCell::new(Vec::new()),
            updated_comments: RefCell::new(Vec::new()),
            review_comments: RefCell::new(Vec::new()),
        }
    }
}

impl FakeGithub {
    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permission = permission.to_string();
        self
    }

    pub fn with_data(mut self, data: GithubData) -> Self {
        self.data = data;
        self
    }

    pub fn with_comments(mut self, comments: Vec<IssueComment>) -> Self {
        self.existing_comments = comments;
        self
    }

    /// Names of the operations invoked, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl GithubApi for FakeGithub {
    fn permission_level(&self, _repo: &Repository, actor: &str) -> Result<String> {
        self.record(format!("permission_level {actor}"));
        Ok(self.permission.clone())
    }

    fn default_branch(&self, _repo: &Repository) -> Result<String> {
        self.record("default_branch".to_string());
        Ok(self.default_branch.clone())
    }

    fn fetch_data(&self, _repo: &Repository, number: u64, is_pr: bool) -> Result<GithubData> {
        self.record(format!("fetch_data {number} pr={is_pr}"));
        Ok(self.data.clone())
    }

    fn list_issue_comments(&self, _repo: &Repository, number: u64) -> Result<Vec<IssueComment>> {
        self.record(format!("list_issue_comments {number}"));
        Ok(self.existing_comments.clone())
    }

    fn create_issue_comment(
        &self,
        _repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<IssueComment> {
        self.record(format!("create_issue_comment {number}"));
        self.created_comments.borrow_mut().push(body.to_string());
        Ok(IssueComment {
            id: 5000 + self.created_comments.borrow().len() as u64,
            author: "preflight[bot]".to_string(),
            body: body.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
    }

    fn update_issue_comment(
        &self,
        _repo: &Repository,
        comment_id: u64,
        body: &str,
    ) -> Result<IssueComment> {
        self.record(format!("update_issue_comment {comment_id}"));
        self.updated_comments
            .borrow_mut()
            .push((comment_id, body.to_string()));
        Ok(IssueComment {
            id: comment_id,
            author: "preflight[bot]".to_string(),
            body: body.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
    }

    fn pull_request_head_sha(&self, _repo: &Repository, number: u64) -> Result<String> {
        self.record(format!("pull_request_head_sha {number}"));
        Ok(self.head_sha.clone())
    }

    fn create_review_comment(
        &self,
        _repo: &Repository,
        number: u64,
        params: &ReviewCommentParams,
    ) -> Result<CreatedReviewComment> {
        self.record(format!("create_review_comment {number}"));
        if let Some(message) = &self.review_comment_error {
            bail!("{message}");
        }
        self.review_comments.borrow_mut().push(params.clone());
        Ok(CreatedReviewComment {
            id: 777,
            html_url: format!("https://github.com/octo/widgets/pull/{number}#discussion_r777"),
            path: params.path.clone(),
            line: Some(params.line),
        })
    }
}

/// [`BranchOps`] that records instead of running git.
#[derive(Debug, Default)]
pub struct RecordingGit {
    calls: RefCell<Vec<String>>,
}

impl RecordingGit {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl BranchOps for RecordingGit {
    fn checkout_existing(&self, branch: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("checkout {branch}"));
        Ok(())
    }

    fn create_from(&self, base: &str, branch: &str) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("create {branch} from {base}"));
        Ok(())
    }
}
