//! Event names and the typed payload shapes behind them.
//!
//! Classification is table driven: an event name is entity-class or
//! automation-class because it appears in [`ENTITY_EVENT_NAMES`] or
//! [`AUTOMATION_EVENT_NAMES`], never because of what the payload looks like.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Events about an addressable issue or pull request.
pub const ENTITY_EVENT_NAMES: [&str; 5] = [
    "issues",
    "issue_comment",
    "pull_request",
    "pull_request_review",
    "pull_request_review_comment",
];

/// Events with no human-authored entity behind them.
pub const AUTOMATION_EVENT_NAMES: [&str; 2] = ["workflow_dispatch", "schedule"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Entity,
    Automation,
}

impl EventClass {
    /// Classify a raw event name, `None` for names in neither table.
    pub fn of(name: &str) -> Option<Self> {
        if ENTITY_EVENT_NAMES.contains(&name) {
            Some(Self::Entity)
        } else if AUTOMATION_EVENT_NAMES.contains(&name) {
            Some(Self::Automation)
        } else {
            None
        }
    }
}

/// One of the recognized event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Issues,
    IssueComment,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    WorkflowDispatch,
    Schedule,
}

impl EventName {
    pub const ALL: [EventName; 7] = [
        Self::Issues,
        Self::IssueComment,
        Self::PullRequest,
        Self::PullRequestReview,
        Self::PullRequestReviewComment,
        Self::WorkflowDispatch,
        Self::Schedule,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::IssueComment => "issue_comment",
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::PullRequestReviewComment => "pull_request_review_comment",
            Self::WorkflowDispatch => "workflow_dispatch",
            Self::Schedule => "schedule",
        }
    }

    pub fn class(self) -> EventClass {
        match EventClass::of(self.as_str()) {
            Some(class) => class,
            None => unreachable!("every EventName is listed in a classification table"),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub state: Option<String>,
    /// Present when the issue is the conversation half of a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BranchRef {
    #[serde(default, rename = "ref")]
    pub name: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub head: BranchRef,
    #[serde(default)]
    pub base: BranchRef,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssuesEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub issue: Issue,
    /// Set on `assigned` / `unassigned` actions.
    #[serde(default)]
    pub assignee: Option<User>,
    /// Set on `labeled` / `unlabeled` actions.
    #[serde(default)]
    pub label: Option<Label>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssueCommentEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub issue: Issue,
    #[serde(default)]
    pub comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestReviewEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub pull_request: PullRequest,
    #[serde(default)]
    pub review: Review,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestReviewCommentEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub pull_request: PullRequest,
    #[serde(default)]
    pub comment: Comment,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkflowDispatchEvent {
    #[serde(default)]
    pub inputs: Option<Map<String, Value>>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScheduleEvent {
    #[serde(default)]
    pub schedule: Option<String>,
}

/// Payload of an entity-class event. The variant is the event name.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    Issues(IssuesEvent),
    IssueComment(IssueCommentEvent),
    PullRequest(PullRequestEvent),
    PullRequestReview(PullRequestReviewEvent),
    PullRequestReviewComment(PullRequestReviewCommentEvent),
}

impl EntityPayload {
    pub fn event_name(&self) -> EventName {
        match self {
            Self::Issues(_) => EventName::Issues,
            Self::IssueComment(_) => EventName::IssueComment,
            Self::PullRequest(_) => EventName::PullRequest,
            Self::PullRequestReview(_) => EventName::PullRequestReview,
            Self::PullRequestReviewComment(_) => EventName::PullRequestReviewComment,
        }
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Issues(e) => e.action.as_deref(),
            Self::IssueComment(e) => e.action.as_deref(),
            Self::PullRequest(e) => e.action.as_deref(),
            Self::PullRequestReview(e) => e.action.as_deref(),
            Self::PullRequestReviewComment(e) => e.action.as_deref(),
        }
    }

    /// Body of the comment or review that fired the event, if it was one.
    pub fn comment_body(&self) -> Option<&str> {
        match self {
            Self::IssueComment(e) => e.comment.body.as_deref(),
            Self::PullRequestReview(e) => e.review.body.as_deref(),
            Self::PullRequestReviewComment(e) => e.comment.body.as_deref(),
            Self::Issues(_) | Self::PullRequest(_) => None,
        }
    }

    /// Login of whoever authored the triggering comment, review or entity.
    pub fn author_login(&self) -> Option<&str> {
        let user = match self {
            Self::Issues(e) => e.issue.user.as_ref(),
            Self::IssueComment(e) => e.comment.user.as_ref(),
            Self::PullRequest(e) => e.pull_request.user.as_ref(),
            Self::PullRequestReview(e) => e.review.user.as_ref(),
            Self::PullRequestReviewComment(e) => e.comment.user.as_ref(),
        };
        user.map(|user| user.login.as_str())
    }
}

/// Payload of an automation-class event. The variant is the event name.
#[derive(Debug, Clone, PartialEq)]
pub enum AutomationPayload {
    WorkflowDispatch(WorkflowDispatchEvent),
    Schedule(ScheduleEvent),
}

impl AutomationPayload {
    pub fn event_name(&self) -> EventName {
        match self {
            Self::WorkflowDispatch(_) => EventName::WorkflowDispatch,
            Self::Schedule(_) => EventName::Schedule,
        }
    }
}
