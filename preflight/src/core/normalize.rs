//! Payload normalization: raw event + configuration -> [`Context`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::config::{ActionConfig, keys};
use crate::core::context::{
    AutomationContext, Context, ContextBase, EntityContext, Inputs, Repository,
};
use crate::core::event::{
    AutomationPayload, EntityPayload, EventName, IssueCommentEvent, IssuesEvent, PullRequestEvent,
    PullRequestReviewCommentEvent, PullRequestReviewEvent,
};
use crate::error::PrepareError;

/// An event as delivered by the runner, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub event_name: String,
    pub payload: Value,
    pub repository: Repository,
    pub actor: String,
    pub run_id: String,
}

impl RawEvent {
    /// Build the runner-provided part of an event from configuration.
    pub fn from_config(config: &ActionConfig, payload: Value) -> Result<Self, PrepareError> {
        let event_name = config
            .non_empty(keys::EVENT_NAME)
            .ok_or_else(|| PrepareError::Config(format!("{} is not set", keys::EVENT_NAME)))?;
        let full_name = config.get_or(keys::REPOSITORY, "");
        let repository = Repository::parse(full_name).ok_or_else(|| {
            PrepareError::Config(format!(
                "{} must be 'owner/name', got '{full_name}'",
                keys::REPOSITORY
            ))
        })?;
        Ok(Self {
            event_name: event_name.to_string(),
            payload,
            repository,
            actor: config.get_or(keys::ACTOR, "").to_string(),
            run_id: config.get_or(keys::RUN_ID, "").to_string(),
        })
    }
}

/// Classify the event and produce the matching context variant.
pub fn normalize(event: RawEvent, config: &ActionConfig) -> Result<Context, PrepareError> {
    let mode = config.mode_name()?;
    let name = EventName::parse(&event.event_name)
        .ok_or_else(|| PrepareError::UnsupportedEvent(event.event_name.clone()))?;

    let base = ContextBase {
        run_id: event.run_id,
        event_action: event
            .payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string),
        repository: event.repository,
        actor: event.actor,
        inputs: Inputs::from_config(config, mode),
    };
    let payload = event.payload;

    let context = match name {
        EventName::Issues => {
            let p: IssuesEvent = decode(name, payload)?;
            entity(base, p.issue.number, false, EntityPayload::Issues(p))
        }
        EventName::IssueComment => {
            let p: IssueCommentEvent = decode(name, payload)?;
            let is_pr = p.issue.pull_request.is_some();
            entity(base, p.issue.number, is_pr, EntityPayload::IssueComment(p))
        }
        EventName::PullRequest => {
            let p: PullRequestEvent = decode(name, payload)?;
            entity(base, p.pull_request.number, true, EntityPayload::PullRequest(p))
        }
        EventName::PullRequestReview => {
            let p: PullRequestReviewEvent = decode(name, payload)?;
            entity(
                base,
                p.pull_request.number,
                true,
                EntityPayload::PullRequestReview(p),
            )
        }
        EventName::PullRequestReviewComment => {
            let p: PullRequestReviewCommentEvent = decode(name, payload)?;
            entity(
                base,
                p.pull_request.number,
                true,
                EntityPayload::PullRequestReviewComment(p),
            )
        }
        // Automation payloads carry nothing the pipeline depends on, so a
        // shape mismatch degrades to the empty payload instead of failing.
        EventName::WorkflowDispatch => Context::Automation(AutomationContext {
            base,
            payload: AutomationPayload::WorkflowDispatch(
                serde_json::from_value(payload).unwrap_or_default(),
            ),
        }),
        EventName::Schedule => Context::Automation(AutomationContext {
            base,
            payload: AutomationPayload::Schedule(
                serde_json::from_value(payload).unwrap_or_default(),
            ),
        }),
    };
    Ok(context)
}

fn entity(base: ContextBase, entity_number: u64, is_pr: bool, payload: EntityPayload) -> Context {
    Context::Entity(EntityContext {
        base,
        payload,
        entity_number,
        is_pr,
    })
}

fn decode<T: DeserializeOwned>(event: EventName, payload: Value) -> Result<T, PrepareError> {
    serde_json::from_value(payload).map_err(|source| PrepareError::MalformedPayload { event, source })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::event::{ENTITY_EVENT_NAMES, EventClass};

    fn raw(event_name: &str, payload: Value) -> RawEvent {
        RawEvent {
            event_name: event_name.to_string(),
            payload,
            repository: Repository::new("octo", "widgets"),
            actor: "mona".to_string(),
            run_id: "42".to_string(),
        }
    }

    fn payload_for(event: EventName) -> Value {
        match event {
            EventName::Issues => json!({"action": "opened", "issue": {"number": 7}}),
            EventName::IssueComment => {
                json!({"action": "created", "issue": {"number": 7}, "comment": {"id": 1, "body": "hi"}})
            }
            EventName::PullRequest
            | EventName::PullRequestReview
            | EventName::PullRequestReviewComment => {
                json!({"action": "opened", "pull_request": {"number": 9}})
            }
            EventName::WorkflowDispatch => json!({"inputs": {}, "ref": "refs/heads/main"}),
            EventName::Schedule => json!({"schedule": "0 0 * * *"}),
        }
    }

    #[test]
    fn every_event_normalizes_to_its_table_class() {
        let config = ActionConfig::default();
        for event in EventName::ALL {
            let ctx = normalize(raw(event.as_str(), payload_for(event)), &config)
                .unwrap_or_else(|err| panic!("{event}: {err}"));
            assert_eq!(ctx.event_name(), event);
            let expected = if ENTITY_EVENT_NAMES.contains(&event.as_str()) {
                EventClass::Entity
            } else {
                EventClass::Automation
            };
            assert_eq!(ctx.class(), expected, "{event}");
            assert_eq!(ctx.as_entity().is_some(), expected == EventClass::Entity);
        }
    }

    #[test]
    fn entity_numbers_and_pr_flags() {
        let config = ActionConfig::default();
        let issue = normalize(raw("issues", payload_for(EventName::Issues)), &config).expect("issues");
        let issue = issue.as_entity().expect("entity");
        assert_eq!(issue.entity_number, 7);
        assert!(!issue.is_pr);

        let review = normalize(
            raw("pull_request_review", payload_for(EventName::PullRequestReview)),
            &config,
        )
        .expect("review");
        let review = review.as_entity().expect("entity");
        assert_eq!(review.entity_number, 9);
        assert!(review.is_pr);
    }

    #[test]
    fn issue_comment_is_pr_follows_back_reference() {
        let config = ActionConfig::default();
        let on_pr = normalize(
            raw(
                "issue_comment",
                json!({"issue": {"number": 3, "pull_request": {"url": "x"}}, "comment": {"body": "@claude"}}),
            ),
            &config,
        )
        .expect("comment");
        assert!(on_pr.as_entity().expect("entity").is_pr);

        let on_issue = normalize(
            raw("issue_comment", json!({"issue": {"number": 3}, "comment": {}})),
            &config,
        )
        .expect("comment");
        assert!(!on_issue.as_entity().expect("entity").is_pr);
    }

    #[test]
    fn event_action_is_captured() {
        let ctx = normalize(raw("issues", payload_for(EventName::Issues)), &ActionConfig::default())
            .expect("ctx");
        assert_eq!(ctx.base().event_action.as_deref(), Some("opened"));
    }

    #[test]
    fn unsupported_event_is_rejected() {
        let err = normalize(raw("push", json!({})), &ActionConfig::default()).expect_err("push");
        assert_eq!(err.to_string(), "Unsupported event type: push");
    }

    #[test]
    fn invalid_mode_is_rejected_before_classification() {
        let config = ActionConfig::from_pairs([(keys::MODE, "bogus")]);
        let err = normalize(raw("schedule", json!({})), &config).expect_err("mode");
        assert!(matches!(err, PrepareError::InvalidMode { .. }));
    }

    #[test]
    fn entity_payload_without_number_is_malformed() {
        let err = normalize(raw("pull_request", json!({"pull_request": {}})), &ActionConfig::default())
            .expect_err("malformed");
        assert!(matches!(
            err,
            PrepareError::MalformedPayload {
                event: EventName::PullRequest,
                ..
            }
        ));
    }

    #[test]
    fn automation_payload_shape_is_lenient() {
        let ctx = normalize(raw("workflow_dispatch", json!({"inputs": 5})), &ActionConfig::default())
            .expect("dispatch");
        assert!(ctx.is_automation());
    }

    #[test]
    fn raw_event_requires_owner_slash_name() {
        let config = ActionConfig::from_pairs([
            (keys::EVENT_NAME, "schedule"),
            (keys::REPOSITORY, "widgets"),
        ]);
        let err = RawEvent::from_config(&config, json!({})).expect_err("repo");
        assert!(err.to_string().contains("GITHUB_REPOSITORY"));
    }
}
