//! Trigger rules shared by the modes.
//!
//! Pure functions over [`EntityContext`]; the modes decide which rules apply.

use crate::core::context::EntityContext;
use crate::core::event::EntityPayload;

/// `pull_request` actions that start an automatic review.
pub const REVIEW_PR_ACTIONS: [&str; 3] = ["opened", "synchronize", "reopened"];

/// Human trigger check used by Tag mode: phrase, assignee, label, or a
/// configured direct prompt.
pub fn contains_trigger(ctx: &EntityContext) -> bool {
    let inputs = &ctx.base.inputs;

    if let EntityPayload::Issues(event) = &ctx.payload {
        let action = event.action.as_deref();

        if action == Some("assigned") {
            let wanted = inputs.assignee_trigger.trim_start_matches('@');
            let assignee = event.assignee.as_ref().map(|user| user.login.as_str());
            if !wanted.is_empty() && assignee == Some(wanted) {
                tracing::debug!(assignee = wanted, "assignee trigger matched");
                return true;
            }
        }

        if action == Some("labeled") && !inputs.label_trigger.is_empty() {
            let applied = event.label.as_ref().map(|label| label.name.as_str());
            let present = event
                .issue
                .labels
                .iter()
                .any(|label| label.name == inputs.label_trigger);
            if applied == Some(inputs.label_trigger.as_str()) || present {
                tracing::debug!(label = %inputs.label_trigger, "label trigger matched");
                return true;
            }
        }
    }

    if !inputs.direct_prompt.trim().is_empty() {
        tracing::debug!("direct prompt configured, treating as triggered");
        return true;
    }

    contains_trigger_phrase(ctx)
}

/// Whether the event text carries the trigger phrase. An empty phrase never
/// matches.
pub fn contains_trigger_phrase(ctx: &EntityContext) -> bool {
    let phrase = ctx.base.inputs.trigger_phrase.as_str();
    if phrase.is_empty() {
        return false;
    }
    let mentions = |text: Option<&str>| text.is_some_and(|t| t.contains(phrase));

    match &ctx.payload {
        EntityPayload::Issues(event) => {
            opened_or_edited(event.action.as_deref())
                && (mentions(event.issue.body.as_deref()) || mentions(Some(&event.issue.title)))
        }
        EntityPayload::PullRequest(event) => {
            opened_or_edited(event.action.as_deref())
                && (mentions(event.pull_request.body.as_deref())
                    || mentions(Some(&event.pull_request.title)))
        }
        EntityPayload::PullRequestReview(event) => {
            matches!(event.action.as_deref(), None | Some("submitted" | "edited"))
                && mentions(event.review.body.as_deref())
        }
        EntityPayload::IssueComment(_) | EntityPayload::PullRequestReviewComment(_) => {
            mentions(ctx.payload.comment_body())
        }
    }
}

fn opened_or_edited(action: Option<&str>) -> bool {
    matches!(action, None | Some("opened" | "edited"))
}
