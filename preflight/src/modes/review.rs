//! Review mode (`experimental-review`): pull request reviews through the
//! GitHub MCP server's pending-review tools.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use tracing::{info, instrument};

use crate::core::context::Context;
use crate::core::event::EntityPayload;
use crate::core::mcp::McpServer;
use crate::core::tools::{ToolScope, owned};
use crate::core::trigger::{REVIEW_PR_ACTIONS, contains_trigger_phrase};
use crate::core::types::ModeName;
use crate::io::config::RunEnvironment;
use crate::io::github::GithubData;
use crate::io::prompt::{PromptEngine, Template, write_prompt_file};
use crate::modes::tag::entity_context;
use crate::modes::{
    BranchInfo, Mode, ModeContext, ModeData, ModeOptions, ModeResult, PromptView,
    export_tool_scope, finalize_mcp_config,
};

pub const REVIEW_TOOLS: [&str; 10] = [
    "mcp__github__get_me",
    "mcp__github__create_pending_pull_request_review",
    "mcp__github__add_comment_to_pending_review",
    "mcp__github__submit_pending_pull_request_review",
    "mcp__github__delete_pending_pull_request_review",
    "mcp__github__create_and_submit_pull_request_review",
    "mcp__github__add_issue_comment",
    "mcp__github__get_pull_request",
    "mcp__github__get_pull_request_reviews",
    "mcp__github__get_pull_request_status",
];

/// Base branch reported for review runs, which never create a branch.
const REVIEW_BASE_BRANCH: &str = "main";

pub const GITHUB_MCP_IMAGE: &str = "ghcr.io/github/github-mcp-server:latest";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewMode;

impl Mode for ReviewMode {
    fn name(&self) -> ModeName {
        ModeName::Review
    }

    fn description(&self) -> &'static str {
        "Experimental code review mode for inline comments and suggestions"
    }

    fn should_trigger(&self, context: &Context) -> bool {
        let Some(entity) = context.as_entity() else {
            return false;
        };
        if !entity.is_pr {
            return false;
        }
        match &entity.payload {
            EntityPayload::PullRequest(event) => event
                .action
                .as_deref()
                .is_some_and(|action| REVIEW_PR_ACTIONS.contains(&action)),
            _ => contains_trigger_phrase(entity),
        }
    }

    fn allowed_tools(&self) -> Vec<String> {
        owned(&REVIEW_TOOLS)
    }

    fn disallowed_tools(&self) -> Vec<String> {
        Vec::new()
    }

    fn should_create_tracking_comment(&self) -> bool {
        false
    }

    fn generate_prompt(&self, context: &ModeContext, data: &GithubData) -> Result<String> {
        let inputs = context.context.inputs();
        if !inputs.override_prompt.trim().is_empty() {
            return Ok(inputs.override_prompt.clone());
        }
        let entity = entity_context(&context.context, ModeName::Review)?;
        let view = PromptView::new(context, entity, data);
        PromptEngine::new()?.render(Template::Review, &view)
    }

    #[instrument(skip_all, fields(event = %options.context.event_name()))]
    fn prepare(&self, options: ModeOptions<'_>) -> Result<ModeResult> {
        let ModeOptions {
            context,
            github,
            github_token,
            env,
            outputs,
            ..
        } = options;
        let entity = entity_context(context, ModeName::Review)?;
        let inputs = &entity.base.inputs;

        let data = github
            .fetch_data(&entity.base.repository, entity.entity_number, true)
            .context("fetch pull request data")?;

        let branch_info = BranchInfo {
            base_branch: REVIEW_BASE_BRANCH.to_string(),
            current_branch: String::new(),
            claude_branch: None,
        };
        let mode_ctx = self.prepare_context(
            context,
            Some(ModeData {
                base_branch: Some(REVIEW_BASE_BRANCH.to_string()),
                ..ModeData::default()
            }),
        );
        let prompt = self.generate_prompt(&mode_ctx, &data)?;
        let path = write_prompt_file(&env.prompt_dir(), &prompt)?;
        info!(path = %path.display(), "wrote review prompt");

        let scope = ToolScope::assemble(
            &self.allowed_tools(),
            &inputs.allowed_tools,
            &self.disallowed_tools(),
            &inputs.disallowed_tools,
        );
        export_tool_scope(outputs, &scope)?;

        let mut servers = BTreeMap::new();
        servers.insert("github".to_string(), github_server(env, github_token));
        let mcp_config = finalize_mcp_config(&servers, env, outputs)?;

        Ok(ModeResult {
            comment_id: None,
            branch_info,
            mcp_config,
        })
    }
}

/// The GitHub MCP server container, authenticated with the workflow token.
fn github_server(env: &RunEnvironment, token: &str) -> McpServer {
    let args = [
        "run",
        "-i",
        "--rm",
        "-e",
        "GITHUB_PERSONAL_ACCESS_TOKEN",
        "-e",
        "GITHUB_HOST",
        GITHUB_MCP_IMAGE,
    ];
    McpServer {
        command: "docker".to_string(),
        args: owned(&args),
        env: BTreeMap::from([
            ("GITHUB_PERSONAL_ACCESS_TOKEN".to_string(), token.to_string()),
            ("GITHUB_HOST".to_string(), env.server_url.clone()),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::core::config::keys;
    use crate::core::event::EventName;
    use crate::io::github::{ChangedFile, EntityData, IssueComment};
    use crate::modes::{ALLOWED_TOOLS_VAR, DISALLOWED_TOOLS_VAR};
    use crate::test_support::{
        FakeGithub, RecordingGit, RecordingOutputs, Sandbox, automation_context, context_for,
        issue_comment_context, issues_context, pull_request_context,
    };

    fn review_data() -> GithubData {
        GithubData {
            entity: EntityData {
                number: 9,
                title: "Add retry to uploads".to_string(),
                body: Some("Retries failed uploads.".to_string()),
                author: "author".to_string(),
                state: "open".to_string(),
                is_pr: true,
                head_ref: Some("feature/retry".to_string()),
                head_sha: Some("abc123".to_string()),
                base_ref: Some("main".to_string()),
                merged: false,
            },
            comments: vec![IssueComment {
                id: 1,
                author: "reviewer".to_string(),
                body: "Looks risky".to_string(),
                created_at: "2026-01-02T00:00:00Z".to_string(),
            }],
            changed_files: vec![ChangedFile {
                filename: "src/upload.rs".to_string(),
                status: "modified".to_string(),
                additions: 12,
                deletions: 3,
                sha: None,
            }],
            ..GithubData::default()
        }
    }

    fn run(context: &Context, sandbox: &Sandbox, outputs: &mut RecordingOutputs) -> ModeResult {
        let github = FakeGithub::default().with_data(review_data());
        ReviewMode
            .prepare(ModeOptions {
                context,
                github: &github,
                git: &RecordingGit::default(),
                github_token: "workflow-token",
                env: &sandbox.env(),
                outputs,
            })
            .expect("prepare")
    }

    #[test]
    fn pull_request_actions_gate_the_trigger() {
        for action in REVIEW_PR_ACTIONS {
            assert!(
                ReviewMode.should_trigger(&pull_request_context(action, &[])),
                "{action}"
            );
        }
        for action in ["closed", "edited", "labeled"] {
            assert!(
                !ReviewMode.should_trigger(&pull_request_context(action, &[])),
                "{action}"
            );
        }
    }

    #[test]
    fn comments_need_the_phrase_and_a_pull_request() {
        assert!(ReviewMode.should_trigger(&issue_comment_context("@claude review", true, &[])));
        assert!(!ReviewMode.should_trigger(&issue_comment_context("please review", true, &[])));
        assert!(!ReviewMode.should_trigger(&issue_comment_context("@claude review", false, &[])));
    }

    #[test]
    fn review_comment_with_phrase_triggers() {
        let ctx = context_for(
            EventName::PullRequestReviewComment,
            json!({
                "action": "created",
                "pull_request": {"number": 9},
                "comment": {"id": 3, "body": "@claude is this safe?"},
            }),
            &[],
        );
        assert!(ReviewMode.should_trigger(&ctx));
    }

    #[test]
    fn issues_and_automation_never_trigger() {
        assert!(!ReviewMode.should_trigger(&issues_context("opened", "@claude review", &[])));
        assert!(!ReviewMode.should_trigger(&automation_context(EventName::Schedule, &[])));
    }

    #[test]
    fn static_policy() {
        assert_eq!(ReviewMode.allowed_tools().len(), 10);
        assert!(
            ReviewMode
                .allowed_tools()
                .iter()
                .all(|tool| tool.starts_with("mcp__github__"))
        );
        assert!(ReviewMode.disallowed_tools().is_empty());
        assert!(!ReviewMode.should_create_tracking_comment());
    }

    #[test]
    fn prepare_renders_review_prompt_and_github_server() {
        let sandbox = Sandbox::new();
        let ctx = pull_request_context("opened", &[(keys::MODE, "experimental-review")]);
        let mut outputs = RecordingOutputs::default();

        let result = run(&ctx, &sandbox, &mut outputs);

        assert_eq!(result.comment_id, None);
        assert_eq!(
            result.branch_info,
            BranchInfo {
                base_branch: "main".to_string(),
                current_branch: String::new(),
                claude_branch: None,
            }
        );

        let prompt = sandbox.read_prompt();
        assert!(prompt.contains("PR Title: Add retry to uploads"), "{prompt}");
        assert!(prompt.contains("<base_branch>main</base_branch>"), "{prompt}");
        assert!(prompt.contains("[reviewer at 2026-01-02T00:00:00Z]: Looks risky"));
        assert!(prompt.contains("src/upload.rs"));
        let steps = [
            "1. Understand the PR context",
            "2. Create a pending review",
            "3. Add inline comments",
            "4. Submit your review",
        ];
        let positions: Vec<usize> = steps
            .iter()
            .map(|step| prompt.find(step).unwrap_or_else(|| panic!("missing {step}")))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

        let allowed = outputs.exported(ALLOWED_TOOLS_VAR).expect("allowed");
        assert!(allowed.starts_with("Edit,MultiEdit,Glob,Grep,LS,Read,Write,mcp__github__get_me"));
        assert_eq!(
            outputs.exported(DISALLOWED_TOOLS_VAR),
            Some("WebSearch,WebFetch")
        );

        let config: Value = serde_json::from_str(&result.mcp_config).expect("json");
        let github = &config["mcpServers"]["github"];
        assert_eq!(github["command"], "docker");
        assert_eq!(github["env"]["GITHUB_PERSONAL_ACCESS_TOKEN"], "workflow-token");
        assert_eq!(github["env"]["GITHUB_HOST"], "https://github.com");
        assert_eq!(
            github["args"].as_array().and_then(|args| args.last()),
            Some(&json!(GITHUB_MCP_IMAGE))
        );
    }

    #[test]
    fn trigger_comment_and_direct_prompt_are_included() {
        let sandbox = Sandbox::new();
        let ctx = issue_comment_context(
            "@claude focus on error handling",
            true,
            &[(keys::DIRECT_PROMPT, "Check the retry limits.")],
        );
        let mut outputs = RecordingOutputs::default();
        run(&ctx, &sandbox, &mut outputs);

        let prompt = sandbox.read_prompt();
        assert!(prompt.contains("@claude focus on error handling"), "{prompt}");
        assert!(prompt.contains("Check the retry limits."), "{prompt}");
    }

    #[test]
    fn override_prompt_replaces_everything() {
        let sandbox = Sandbox::new();
        let ctx = pull_request_context("opened", &[(keys::OVERRIDE_PROMPT, "Review only docs.")]);
        let mut outputs = RecordingOutputs::default();
        run(&ctx, &sandbox, &mut outputs);
        assert_eq!(sandbox.read_prompt(), "Review only docs.");
    }

    #[test]
    fn automation_context_is_rejected() {
        let sandbox = Sandbox::new();
        let ctx = automation_context(EventName::WorkflowDispatch, &[]);
        let mut outputs = RecordingOutputs::default();
        let err = ReviewMode
            .prepare(ModeOptions {
                context: &ctx,
                github: &FakeGithub::default(),
                git: &RecordingGit::default(),
                github_token: "t",
                env: &sandbox.env(),
                outputs: &mut outputs,
            })
            .expect_err("automation");
        assert_eq!(err.to_string(), "Review mode requires entity context");
    }
}
