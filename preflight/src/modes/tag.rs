//! Tag mode: interactive runs started by a mention, assignment or label.
//!
//! Preparation order matters. The tracking comment is created first so its id
//! can be wired into the comment MCP server, then the branch is set up, then
//! the prompt is rendered with both.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::core::context::{Context, EntityContext, Inputs};
use crate::core::mcp::McpServer;
use crate::core::tools::{GIT_BASH_TOOLS, SIGNED_COMMIT_TOOLS, ToolScope, owned};
use crate::core::trigger::contains_trigger;
use crate::core::types::ModeName;
use crate::error::PrepareError;
use crate::io::config::RunEnvironment;
use crate::io::git::BranchOps;
use crate::io::github::{EntityData, GithubApi, GithubData};
use crate::io::prompt::{PromptEngine, Template, write_prompt_file};
use crate::mcp_server::SERVE_SUBCOMMAND;
use crate::modes::{
    BranchInfo, Mode, ModeContext, ModeData, ModeOptions, ModeResult, PromptView,
    export_tool_scope, finalize_mcp_config,
};

/// Hidden marker identifying comments this mode owns.
pub const TRACKING_MARKER: &str = "<!-- preflight-tracking-comment -->";

pub const UPDATE_COMMENT_TOOL: &str = "mcp__github_comment__update_claude_comment";
pub const INLINE_COMMENT_TOOL: &str = "mcp__github_inline_comment__create_inline_comment";
/// This crate's own binary, which serves the inline comment tool.
pub const PREFLIGHT_BINARY: &str = "preflight";

pub const CI_TOOLS: [&str; 3] = [
    "mcp__github_ci__get_ci_status",
    "mcp__github_ci__get_workflow_run_details",
    "mcp__github_ci__download_job_log",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TagMode;

impl Mode for TagMode {
    fn name(&self) -> ModeName {
        ModeName::Tag
    }

    fn description(&self) -> &'static str {
        "Traditional implementation mode triggered by @claude mentions"
    }

    fn should_trigger(&self, context: &Context) -> bool {
        context.as_entity().is_some_and(contains_trigger)
    }

    fn allowed_tools(&self) -> Vec<String> {
        vec![UPDATE_COMMENT_TOOL.to_string()]
    }

    fn disallowed_tools(&self) -> Vec<String> {
        Vec::new()
    }

    fn should_create_tracking_comment(&self) -> bool {
        true
    }

    fn generate_prompt(&self, context: &ModeContext, data: &GithubData) -> Result<String> {
        let inputs = context.context.inputs();
        if !inputs.override_prompt.trim().is_empty() {
            return Ok(inputs.override_prompt.clone());
        }
        let entity = entity_context(&context.context, ModeName::Tag)?;
        let view = PromptView::new(context, entity, data);
        PromptEngine::new()?.render(Template::Tag, &view)
    }

    #[instrument(skip_all, fields(event = %options.context.event_name()))]
    fn prepare(&self, options: ModeOptions<'_>) -> Result<ModeResult> {
        let ModeOptions {
            context,
            github,
            git,
            github_token,
            env,
            outputs,
        } = options;
        let entity = entity_context(context, ModeName::Tag)?;
        let inputs = &entity.base.inputs;

        let comment_id = create_tracking_comment(github, entity, env)?;
        let data = github
            .fetch_data(&entity.base.repository, entity.entity_number, entity.is_pr)
            .context("fetch entity data")?;
        let branch_info = setup_branch(github, git, entity, &data.entity, Utc::now())?;

        let mode_ctx = self.prepare_context(
            context,
            Some(ModeData {
                comment_id: Some(comment_id),
                base_branch: Some(branch_info.base_branch.clone()),
                claude_branch: branch_info.claude_branch.clone(),
            }),
        );
        let prompt = self.generate_prompt(&mode_ctx, &data)?;
        let path = write_prompt_file(&env.prompt_dir(), &prompt)?;
        info!(path = %path.display(), "wrote tag prompt");

        let scope = ToolScope::assemble(
            &mode_tools(self.allowed_tools(), inputs, entity.is_pr),
            &inputs.allowed_tools,
            &self.disallowed_tools(),
            &inputs.disallowed_tools,
        );
        export_tool_scope(outputs, &scope)?;

        let servers = mcp_servers(entity, env, github_token, comment_id, &branch_info);
        let mcp_config = finalize_mcp_config(&servers, env, outputs)?;

        Ok(ModeResult {
            comment_id: Some(comment_id),
            branch_info,
            mcp_config,
        })
    }
}

pub(crate) fn entity_context(context: &Context, mode: ModeName) -> Result<&EntityContext> {
    context.as_entity().ok_or_else(|| {
        PrepareError::Config(format!("{} mode requires entity context", mode.title())).into()
    })
}

pub fn tracking_comment_body(run_url: &str) -> String {
    format!(
        "Working on it…\n\nI'll analyze this and get back to you.\n\n[View job run]({run_url})\n{TRACKING_MARKER}"
    )
}

/// Create the tracking comment, or reuse this mode's earlier comment on the
/// pull request when sticky comments are enabled.
fn create_tracking_comment(
    github: &dyn GithubApi,
    entity: &EntityContext,
    env: &RunEnvironment,
) -> Result<u64> {
    let repo = &entity.base.repository;
    let body = tracking_comment_body(&env.run_url(&repo.full_name, &entity.base.run_id));

    if entity.base.inputs.use_sticky_comment && entity.is_pr {
        let existing = github
            .list_issue_comments(repo, entity.entity_number)
            .context("list comments for sticky tracking comment")?;
        let sticky = existing.iter().find(|comment| {
            comment.author.ends_with("[bot]") && comment.body.contains(TRACKING_MARKER)
        });
        if let Some(comment) = sticky {
            github
                .update_issue_comment(repo, comment.id, &body)
                .context("update sticky tracking comment")?;
            info!(comment_id = comment.id, "reused sticky tracking comment");
            return Ok(comment.id);
        }
    }

    let created = github
        .create_issue_comment(repo, entity.entity_number, &body)
        .context("create tracking comment")?;
    info!(comment_id = created.id, "created tracking comment");
    Ok(created.id)
}

/// `{prefix}{issue|pr}-{number}-{yyyymmdd-hhmm}`.
pub fn branch_name(prefix: &str, is_pr: bool, number: u64, now: DateTime<Utc>) -> String {
    let kind = if is_pr { "pr" } else { "issue" };
    format!("{prefix}{kind}-{number}-{}", now.format("%Y%m%d-%H%M"))
}

/// Check out an open pull request's head, or create a fresh branch from the
/// configured base (falling back to the repository default branch).
fn setup_branch(
    github: &dyn GithubApi,
    git: &dyn BranchOps,
    entity: &EntityContext,
    data: &EntityData,
    now: DateTime<Utc>,
) -> Result<BranchInfo> {
    let pr_open = entity.is_pr && data.state.eq_ignore_ascii_case("open") && !data.merged;
    if let (true, Some(head)) = (pr_open, data.head_ref.as_deref()) {
        git.checkout_existing(head)
            .with_context(|| format!("check out pull request branch {head}"))?;
        debug!(branch = head, "checked out pull request head");
        return Ok(BranchInfo {
            base_branch: data.base_ref.clone().unwrap_or_default(),
            current_branch: head.to_string(),
            claude_branch: None,
        });
    }

    let inputs = &entity.base.inputs;
    let base = match &inputs.base_branch {
        Some(base) => base.clone(),
        None => github
            .default_branch(&entity.base.repository)
            .context("resolve default branch")?,
    };
    let branch = branch_name(&inputs.branch_prefix, entity.is_pr, entity.entity_number, now);
    git.create_from(&base, &branch)
        .with_context(|| format!("create branch {branch} from {base}"))?;
    debug!(%base, %branch, "created working branch");
    Ok(BranchInfo {
        base_branch: base,
        current_branch: branch.clone(),
        claude_branch: Some(branch),
    })
}

/// Mode grants plus the commit, inline comment and CI tools this run needs.
fn mode_tools(mut tools: Vec<String>, inputs: &Inputs, is_pr: bool) -> Vec<String> {
    if inputs.use_commit_signing {
        tools.extend(owned(&SIGNED_COMMIT_TOOLS));
    } else {
        tools.extend(owned(&GIT_BASH_TOOLS));
    }
    if is_pr {
        tools.push(INLINE_COMMENT_TOOL.to_string());
        if can_read_actions(inputs) {
            tools.extend(owned(&CI_TOOLS));
        }
    }
    tools
}

fn can_read_actions(inputs: &Inputs) -> bool {
    inputs
        .additional_permissions
        .get("actions")
        .is_some_and(|level| level == "read")
}

/// Server run from `<action_path>/bin/<binary>`.
fn server(
    env: &RunEnvironment,
    binary: &str,
    args: &[&str],
    vars: &[(&str, String)],
) -> McpServer {
    McpServer {
        command: env
            .action_path
            .join("bin")
            .join(binary)
            .to_string_lossy()
            .into_owned(),
        args: owned(args),
        env: vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect(),
    }
}

fn mcp_servers(
    entity: &EntityContext,
    env: &RunEnvironment,
    token: &str,
    comment_id: u64,
    branch: &BranchInfo,
) -> BTreeMap<String, McpServer> {
    let repo = &entity.base.repository;
    let inputs = &entity.base.inputs;
    let common = [
        ("GITHUB_TOKEN", token.to_string()),
        ("REPO_OWNER", repo.owner.clone()),
        ("REPO_NAME", repo.repo.clone()),
        ("GITHUB_API_URL", env.api_url.clone()),
    ];
    let with = |extra: &[(&'static str, String)]| {
        common
            .iter()
            .chain(extra)
            .cloned()
            .collect::<Vec<(&'static str, String)>>()
    };

    let mut servers = BTreeMap::new();
    servers.insert(
        "github_comment".to_string(),
        server(
            env,
            "github_comment",
            &[],
            &with(&[
                ("CLAUDE_COMMENT_ID", comment_id.to_string()),
                ("GITHUB_EVENT_NAME", entity.payload.event_name().to_string()),
            ]),
        ),
    );
    if entity.is_pr {
        let pr_number = [("PR_NUMBER", entity.entity_number.to_string())];
        servers.insert(
            "github_inline_comment".to_string(),
            server(env, PREFLIGHT_BINARY, &[SERVE_SUBCOMMAND], &with(&pr_number)),
        );
        if can_read_actions(inputs) {
            servers.insert(
                "github_ci".to_string(),
                server(
                    env,
                    "github_ci",
                    &[],
                    &with(&[
                        ("PR_NUMBER", entity.entity_number.to_string()),
                        ("RUNNER_TEMP", env.runner_temp.to_string_lossy().into_owned()),
                    ]),
                ),
            );
        }
    }
    if inputs.use_commit_signing {
        servers.insert(
            "github_file_ops".to_string(),
            server(
                env,
                "github_file_ops",
                &[],
                &with(&[
                    ("BRANCH_NAME", branch.current_branch.clone()),
                    ("BASE_BRANCH", branch.base_branch.clone()),
                    ("REPO_DIR", env.workspace.to_string_lossy().into_owned()),
                ]),
            ),
        );
    }
    servers
}
