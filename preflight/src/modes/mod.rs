//! Execution modes.
//!
//! A [`Mode`] bundles the trigger predicate, tool grants, tracking comment
//! policy, prompt generation and the side-effecting `prepare` step. The set of
//! modes is closed: adding one means a new variant of
//! [`ModeName`](crate::core::types::ModeName) and a registry entry.

pub mod agent;
pub mod registry;
pub mod review;
pub mod tag;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use crate::core::context::{Context, EntityContext};
use crate::core::mcp::{self, McpServer};
use crate::core::tools::ToolScope;
use crate::core::types::ModeName;
use crate::io::config::RunEnvironment;
use crate::io::git::BranchOps;
use crate::io::github::{GithubApi, GithubData};
use crate::io::outputs::OutputSink;

pub const ALLOWED_TOOLS_VAR: &str = "INPUT_ALLOWED_TOOLS";
pub const DISALLOWED_TOOLS_VAR: &str = "INPUT_DISALLOWED_TOOLS";

/// Run-scoped data merged into a [`ModeContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeData {
    pub comment_id: Option<u64>,
    pub base_branch: Option<String>,
    pub claude_branch: Option<String>,
}

/// Context plus run-scoped data, consumed by prompt generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeContext {
    pub mode: ModeName,
    pub context: Context,
    pub comment_id: Option<u64>,
    pub base_branch: Option<String>,
    pub claude_branch: Option<String>,
}

impl ModeContext {
    pub fn new(mode: ModeName, context: &Context, data: Option<ModeData>) -> Self {
        let data = data.unwrap_or_default();
        Self {
            mode,
            context: context.clone(),
            comment_id: data.comment_id,
            base_branch: data.base_branch,
            claude_branch: data.claude_branch,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchInfo {
    pub base_branch: String,
    pub current_branch: String,
    pub claude_branch: Option<String>,
}

/// Terminal output of a successful `prepare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeResult {
    pub comment_id: Option<u64>,
    pub branch_info: BranchInfo,
    pub mcp_config: String,
}

/// Collaborators handed to [`Mode::prepare`].
pub struct ModeOptions<'a> {
    pub context: &'a Context,
    pub github: &'a dyn GithubApi,
    pub git: &'a dyn BranchOps,
    pub github_token: &'a str,
    pub env: &'a RunEnvironment,
    pub outputs: &'a mut dyn OutputSink,
}

/// Contract every execution mode implements.
pub trait Mode: Sync {
    fn name(&self) -> ModeName;

    fn description(&self) -> &'static str;

    /// Pure decision; must not perform I/O.
    fn should_trigger(&self, context: &Context) -> bool;

    fn prepare_context(&self, context: &Context, data: Option<ModeData>) -> ModeContext {
        ModeContext::new(self.name(), context, data)
    }

    fn allowed_tools(&self) -> Vec<String>;

    fn disallowed_tools(&self) -> Vec<String>;

    fn should_create_tracking_comment(&self) -> bool;

    fn generate_prompt(&self, context: &ModeContext, data: &GithubData) -> Result<String>;

    fn prepare(&self, options: ModeOptions<'_>) -> Result<ModeResult>;
}

/// Template input shared by the entity prompts.
#[derive(Debug, Serialize)]
pub struct PromptView<'a> {
    pub repository: &'a str,
    pub event_name: &'static str,
    pub is_pr: bool,
    pub number: u64,
    pub comment_id: Option<u64>,
    pub trigger_username: &'a str,
    pub trigger_phrase: &'a str,
    pub trigger_comment: Option<&'a str>,
    pub direct_prompt: Option<&'a str>,
    pub custom_instructions: Option<&'a str>,
    pub base_branch: Option<&'a str>,
    pub claude_branch: Option<&'a str>,
    pub use_commit_signing: bool,
    pub data: &'a GithubData,
}

impl<'a> PromptView<'a> {
    pub fn new(mode_ctx: &'a ModeContext, entity: &'a EntityContext, data: &'a GithubData) -> Self {
        let inputs = &entity.base.inputs;
        let non_empty = |s: &'a str| Some(s).filter(|s| !s.trim().is_empty());
        Self {
            repository: &entity.base.repository.full_name,
            event_name: entity.payload.event_name().as_str(),
            is_pr: entity.is_pr,
            number: entity.entity_number,
            comment_id: mode_ctx.comment_id,
            trigger_username: entity
                .payload
                .author_login()
                .filter(|login| !login.is_empty())
                .unwrap_or(&entity.base.actor),
            trigger_phrase: &inputs.trigger_phrase,
            trigger_comment: entity.payload.comment_body().and_then(non_empty),
            direct_prompt: non_empty(&inputs.direct_prompt),
            custom_instructions: non_empty(&inputs.custom_instructions),
            base_branch: mode_ctx.base_branch.as_deref(),
            claude_branch: mode_ctx.claude_branch.as_deref(),
            use_commit_signing: inputs.use_commit_signing,
            data,
        }
    }
}

/// Publish the tool scope as variables the agent step reads.
pub(crate) fn export_tool_scope(outputs: &mut dyn OutputSink, scope: &ToolScope) -> Result<()> {
    outputs.export_variable(ALLOWED_TOOLS_VAR, &scope.allowed_csv())?;
    outputs.export_variable(DISALLOWED_TOOLS_VAR, &scope.disallowed_csv())?;
    Ok(())
}

/// Build a mode's MCP config from `servers` and merge the user override.
pub(crate) fn finalize_mcp_config(
    servers: &BTreeMap<String, McpServer>,
    env: &RunEnvironment,
    outputs: &mut dyn OutputSink,
) -> Result<String> {
    let base = if servers.is_empty() {
        mcp::empty_config()
    } else {
        mcp::config_with_servers(servers)?
    };
    let merged = mcp::merge_override(base, env.mcp_config_override.as_deref());
    if let Some(warning) = &merged.warning {
        warn!(%warning, "MCP config override");
        outputs.warning(warning);
    }
    merged.to_json()
}
