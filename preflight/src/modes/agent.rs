//! Agent mode: automation runs (`workflow_dispatch`, `schedule`).
//!
//! No trigger text to inspect, no tracking comment, no branch management.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::context::Context;
use crate::core::tools::ToolScope;
use crate::core::types::ModeName;
use crate::io::github::GithubData;
use crate::io::prompt::write_prompt_file;
use crate::modes::{
    BranchInfo, Mode, ModeContext, ModeOptions, ModeResult, export_tool_scope, finalize_mcp_config,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AgentMode;

impl Mode for AgentMode {
    fn name(&self) -> ModeName {
        ModeName::Agent
    }

    fn description(&self) -> &'static str {
        "Automation mode for workflow_dispatch and schedule events"
    }

    fn should_trigger(&self, context: &Context) -> bool {
        context.is_automation()
    }

    fn allowed_tools(&self) -> Vec<String> {
        Vec::new()
    }

    fn disallowed_tools(&self) -> Vec<String> {
        Vec::new()
    }

    fn should_create_tracking_comment(&self) -> bool {
        false
    }

    /// Override prompt, then direct prompt, then a bare repository line.
    fn generate_prompt(&self, context: &ModeContext, _data: &GithubData) -> Result<String> {
        let inputs = context.context.inputs();
        let prompt = [&inputs.override_prompt, &inputs.direct_prompt]
            .into_iter()
            .find(|prompt| !prompt.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Repository: {}", context.context.repository().full_name));
        Ok(prompt)
    }

    #[instrument(skip_all, fields(event = %options.context.event_name()))]
    fn prepare(&self, options: ModeOptions<'_>) -> Result<ModeResult> {
        let ModeOptions {
            context,
            env,
            outputs,
            ..
        } = options;

        let mode_ctx = self.prepare_context(context, None);
        let prompt = self.generate_prompt(&mode_ctx, &GithubData::default())?;
        let path = write_prompt_file(&env.prompt_dir(), &prompt)?;
        info!(path = %path.display(), "wrote agent prompt");

        let inputs = context.inputs();
        let scope = ToolScope::assemble(
            &self.allowed_tools(),
            &inputs.allowed_tools,
            &self.disallowed_tools(),
            &inputs.disallowed_tools,
        );
        export_tool_scope(outputs, &scope)?;

        let mcp_config = finalize_mcp_config(&BTreeMap::new(), env, outputs)?;

        Ok(ModeResult {
            comment_id: None,
            branch_info: BranchInfo::default(),
            mcp_config,
        })
    }
}
