//! Orchestration for a single `preflight prepare` run.
//!
//! Linear with early exits: mode → token → context → permission → registry →
//! trigger → mode preparation. Nothing visible on GitHub is created before the
//! trigger decision is final.

use anyhow::{Context as _, Result};
use tracing::{debug, info, instrument};

use crate::core::config::ActionConfig;
use crate::core::normalize::normalize;
use crate::core::types::ModeName;
use crate::error::PrepareError;
use crate::exit_codes;
use crate::io::config::RunEnvironment;
use crate::io::event::load_event;
use crate::io::git::BranchOps;
use crate::io::github::{GithubApi, has_write_permission};
use crate::io::outputs::OutputSink;
use crate::io::token::{TokenProvider, resolve_token};
use crate::modes::registry::get_mode;
use crate::modes::{ModeOptions, ModeResult};

/// Output names the workflow reads after this step.
pub mod output_names {
    pub const CONTAINS_TRIGGER: &str = "contains_trigger";
    pub const MCP_CONFIG: &str = "mcp_config";
    pub const PREPARE_ERROR: &str = "prepare_error";
    pub const COMMENT_ID: &str = "claude_comment_id";
    pub const BASE_BRANCH: &str = "base_branch";
    pub const CURRENT_BRANCH: &str = "current_branch";
    pub const CLAUDE_BRANCH: &str = "claude_branch";
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// The mode decided this event is not for it.
    NotTriggered { mode: ModeName },
    Prepared(ModeResult),
}

/// Run the pipeline, publishing outputs as decisions are made.
///
/// `connect` builds the API client once the token is known.
#[instrument(skip_all)]
pub fn run_prepare<G, F>(
    config: &ActionConfig,
    tokens: &dyn TokenProvider,
    connect: F,
    git: &dyn BranchOps,
    env: &RunEnvironment,
    sink: &mut dyn OutputSink,
) -> Result<PrepareOutcome>
where
    G: GithubApi,
    F: FnOnce(&str) -> Result<G>,
{
    let mode_name = config.mode_name()?;
    let token = resolve_token(mode_name, config, tokens)?;
    let github = connect(&token).context("create GitHub client")?;

    let context = normalize(load_event(config)?, config)?;
    info!(
        mode = %mode_name,
        event = %context.event_name(),
        repository = %context.repository().full_name,
        "normalized event"
    );

    if !context.is_automation() {
        let actor = context.actor();
        if !has_write_permission(&github, context.repository(), actor)
            .context("check actor permission")?
        {
            return Err(PrepareError::Permission {
                actor: actor.to_string(),
            }
            .into());
        }
    }

    let mode = get_mode(mode_name.as_str(), &context)?;
    debug!(mode = %mode_name, description = mode.description(), "resolved mode");
    let triggered = mode.should_trigger(&context);
    sink.set_output(output_names::CONTAINS_TRIGGER, &triggered.to_string())?;
    if !triggered {
        info!(mode = %mode_name, "no trigger found, skipping remaining steps");
        return Ok(PrepareOutcome::NotTriggered { mode: mode_name });
    }

    info!(mode = %mode_name, event = %context.event_name(), "preparing");
    let result = mode.prepare(ModeOptions {
        context: &context,
        github: &github,
        git,
        github_token: &token,
        env,
        outputs: &mut *sink,
    })?;
    publish_result(sink, &result)?;
    Ok(PrepareOutcome::Prepared(result))
}

fn publish_result(sink: &mut dyn OutputSink, result: &ModeResult) -> Result<()> {
    sink.set_output(output_names::MCP_CONFIG, &result.mcp_config)?;
    sink.set_output(output_names::BASE_BRANCH, &result.branch_info.base_branch)?;
    sink.set_output(output_names::CURRENT_BRANCH, &result.branch_info.current_branch)?;
    if let Some(branch) = &result.branch_info.claude_branch {
        sink.set_output(output_names::CLAUDE_BRANCH, branch)?;
    }
    if let Some(id) = result.comment_id {
        sink.set_output(output_names::COMMENT_ID, &id.to_string())?;
    }
    Ok(())
}

/// [`run_prepare`] with the single exit point: any error is published and
/// mapped to [`exit_codes::FAILED`].
pub fn execute<G, F>(
    config: &ActionConfig,
    tokens: &dyn TokenProvider,
    connect: F,
    git: &dyn BranchOps,
    env: &RunEnvironment,
    sink: &mut dyn OutputSink,
) -> i32
where
    G: GithubApi,
    F: FnOnce(&str) -> Result<G>,
{
    match run_prepare(config, tokens, connect, git, env, sink) {
        Ok(_) => exit_codes::OK,
        Err(err) => report_failure(sink, &err),
    }
}

/// Publish `err` as the step failure and the `prepare_error` output.
pub fn report_failure(sink: &mut dyn OutputSink, err: &anyhow::Error) -> i32 {
    let message = format!("{err:#}");
    tracing::error!(error = %message, "prepare failed");
    sink.set_failed(&format!("Prepare step failed with error: {message}"));
    if let Err(output_err) = sink.set_output(output_names::PREPARE_ERROR, &message) {
        tracing::error!(error = %output_err, "could not publish prepare_error");
    }
    exit_codes::FAILED
}
