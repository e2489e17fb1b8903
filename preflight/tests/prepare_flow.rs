//! Pipeline tests for `run_prepare` / `execute`.
//!
//! Drive the whole prepare sequence from an event file and configuration,
//! with fake GitHub, git and token collaborators, and check what the workflow
//! would see: outputs, exported variables, and the prompt file.

use std::fs;

use serde_json::{Value, json};

use preflight::core::config::{ActionConfig, keys};
use preflight::core::types::ModeName;
use preflight::exit_codes;
use preflight::io::config::load_defaults;
use preflight::modes::{ALLOWED_TOOLS_VAR, DISALLOWED_TOOLS_VAR};
use preflight::prepare::{PrepareOutcome, execute, output_names, run_prepare};
use preflight::test_support::{
    FakeGithub, NoExchange, RecordingGit, RecordingOutputs, Sandbox, StaticToken, config_for,
    issue_comment_payload, issues_payload,
};

fn event_config(
    sandbox: &Sandbox,
    event: &str,
    payload: &Value,
    pairs: &[(&str, &str)],
) -> ActionConfig {
    let path = sandbox.write_event(payload);
    let path = path.to_string_lossy().into_owned();
    let mut all = vec![(keys::EVENT_PATH, path.as_str())];
    all.extend_from_slice(pairs);
    config_for(event, &all)
}

#[test]
fn agent_workflow_dispatch_end_to_end() {
    let sandbox = Sandbox::new();
    let config = event_config(
        &sandbox,
        "workflow_dispatch",
        &json!({"inputs": {}, "ref": "refs/heads/main"}),
        &[(keys::MODE, "agent"), (keys::OVERRIDE_GITHUB_TOKEN, "ghp_user")],
    );
    let github = FakeGithub::default();
    let git = RecordingGit::default();
    let mut outputs = RecordingOutputs::default();

    let code = execute(
        &config,
        &NoExchange,
        |_| Ok(&github),
        &git,
        &sandbox.env(),
        &mut outputs,
    );

    assert_eq!(code, exit_codes::OK);
    assert_eq!(sandbox.read_prompt(), "Repository: octo/widgets");
    assert_eq!(outputs.output(output_names::CONTAINS_TRIGGER), Some("true"));
    assert_eq!(
        outputs.output(output_names::MCP_CONFIG),
        Some(r#"{"mcpServers":{}}"#)
    );
    assert_eq!(outputs.output(output_names::BASE_BRANCH), Some(""));
    assert_eq!(outputs.output(output_names::CLAUDE_BRANCH), None);
    assert_eq!(
        outputs.exported(ALLOWED_TOOLS_VAR),
        Some("Edit,MultiEdit,Glob,Grep,LS,Read,Write")
    );
    assert_eq!(
        outputs.exported(DISALLOWED_TOOLS_VAR),
        Some("WebSearch,WebFetch")
    );
    assert!(github.calls().is_empty());
    assert!(git.calls().is_empty());
    assert!(outputs.failures.is_empty());
}

#[test]
fn agent_schedule_with_direct_prompt_and_bad_override() {
    let sandbox = Sandbox::new();
    let config = event_config(
        &sandbox,
        "schedule",
        &json!({"schedule": "0 3 * * 1"}),
        &[
            (keys::MODE, "agent"),
            (keys::DIRECT_PROMPT, "Triage stale issues."),
        ],
    );
    let mut env = sandbox.env();
    env.mcp_config_override = Some("{ not json".to_string());
    let mut outputs = RecordingOutputs::default();

    let code = execute(
        &config,
        &StaticToken("ghs_app".to_string()),
        |_| Ok(FakeGithub::default()),
        &RecordingGit::default(),
        &env,
        &mut outputs,
    );

    assert_eq!(code, exit_codes::OK);
    assert_eq!(sandbox.read_prompt(), "Triage stale issues.");
    assert_eq!(
        outputs.output(output_names::MCP_CONFIG),
        Some(r#"{"mcpServers":{}}"#)
    );
    assert_eq!(outputs.warnings.len(), 1);
}

#[test]
fn tag_without_write_permission_fails() {
    let sandbox = Sandbox::new();
    let config = event_config(
        &sandbox,
        "issue_comment",
        &issue_comment_payload("@claude please fix", false),
        &[(keys::OVERRIDE_GITHUB_TOKEN, "t")],
    );
    let github = FakeGithub::default().with_permission("read");
    let mut outputs = RecordingOutputs::default();

    let code = execute(
        &config,
        &NoExchange,
        |_| Ok(&github),
        &RecordingGit::default(),
        &sandbox.env(),
        &mut outputs,
    );

    assert_eq!(code, exit_codes::FAILED);
    let message = outputs
        .output(output_names::PREPARE_ERROR)
        .expect("prepare_error");
    assert!(message.contains("write permissions"), "{message}");
    assert_eq!(outputs.failures.len(), 1);
    assert!(outputs.failures[0].starts_with("Prepare step failed with error: "));
    assert!(github.created_comments.borrow().is_empty());
    assert!(!sandbox.env().prompt_path().exists());
}

#[test]
fn tag_label_trigger_prepares_issue_branch() {
    let sandbox = Sandbox::new();
    let mut payload = issues_payload("labeled", "No mention here.");
    payload["label"] = json!({"name": "agent"});
    let config = event_config(
        &sandbox,
        "issues",
        &payload,
        &[(keys::LABEL_TRIGGER, "agent")],
    );
    let github = FakeGithub::default();
    let git = RecordingGit::default();
    let mut outputs = RecordingOutputs::default();

    let outcome = run_prepare(
        &config,
        &StaticToken("ghs_app".to_string()),
        |_| Ok(&github),
        &git,
        &sandbox.env(),
        &mut outputs,
    )
    .expect("prepare");

    let PrepareOutcome::Prepared(result) = outcome else {
        panic!("expected a prepared run");
    };
    let branch = result.branch_info.claude_branch.expect("branch");
    assert!(branch.starts_with("claude/issue-7-"), "{branch}");
    assert_eq!(git.calls(), vec![format!("create {branch} from main")]);
    assert_eq!(outputs.output(output_names::CLAUDE_BRANCH), Some(branch.as_str()));
    assert_eq!(outputs.output(output_names::COMMENT_ID), Some("5001"));

    let prompt = sandbox.read_prompt();
    assert!(prompt.contains("<issue_number>7</issue_number>"), "{prompt}");
    assert!(
        prompt.contains("<trigger_username>reporter</trigger_username>"),
        "{prompt}"
    );
}

#[test]
fn review_mode_ignores_comments_on_issues() {
    let sandbox = Sandbox::new();
    let config = event_config(
        &sandbox,
        "issue_comment",
        &issue_comment_payload("@claude review this", false),
        &[
            (keys::MODE, "experimental-review"),
            (keys::DEFAULT_WORKFLOW_TOKEN, "ghs_workflow"),
        ],
    );
    let mut outputs = RecordingOutputs::default();

    let outcome = run_prepare(
        &config,
        &NoExchange,
        |_| Ok(FakeGithub::default()),
        &RecordingGit::default(),
        &sandbox.env(),
        &mut outputs,
    )
    .expect("prepare");

    assert_eq!(
        outcome,
        PrepareOutcome::NotTriggered {
            mode: ModeName::Review
        }
    );
    assert_eq!(outputs.output(output_names::CONTAINS_TRIGGER), Some("false"));
}

#[test]
fn defaults_file_supplies_trigger_phrase() {
    let sandbox = Sandbox::new();
    let defaults = sandbox.path().join("preflight.toml");
    fs::write(&defaults, "[inputs]\ntrigger_phrase = \"@bot\"\n").expect("write defaults");

    let config = event_config(
        &sandbox,
        "issue_comment",
        &issue_comment_payload("@bot take a look", false),
        &[(keys::OVERRIDE_GITHUB_TOKEN, "t")],
    )
    .with_defaults(load_defaults(&defaults).expect("defaults"));
    let mut outputs = RecordingOutputs::default();

    let code = execute(
        &config,
        &NoExchange,
        |_| Ok(FakeGithub::default()),
        &RecordingGit::default(),
        &sandbox.env(),
        &mut outputs,
    );

    assert_eq!(code, exit_codes::OK);
    assert_eq!(outputs.output(output_names::CONTAINS_TRIGGER), Some("true"));
    assert!(sandbox.read_prompt().contains("<trigger_phrase>@bot</trigger_phrase>"));
}
