//! Configuration capture: process environment plus an optional TOML defaults
//! file.
//!
//! The defaults file carries workflow-independent settings so they need not be
//! repeated in every workflow:
//!
//! ```toml
//! [inputs]
//! trigger_phrase = "@bot"
//! branch_prefix = "bot/"
//! allowed_tools = ["Bash(cargo test)", "Bash(cargo fmt)"]
//! use_sticky_comment = true
//! ```
//!
//! Keys are the lower-case form of the environment keys. Environment values
//! always win.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::core::config::{ActionConfig, keys};
use crate::io::github::rest::DEFAULT_API_URL;

pub const DEFAULT_SERVER_URL: &str = "https://github.com";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DefaultsFile {
    inputs: BTreeMap<String, toml::Value>,
}

/// Capture the environment once, filling gaps from `defaults` when given.
pub fn capture(defaults: Option<&Path>) -> Result<ActionConfig> {
    let config = ActionConfig::from_pairs(std::env::vars());
    match defaults {
        Some(path) => Ok(config.with_defaults(load_defaults(path)?)),
        None => Ok(config),
    }
}

/// Read a defaults file into environment-style keys.
pub fn load_defaults(path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let file: DefaultsFile =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;

    let mut values = BTreeMap::new();
    for (key, value) in file.inputs {
        let rendered = render_value(&value)
            .with_context(|| format!("inputs.{key} in {}", path.display()))?;
        values.insert(key.to_ascii_uppercase(), rendered);
    }
    Ok(values)
}

fn render_value(value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Array(items) => {
            let rendered: Result<Vec<String>> = items.iter().map(render_value).collect();
            Ok(rendered?.join("\n"))
        }
        other => Err(anyhow!("unsupported value type {}", other.type_str())),
    }
}

/// Runner-provided locations and endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEnvironment {
    /// Scratch space for prompt files.
    pub runner_temp: PathBuf,
    /// Checked-out repository.
    pub workspace: PathBuf,
    /// Install location of this action; MCP server binaries live in `bin/`.
    pub action_path: PathBuf,
    pub api_url: String,
    pub server_url: String,
    pub mcp_config_override: Option<String>,
}

impl RunEnvironment {
    pub fn from_config(config: &ActionConfig) -> Result<Self> {
        let runner_temp = config
            .non_empty(keys::RUNNER_TEMP)
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("{} is not set", keys::RUNNER_TEMP))?;
        Ok(Self {
            runner_temp,
            workspace: PathBuf::from(config.get_or(keys::WORKSPACE, ".")),
            action_path: PathBuf::from(config.get_or(keys::ACTION_PATH, ".")),
            api_url: config
                .non_empty(keys::API_URL)
                .unwrap_or(DEFAULT_API_URL)
                .to_string(),
            server_url: config
                .non_empty(keys::SERVER_URL)
                .unwrap_or(DEFAULT_SERVER_URL)
                .to_string(),
            mcp_config_override: config.non_empty(keys::MCP_CONFIG).map(str::to_string),
        })
    }

    pub fn prompt_dir(&self) -> PathBuf {
        self.runner_temp.join("claude-prompts")
    }

    pub fn prompt_path(&self) -> PathBuf {
        self.prompt_dir().join("claude-prompt.txt")
    }

    /// Link to the workflow run a tracking comment points at.
    pub fn run_url(&self, full_name: &str, run_id: &str) -> String {
        format!(
            "{}/{full_name}/actions/runs/{run_id}",
            self.server_url.trim_end_matches('/')
        )
    }
}
