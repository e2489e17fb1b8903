//! Flat key/value configuration captured once at the start of a run.
//!
//! `ActionConfig` is deliberately dumb: it only stores strings. Typed views
//! (`Inputs`, `RunEnvironment`) are derived from it where they are needed.

use std::collections::BTreeMap;

use crate::core::types::{DEFAULT_MODE, ModeName, is_valid_mode};
use crate::error::PrepareError;

/// Configuration key names.
pub mod keys {
    pub const MODE: &str = "MODE";
    pub const TRIGGER_PHRASE: &str = "TRIGGER_PHRASE";
    pub const ASSIGNEE_TRIGGER: &str = "ASSIGNEE_TRIGGER";
    pub const LABEL_TRIGGER: &str = "LABEL_TRIGGER";
    pub const ALLOWED_TOOLS: &str = "ALLOWED_TOOLS";
    pub const DISALLOWED_TOOLS: &str = "DISALLOWED_TOOLS";
    pub const CUSTOM_INSTRUCTIONS: &str = "CUSTOM_INSTRUCTIONS";
    pub const DIRECT_PROMPT: &str = "DIRECT_PROMPT";
    pub const OVERRIDE_PROMPT: &str = "OVERRIDE_PROMPT";
    pub const BASE_BRANCH: &str = "BASE_BRANCH";
    pub const BRANCH_PREFIX: &str = "BRANCH_PREFIX";
    pub const USE_STICKY_COMMENT: &str = "USE_STICKY_COMMENT";
    pub const USE_COMMIT_SIGNING: &str = "USE_COMMIT_SIGNING";
    pub const ADDITIONAL_PERMISSIONS: &str = "ADDITIONAL_PERMISSIONS";
    pub const MCP_CONFIG: &str = "MCP_CONFIG";

    pub const DEFAULT_WORKFLOW_TOKEN: &str = "DEFAULT_WORKFLOW_TOKEN";
    pub const OVERRIDE_GITHUB_TOKEN: &str = "OVERRIDE_GITHUB_TOKEN";
    pub const ID_TOKEN_REQUEST_URL: &str = "ACTIONS_ID_TOKEN_REQUEST_URL";
    pub const ID_TOKEN_REQUEST_TOKEN: &str = "ACTIONS_ID_TOKEN_REQUEST_TOKEN";
    pub const TOKEN_EXCHANGE_URL: &str = "TOKEN_EXCHANGE_URL";

    pub const EVENT_NAME: &str = "GITHUB_EVENT_NAME";
    pub const EVENT_PATH: &str = "GITHUB_EVENT_PATH";
    pub const REPOSITORY: &str = "GITHUB_REPOSITORY";
    pub const ACTOR: &str = "GITHUB_ACTOR";
    pub const RUN_ID: &str = "GITHUB_RUN_ID";
    pub const API_URL: &str = "GITHUB_API_URL";
    pub const SERVER_URL: &str = "GITHUB_SERVER_URL";
    pub const WORKSPACE: &str = "GITHUB_WORKSPACE";
    pub const ACTION_PATH: &str = "GITHUB_ACTION_PATH";
    pub const OUTPUT_FILE: &str = "GITHUB_OUTPUT";
    pub const ENV_FILE: &str = "GITHUB_ENV";
    pub const RUNNER_TEMP: &str = "RUNNER_TEMP";
}

/// Immutable snapshot of the process configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionConfig {
    values: BTreeMap<String, String>,
}

impl ActionConfig {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value, including empty strings.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value only when it has non-whitespace content.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Flags are on only for the literal string `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    /// Fill keys that are absent here from `defaults`. Present keys win, even
    /// when empty.
    pub fn with_defaults(mut self, defaults: BTreeMap<String, String>) -> Self {
        for (key, value) in defaults {
            self.values.entry(key).or_insert(value);
        }
        self
    }

    /// Configured mode, falling back to [`DEFAULT_MODE`] when unset.
    pub fn mode_name(&self) -> Result<ModeName, PrepareError> {
        let name = self.get_or(keys::MODE, DEFAULT_MODE);
        ModeName::parse(name).ok_or_else(|| PrepareError::InvalidMode {
            name: name.to_string(),
        })
    }

    /// Reject configuration that can never produce a run.
    pub fn validate(&self) -> Result<(), PrepareError> {
        let mode = self.get_or(keys::MODE, DEFAULT_MODE);
        if !is_valid_mode(mode) {
            return Err(PrepareError::InvalidMode {
                name: mode.to_string(),
            });
        }
        if self.non_empty(keys::EVENT_NAME).is_none() {
            return Err(PrepareError::Config(format!(
                "{} is not set",
                keys::EVENT_NAME
            )));
        }
        Ok(())
    }
}
