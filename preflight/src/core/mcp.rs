//! MCP configuration assembly and the user override merge.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde::Serialize;
use serde_json::{Map, Value, json};

pub const MCP_SERVERS_KEY: &str = "mcpServers";

const MCP_CONFIG_SCHEMA: &str = include_str!("../../schemas/mcp_config.schema.json");

/// Connection descriptor for one stdio MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpServer {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// `{"mcpServers":{}}`
pub fn empty_config() -> Value {
    json!({ MCP_SERVERS_KEY: {} })
}

pub fn config_with_servers(servers: &BTreeMap<String, McpServer>) -> Result<Value> {
    let servers = serde_json::to_value(servers).context("serialize mcp servers")?;
    Ok(json!({ MCP_SERVERS_KEY: servers }))
}

/// Result of merging a user override into a mode's base configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct McpMerge {
    pub config: Value,
    /// Problem with the override that the workflow should see.
    pub warning: Option<String>,
}

impl McpMerge {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.config).context("serialize mcp config")
    }
}

/// Shallow merge: top-level keys of the override replace or extend `base`.
///
/// A blank override is a no-op. An override that does not parse as a JSON
/// object is discarded with a warning. A well-formed override is always
/// merged; if the result does not match the bundled schema the merge still
/// stands and the mismatch is reported as a warning.
pub fn merge_override(base: Value, raw: Option<&str>) -> McpMerge {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return McpMerge {
            config: base,
            warning: None,
        };
    };

    let discard = |base: Value, reason: String| McpMerge {
        config: base,
        warning: Some(format!("Failed to parse additional MCP config: {reason}")),
    };

    let additional: Map<String, Value> = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => return discard(base, format!("expected a JSON object, got {other}")),
        Err(err) => return discard(base, err.to_string()),
    };

    let mut merged = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    merged.extend(additional);
    let merged = Value::Object(merged);

    let warning = validate_config(&merged).err().map(|err| {
        format!("Additional MCP config was merged but does not look like an MCP config: {err:#}")
    });
    McpMerge {
        config: merged,
        warning,
    }
}

/// Validate against the bundled MCP config schema (Draft 2020-12).
pub fn validate_config(config: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(MCP_CONFIG_SCHEMA).context("parse mcp config schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile mcp config schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(config)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_serializes_compactly() {
        let merged = merge_override(empty_config(), None);
        assert_eq!(merged.to_json().expect("json"), r#"{"mcpServers":{}}"#);
        assert_eq!(merged.warning, None);
    }

    #[test]
    fn blank_override_is_ignored() {
        let merged = merge_override(empty_config(), Some("  \n"));
        assert_eq!(merged.config, empty_config());
        assert_eq!(merged.warning, None);
    }

    #[test]
    fn override_keys_win_shallowly() {
        let base = json!({"mcpServers": {"a": {"command": "a"}}, "keep": 1});
        let merged = merge_override(
            base,
            Some(r#"{"mcpServers": {"b": {"command": "b"}}, "extra": true}"#),
        );
        assert_eq!(
            merged.config,
            json!({"mcpServers": {"b": {"command": "b"}}, "keep": 1, "extra": true})
        );
    }

    #[test]
    fn malformed_override_is_discarded_with_warning() {
        let merged = merge_override(empty_config(), Some("{not json"));
        assert_eq!(merged.config, empty_config());
        let warning = merged.warning.expect("warning");
        assert!(warning.starts_with("Failed to parse additional MCP config"));
    }

    #[test]
    fn non_object_override_is_discarded() {
        let merged = merge_override(empty_config(), Some("[1, 2]"));
        assert_eq!(merged.config, empty_config());
        assert!(merged.warning.is_some());
    }

    #[test]
    fn off_schema_override_is_kept_with_a_warning() {
        let merged = merge_override(
            empty_config(),
            Some(r#"{"mcpServers":{"db":{"command":"db-mcp","env":{"PORT":5432}}}}"#),
        );
        assert_eq!(
            merged.config,
            json!({"mcpServers": {"db": {"command": "db-mcp", "env": {"PORT": 5432}}}})
        );
        let warning = merged.warning.expect("warning");
        assert!(warning.contains("schema validation failed"), "{warning}");
        assert!(!warning.starts_with("Failed to parse"), "{warning}");
    }

    #[test]
    fn null_servers_override_still_replaces_the_key() {
        let base = json!({"mcpServers": {"a": {"command": "a"}}});
        let merged = merge_override(base, Some(r#"{"mcpServers": null}"#));
        assert_eq!(merged.config, json!({"mcpServers": null}));
        assert!(merged.warning.is_some());
    }

    #[test]
    fn servers_serialize_with_env() {
        let servers = BTreeMap::from([(
            "github_comment".to_string(),
            McpServer {
                command: "/action/bin/github_comment".to_string(),
                args: vec![],
                env: BTreeMap::from([("REPO_OWNER".to_string(), "octo".to_string())]),
            },
        )]);
        let config = config_with_servers(&servers).expect("config");
        validate_config(&config).expect("valid");
        assert_eq!(
            config["mcpServers"]["github_comment"]["env"]["REPO_OWNER"],
            "octo"
        );
    }
}
