//! Stdio MCP server behind the `github_inline_comment` tool.
//!
//! Speaks newline-delimited JSON-RPC 2.0, the MCP stdio transport. One tool is
//! exposed, `create_inline_comment`, bound to a single pull request.
//! Notifications (messages without an `id`) are consumed silently.

use std::io::{BufRead, Write};

use anyhow::{Context as _, Result};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::core::context::Repository;
use crate::inline_comment::{InlineCommentRequest, create_inline_comment, describe_failure};
use crate::io::github::GithubApi;

/// Subcommand the Tag MCP config launches.
pub const SERVE_SUBCOMMAND: &str = "serve-inline-comment";
pub const INLINE_COMMENT_TOOL_NAME: &str = "create_inline_comment";

const JSONRPC_VERSION: &str = "2.0";
const PROTOCOL_VERSION: &str = "2024-11-05";

const ERROR_PARSE: i64 = -32700;
const ERROR_INVALID_REQUEST: i64 = -32600;
const ERROR_METHOD_NOT_FOUND: i64 = -32601;
const ERROR_INVALID_PARAMS: i64 = -32602;
const ERROR_INTERNAL: i64 = -32603;

/// Counts for one serve session, logged when stdin closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeReport {
    pub responses: usize,
    pub errors: usize,
}

pub struct InlineCommentServer<'a> {
    api: &'a dyn GithubApi,
    repo: Repository,
    number: u64,
}

impl<'a> InlineCommentServer<'a> {
    pub fn new(api: &'a dyn GithubApi, repo: Repository, number: u64) -> Self {
        Self { api, repo, number }
    }

    /// Answer requests from `reader` until EOF.
    #[instrument(skip_all, fields(repo = %self.repo.full_name, pr = self.number))]
    pub fn serve<R: BufRead, W: Write>(&self, reader: R, writer: &mut W) -> Result<ServeReport> {
        let mut report = ServeReport::default();
        for line in reader.lines() {
            let line = line.context("read mcp message")?;
            if line.trim().is_empty() {
                continue;
            }
            let response = match serde_json::from_str::<Value>(&line) {
                Ok(message) => self.handle(&message),
                Err(err) => Some(error_frame(
                    Value::Null,
                    ERROR_PARSE,
                    format!("invalid JSON: {err}"),
                )),
            };
            let Some(response) = response else {
                continue;
            };
            report.responses += 1;
            if response.get("error").is_some() {
                report.errors += 1;
            }
            write_frame(writer, &response)?;
        }
        Ok(report)
    }

    fn handle(&self, message: &Value) -> Option<Value> {
        let Some(object) = message.as_object() else {
            return Some(error_frame(
                Value::Null,
                ERROR_INVALID_REQUEST,
                "message must be a JSON object",
            ));
        };
        let method = object
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(id) = object.get("id").cloned() else {
            debug!(method, "notification");
            return None;
        };
        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Some(error_frame(
                id,
                ERROR_INVALID_REQUEST,
                format!("jsonrpc must be '{JSONRPC_VERSION}'"),
            ));
        }

        let outcome = match method {
            "initialize" => Ok(initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_result()),
            "tools/call" => self.call_tool(object.get("params").unwrap_or(&Value::Null)),
            other => Err((
                ERROR_METHOD_NOT_FOUND,
                format!("unsupported method '{other}'"),
            )),
        };
        Some(match outcome {
            Ok(result) => result_frame(id, result),
            Err((code, message)) => error_frame(id, code, message),
        })
    }

    fn call_tool(&self, params: &Value) -> Result<Value, (i64, String)> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if name != INLINE_COMMENT_TOOL_NAME {
            return Err((ERROR_INVALID_PARAMS, format!("unknown tool '{name}'")));
        }
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
        let request: InlineCommentRequest = serde_json::from_value(arguments)
            .map_err(|err| (ERROR_INVALID_PARAMS, format!("invalid arguments: {err}")))?;

        match create_inline_comment(self.api, &self.repo, self.number, request) {
            Ok(outcome) => {
                info!(comment_id = outcome.comment_id, "tool call succeeded");
                let text = serde_json::to_string_pretty(&outcome)
                    .map_err(|err| (ERROR_INTERNAL, format!("serialize result: {err}")))?;
                Ok(tool_result(&text, false))
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "tool call failed");
                Ok(tool_result(&describe_failure(&err), true))
            }
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": "github_inline_comment",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": { "listChanged": false },
        },
    })
}

fn tools_list_result() -> Value {
    json!({
        "tools": [{
            "name": INLINE_COMMENT_TOOL_NAME,
            "description": "Create an inline comment on a specific line or lines in a PR file",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The file path to comment on (e.g., 'src/index.js')",
                    },
                    "body": {
                        "type": "string",
                        "description": "The comment text (supports markdown and GitHub code suggestion blocks)",
                    },
                    "line": {
                        "type": "integer",
                        "description": "Line number for a single-line comment, or the end line of a range",
                    },
                    "startLine": {
                        "type": "integer",
                        "description": "Start line of a multi-line comment",
                    },
                    "side": {
                        "type": "string",
                        "enum": ["LEFT", "RIGHT"],
                        "description": "LEFT for old code, RIGHT for new code (default)",
                    },
                    "commit_id": {
                        "type": "string",
                        "description": "Commit to comment on; defaults to the PR head",
                    },
                },
                "required": ["path", "body"],
            },
        }],
    })
}

fn tool_result(text: &str, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

fn result_frame(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result })
}

fn error_frame(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": { "code": code, "message": message.into() },
    })
}

fn write_frame<W: Write>(writer: &mut W, frame: &Value) -> Result<()> {
    let encoded = serde_json::to_string(frame).context("encode mcp response")?;
    writeln!(writer, "{encoded}").context("write mcp response")?;
    writer.flush().context("flush mcp response")
}
