//! Decision layer for a repository automation agent.
//!
//! Turns a repository event into either "the agent should run, with this tool
//! scope and MCP configuration" or "the agent should not run". The crate keeps
//! the same separation throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (event normalization, input parsing,
//!   trigger rules, tool scope, MCP config merging). No I/O.
//! - **[`modes`]**: The closed set of execution modes and the registry that
//!   resolves them.
//! - **[`io`]**: Side-effecting adapters (GitHub REST, token exchange, runner
//!   outputs, prompt files, git). Behind traits so tests can substitute fakes.
//!
//! [`prepare`] sequences everything into the single fallible pipeline the
//! `preflight prepare` command runs. [`inline_comment`] backs the
//! `preflight inline-comment` tool, and [`mcp_server`] serves the same tool to
//! the agent over MCP stdio.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod inline_comment;
pub mod io;
pub mod logging;
pub mod mcp_server;
pub mod modes;
pub mod prepare;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
