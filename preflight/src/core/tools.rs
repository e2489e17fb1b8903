//! Tool scope assembly.

/// Editing and navigation tools every mode grants.
pub const BASE_TOOLS: [&str; 7] = ["Edit", "MultiEdit", "Glob", "Grep", "LS", "Read", "Write"];

/// Outbound web access, denied unless a user explicitly allows it elsewhere.
pub const WEB_TOOLS: [&str; 2] = ["WebSearch", "WebFetch"];

/// Git via Bash, granted when commits are made locally.
pub const GIT_BASH_TOOLS: [&str; 7] = [
    "Bash(git add:*)",
    "Bash(git commit:*)",
    "Bash(git push:*)",
    "Bash(git status:*)",
    "Bash(git diff:*)",
    "Bash(git log:*)",
    "Bash(git rm:*)",
];

/// File operations through the API, granted when commits must be signed.
pub const SIGNED_COMMIT_TOOLS: [&str; 2] = [
    "mcp__github_file_ops__commit_files",
    "mcp__github_file_ops__delete_files",
];

/// Allowed and disallowed tool names. Duplicates are harmless; consumers
/// check membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolScope {
    pub allowed: Vec<String>,
    pub disallowed: Vec<String>,
}

impl ToolScope {
    /// Base tools + mode grants + user grants; web baseline + mode denials +
    /// user denials.
    pub fn assemble(
        mode_allowed: &[String],
        user_allowed: &[String],
        mode_disallowed: &[String],
        user_disallowed: &[String],
    ) -> Self {
        let allowed = BASE_TOOLS
            .iter()
            .map(|tool| tool.to_string())
            .chain(mode_allowed.iter().cloned())
            .chain(user_allowed.iter().cloned())
            .collect();
        let disallowed = WEB_TOOLS
            .iter()
            .map(|tool| tool.to_string())
            .chain(mode_disallowed.iter().cloned())
            .chain(user_disallowed.iter().cloned())
            .collect();
        Self {
            allowed,
            disallowed,
        }
    }

    pub fn allowed_csv(&self) -> String {
        self.allowed.join(",")
    }

    pub fn disallowed_csv(&self) -> String {
        self.disallowed.join(",")
    }
}

pub fn owned(tools: &[&str]) -> Vec<String> {
    tools.iter().map(|tool| tool.to_string()).collect()
}
