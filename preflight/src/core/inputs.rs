//! Parsing of list- and map-shaped configuration inputs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::config::{ActionConfig, keys};
use crate::core::context::Inputs;
use crate::core::types::ModeName;

static LIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",|[\n\r]+").unwrap_or_else(|err| panic!("list separator regex: {err}"))
});

static INLINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#.+$").unwrap_or_else(|err| panic!("inline comment regex: {err}"))
});

pub const DEFAULT_TRIGGER_PHRASE: &str = "@claude";
pub const DEFAULT_BRANCH_PREFIX: &str = "claude/";

/// Split a comma/newline separated list, dropping `# comments` and blanks.
///
/// Order and duplicates are preserved.
pub fn parse_multiline_input(s: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(s)
        .map(|entry| INLINE_COMMENT.replace(entry, ""))
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Parse `key: value` lines. Lines without both a key and a value are skipped.
pub fn parse_additional_permissions(s: &str) -> BTreeMap<String, String> {
    let mut permissions = BTreeMap::new();
    for line in s.trim().lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        permissions.insert(key.to_string(), value.to_string());
    }
    permissions
}

impl Inputs {
    /// Resolve every input from configuration. The mode has already been
    /// validated by the caller.
    pub fn from_config(config: &ActionConfig, mode: ModeName) -> Self {
        Self {
            mode,
            trigger_phrase: config
                .get_or(keys::TRIGGER_PHRASE, DEFAULT_TRIGGER_PHRASE)
                .to_string(),
            assignee_trigger: config.get_or(keys::ASSIGNEE_TRIGGER, "").to_string(),
            label_trigger: config.get_or(keys::LABEL_TRIGGER, "").to_string(),
            allowed_tools: parse_multiline_input(config.get_or(keys::ALLOWED_TOOLS, "")),
            disallowed_tools: parse_multiline_input(config.get_or(keys::DISALLOWED_TOOLS, "")),
            custom_instructions: config.get_or(keys::CUSTOM_INSTRUCTIONS, "").to_string(),
            direct_prompt: config.get_or(keys::DIRECT_PROMPT, "").to_string(),
            override_prompt: config.get_or(keys::OVERRIDE_PROMPT, "").to_string(),
            base_branch: config.non_empty(keys::BASE_BRANCH).map(str::to_string),
            branch_prefix: config
                .get_or(keys::BRANCH_PREFIX, DEFAULT_BRANCH_PREFIX)
                .to_string(),
            use_sticky_comment: config.flag(keys::USE_STICKY_COMMENT),
            use_commit_signing: config.flag(keys::USE_COMMIT_SIGNING),
            additional_permissions: parse_additional_permissions(
                config.get_or(keys::ADDITIONAL_PERMISSIONS, ""),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_commas_and_newlines() {
        assert_eq!(
            parse_multiline_input("Bash(git:*), Read\nWrite\r\n\nGlob"),
            vec!["Bash(git:*)", "Read", "Write", "Glob"]
        );
    }

    #[test]
    fn strips_comments_and_keeps_duplicates() {
        let parsed = parse_multiline_input("Edit # needed for fixes\nRead\nEdit\n# whole line\n");
        assert_eq!(parsed, vec!["Edit", "Read", "Edit"]);
        assert!(parsed.iter().all(|tool| !tool.contains("needed")));
    }

    #[test]
    fn reparsing_output_is_stable() {
        let first = parse_multiline_input("a, b # x\n c,,\nd#y\n#z");
        let second = parse_multiline_input(&first.join("\n"));
        assert_eq!(first, second);
        assert_eq!(first, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn lone_hash_is_not_a_comment() {
        assert_eq!(parse_multiline_input("a#"), vec!["a#"]);
    }

    #[test]
    fn additional_permissions_parse_pairs() {
        let parsed = parse_additional_permissions("a: b\nc: d");
        assert_eq!(
            parsed,
            BTreeMap::from([
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d".to_string()),
            ])
        );
    }

    #[test]
    fn additional_permissions_skip_malformed_lines() {
        assert!(parse_additional_permissions("badline").is_empty());
        assert!(parse_additional_permissions("").is_empty());
        let parsed = parse_additional_permissions("actions: read\n: nokey\nnovalue:\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("actions").map(String::as_str), Some("read"));
    }

    #[test]
    fn additional_permissions_split_on_first_colon() {
        let parsed = parse_additional_permissions("url: https://example.com");
        assert_eq!(
            parsed.get("url").map(String::as_str),
            Some("https://example.com")
        );
    }

    #[test]
    fn inputs_apply_defaults() {
        let inputs = Inputs::from_config(&ActionConfig::default(), ModeName::Tag);
        assert_eq!(inputs.trigger_phrase, "@claude");
        assert_eq!(inputs.branch_prefix, "claude/");
        assert_eq!(inputs.base_branch, None);
        assert!(!inputs.use_sticky_comment);
        assert!(inputs.allowed_tools.is_empty());
    }
}
