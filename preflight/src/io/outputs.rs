//! Step outputs, exported variables, and runner annotations.
//!
//! Outputs and exported variables are appended to the files named by
//! `GITHUB_OUTPUT` / `GITHUB_ENV` using the runner's heredoc syntax.
//! Annotations are workflow commands on stdout.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::warn;

use crate::core::config::{ActionConfig, keys};

/// Where the pipeline publishes its results.
pub trait OutputSink {
    fn set_output(&mut self, name: &str, value: &str) -> Result<()>;

    /// Make a variable visible to later workflow steps.
    fn export_variable(&mut self, name: &str, value: &str) -> Result<()>;

    fn warning(&mut self, message: &str);

    /// Mark the step failed. Exit status is the caller's job.
    fn set_failed(&mut self, message: &str);
}

/// [`OutputSink`] backed by the runner's command files.
pub struct ActionsOutputs {
    output_file: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

static DELIMITER_SEQ: AtomicU64 = AtomicU64::new(0);

impl ActionsOutputs {
    pub fn new(output_file: Option<PathBuf>, env_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
            env_file,
        }
    }

    pub fn from_config(config: &ActionConfig) -> Self {
        Self::new(
            config.non_empty(keys::OUTPUT_FILE).map(PathBuf::from),
            config.non_empty(keys::ENV_FILE).map(PathBuf::from),
        )
    }
}

impl OutputSink for ActionsOutputs {
    fn set_output(&mut self, name: &str, value: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => append_command_file(path, name, value),
            None => {
                warn!(name, "GITHUB_OUTPUT is not set, output dropped");
                Ok(())
            }
        }
    }

    fn export_variable(&mut self, name: &str, value: &str) -> Result<()> {
        match &self.env_file {
            Some(path) => append_command_file(path, name, value),
            None => {
                warn!(name, "GITHUB_ENV is not set, variable dropped");
                Ok(())
            }
        }
    }

    fn warning(&mut self, message: &str) {
        println!("::warning::{}", escape_data(message));
    }

    fn set_failed(&mut self, message: &str) {
        println!("::error::{}", escape_data(message));
    }
}

/// Render one `name<<delimiter` heredoc entry.
pub fn format_command_entry(name: &str, value: &str, delimiter: &str) -> String {
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

fn append_command_file(path: &Path, name: &str, value: &str) -> Result<()> {
    let delimiter = unique_delimiter(value);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(format_command_entry(name, value, &delimiter).as_bytes())
        .with_context(|| format!("write {name} to {}", path.display()))
}

fn unique_delimiter(value: &str) -> String {
    loop {
        let seq = DELIMITER_SEQ.fetch_add(1, Ordering::Relaxed);
        let candidate = format!("ghadelimiter_{}_{seq}", std::process::id());
        if !value.contains(&candidate) {
            return candidate;
        }
    }
}

/// Escape a workflow command message.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn outputs_use_heredoc_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = temp.path().join("output");
        let mut sink = ActionsOutputs::new(Some(out.clone()), None);
        sink.set_output("contains_trigger", "true").expect("set");
        sink.set_output("mcp_config", "{\n}").expect("set");

        let written = fs::read_to_string(&out).expect("read");
        let lines: Vec<&str> = written.lines().collect();
        assert!(lines[0].starts_with("contains_trigger<<ghadelimiter_"));
        assert_eq!(lines[1], "true");
        assert_eq!(lines[2], lines[0].trim_start_matches("contains_trigger<<"));
        assert!(lines[3].starts_with("mcp_config<<"));
        assert_eq!(&lines[4..6], &["{", "}"]);
    }

    #[test]
    fn missing_files_are_not_errors() {
        let mut sink = ActionsOutputs::new(None, None);
        sink.set_output("a", "b").expect("output");
        sink.export_variable("A", "b").expect("env");
    }

    #[test]
    fn escape_data_encodes_newlines_and_percent() {
        assert_eq!(escape_data("50%\nnext\r"), "50%25%0Anext%0D");
    }

    #[test]
    fn format_command_entry_shape() {
        assert_eq!(format_command_entry("K", "v", "EOF"), "K<<EOF\nv\nEOF\n");
    }
}
