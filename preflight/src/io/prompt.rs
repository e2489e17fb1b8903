//! Prompt rendering and the prompt file handed to the agent.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::Environment;
use serde::Serialize;
use tracing::debug;

const TAG_TEMPLATE: &str = include_str!("prompts/tag.md");
const REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Tag,
    Review,
}

impl Template {
    fn name(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Review => "review",
        }
    }
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(Template::Tag.name(), TAG_TEMPLATE)
            .context("tag prompt template")?;
        env.add_template(Template::Review.name(), REVIEW_TEMPLATE)
            .context("review prompt template")?;
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, template: Template, view: &S) -> Result<String> {
        let rendered = self
            .env
            .get_template(template.name())?
            .render(view)
            .with_context(|| format!("render {} prompt", template.name()))?;
        Ok(collapse_blank_runs(&rendered))
    }
}

/// Collapse runs of 3+ newlines left behind by skipped template blocks.
fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(ch);
    }
    out.trim().to_string()
}

/// Write the prompt to `<dir>/claude-prompt.txt`, creating `dir` as needed.
pub fn write_prompt_file(dir: &Path, prompt: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    let path = dir.join("claude-prompt.txt");
    fs::write(&path, prompt).with_context(|| format!("write prompt {}", path.display()))?;
    debug!(path = %path.display(), bytes = prompt.len(), "wrote prompt file");
    Ok(path)
}
