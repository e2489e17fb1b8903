//! Agent settings file setup (`~/.claude/settings.json`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

/// Key that must always be enabled so project MCP servers load without a prompt.
pub const ENABLE_PROJECT_MCP_KEY: &str = "enableAllProjectMcpServers";

/// Merge `input` into `<home>/.claude/settings.json` and copy slash commands.
///
/// `input` is either inline JSON or a path to a JSON file; blank input only
/// enforces [`ENABLE_PROJECT_MCP_KEY`]. Existing keys survive unless the
/// input replaces them.
#[instrument(skip_all, fields(home = %home.display()))]
pub fn setup_agent_settings(
    input: Option<&str>,
    home: &Path,
    slash_commands: Option<&Path>,
) -> Result<PathBuf> {
    let claude_dir = home.join(".claude");
    fs::create_dir_all(&claude_dir)
        .with_context(|| format!("create directory {}", claude_dir.display()))?;
    let settings_path = claude_dir.join("settings.json");

    let mut settings = read_existing(&settings_path)?;
    if let Some(input) = input.map(str::trim).filter(|input| !input.is_empty()) {
        let incoming = parse_input(input)?;
        settings.extend(incoming);
    }
    settings.insert(ENABLE_PROJECT_MCP_KEY.to_string(), Value::Bool(true));

    let mut buf = serde_json::to_string_pretty(&Value::Object(settings))
        .context("serialize settings json")?;
    buf.push('\n');
    fs::write(&settings_path, buf)
        .with_context(|| format!("write {}", settings_path.display()))?;
    info!(path = %settings_path.display(), "wrote agent settings");

    if let Some(dir) = slash_commands {
        copy_slash_commands(dir, &claude_dir)?;
    }
    Ok(settings_path)
}

fn read_existing(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    match serde_json::from_str(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => bail!("{} does not contain a JSON object", path.display()),
        Err(err) => Err(err).with_context(|| format!("parse {}", path.display())),
    }
}

fn parse_input(input: &str) -> Result<Map<String, Value>> {
    let value: Value = if input.starts_with('{') {
        serde_json::from_str(input).context("parse settings JSON")?
    } else {
        let path = Path::new(input);
        let contents =
            fs::read_to_string(path).with_context(|| format!("read settings {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parse settings {}", path.display()))?
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("settings must be a JSON object"),
    }
}

/// Copy `*.md` files from `dir` into `dest`. A missing or non-directory path is
/// ignored.
fn copy_slash_commands(dir: &Path, dest: &Path) -> Result<()> {
    if !dir.is_dir() {
        debug!(path = %dir.display(), "slash commands path is not a directory, skipping");
        return Ok(());
    }
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("read entry in {}", dir.display()))?
            .path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("md") {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = dest.join(name);
        fs::copy(&path, &target)
            .with_context(|| format!("copy {} to {}", path.display(), target.display()))?;
        debug!(command = %target.display(), "copied slash command");
    }
    Ok(())
}
