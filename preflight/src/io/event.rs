//! Loading the triggering event from the runner.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::config::{ActionConfig, keys};
use crate::core::normalize::RawEvent;

/// Read `GITHUB_EVENT_PATH` (if any) and pair it with the runner metadata.
///
/// A missing payload path yields an empty object; automation events carry
/// little payload and local runs often have none.
pub fn load_event(config: &ActionConfig) -> Result<RawEvent> {
    let payload = match config.non_empty(keys::EVENT_PATH) {
        Some(path) => read_payload(Path::new(path))?,
        None => Value::Object(Default::default()),
    };
    Ok(RawEvent::from_config(config, payload)?)
}

fn read_payload(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read event {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse event {}", path.display()))
}
