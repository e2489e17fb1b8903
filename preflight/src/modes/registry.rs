//! Mode registry: name -> mode, plus the one structural compatibility rule.
//!
//! Tag mode on an automation event is rejected outright because its trigger
//! and tracking comment need an addressable entity. Every other mismatch
//! (e.g. Review on an issue) is expressed by `should_trigger` returning false.

use crate::core::context::Context;
use crate::core::types::ModeName;
use crate::error::PrepareError;
use crate::modes::Mode;
use crate::modes::agent::AgentMode;
use crate::modes::review::ReviewMode;
use crate::modes::tag::TagMode;

pub use crate::core::types::{VALID_MODES, is_valid_mode};

static TAG: TagMode = TagMode;
static AGENT: AgentMode = AgentMode;
static REVIEW: ReviewMode = ReviewMode;

/// Every registered mode, in registry order.
pub fn all_modes() -> [&'static dyn Mode; 3] {
    [&TAG, &AGENT, &REVIEW]
}

/// Resolve a mode by name and check it can handle `context`.
pub fn get_mode(name: &str, context: &Context) -> Result<&'static dyn Mode, PrepareError> {
    let mode = all_modes()
        .into_iter()
        .find(|mode| mode.name().as_str() == name)
        .ok_or_else(|| PrepareError::InvalidMode {
            name: name.to_string(),
        })?;

    if mode.name() == ModeName::Tag && context.is_automation() {
        return Err(PrepareError::IncompatibleMode {
            mode: mode.name(),
            event: context.event_name(),
        });
    }

    Ok(mode)
}
