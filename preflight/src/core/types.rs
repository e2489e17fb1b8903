//! Shared deterministic types for the prepare pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mode used when the configuration does not name one.
pub const DEFAULT_MODE: &str = "tag";

/// Every registered mode name, in registry order.
pub const VALID_MODES: [&str; 3] = ["tag", "agent", "experimental-review"];

pub fn is_valid_mode(name: &str) -> bool {
    VALID_MODES.contains(&name)
}

/// Name of a registered execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeName {
    #[serde(rename = "tag")]
    Tag,
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "experimental-review")]
    Review,
}

impl ModeName {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "tag" => Some(Self::Tag),
            "agent" => Some(Self::Agent),
            "experimental-review" => Some(Self::Review),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Agent => "agent",
            Self::Review => "experimental-review",
        }
    }

    /// Capitalized label used in user-facing messages.
    pub fn title(self) -> &'static str {
        match self {
            Self::Tag => "Tag",
            Self::Agent => "Agent",
            Self::Review => "Review",
        }
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_valid_mode_parses_and_round_trips() {
        for name in VALID_MODES {
            let mode = ModeName::parse(name).expect("valid mode");
            assert_eq!(mode.as_str(), name);
        }
    }

    #[test]
    fn review_alias_is_not_registered() {
        assert_eq!(ModeName::parse("review"), None);
        assert_eq!(ModeName::parse("Tag"), None);
    }
}
