//! Fatal error classes surfaced by the prepare pipeline.
//!
//! Everything else travels as `anyhow::Error` with context attached at the I/O
//! boundary. These variants exist so callers (and tests) can tell the classes
//! apart with `downcast_ref` while the exit point still only needs a message.

use thiserror::Error;

use crate::core::event::EventName;
use crate::core::types::{ModeName, VALID_MODES};

#[derive(Debug, Error)]
pub enum PrepareError {
    /// Configured mode is not one of [`VALID_MODES`].
    #[error(
        "Invalid mode '{name}'. Valid modes are: '{valid}'. Please check your workflow configuration.",
        valid = VALID_MODES.join("', '")
    )]
    InvalidMode { name: String },

    /// Missing or unusable configuration (e.g. a required token).
    #[error("{0}")]
    Config(String),

    #[error("Actor does not have write permissions to the repository")]
    Permission { actor: String },

    /// The registry refuses a mode/event pairing that cannot work structurally.
    #[error(
        "{title} mode cannot handle {event} events. Use 'agent' mode for automation events.",
        title = .mode.title()
    )]
    IncompatibleMode { mode: ModeName, event: EventName },

    #[error("Unsupported event type: {0}")]
    UnsupportedEvent(String),

    /// An entity payload is missing the fields its event name promises.
    #[error("malformed {event} payload: {source}")]
    MalformedPayload {
        event: EventName,
        source: serde_json::Error,
    },
}
