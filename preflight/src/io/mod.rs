//! Side-effecting adapters used by the prepare pipeline.

pub mod config;
pub mod event;
pub mod git;
pub mod github;
pub mod outputs;
pub mod prompt;
pub mod settings;
pub mod token;
