//! Deterministic, pure logic shared by the prepare pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (captured configuration, already-loaded payloads) and return
//! deterministic outputs suitable for tests.

pub mod config;
pub mod context;
pub mod event;
pub mod inputs;
pub mod mcp;
pub mod normalize;
pub mod tools;
pub mod trigger;
pub mod types;
