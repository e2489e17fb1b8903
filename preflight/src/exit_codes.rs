//! Stable exit codes for preflight CLI commands.

/// Command succeeded. A run that decided not to trigger also exits with this code.
pub const OK: i32 = 0;
/// Any fatal error: invalid configuration, missing token, permission denied,
/// incompatible mode, unsupported event, or a failed collaborator call.
pub const FAILED: i32 = 1;
