//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Verification error - the destination failed one or more checks
pub const VERIFY_ERROR: i32 = 3;

/// IO error - destination missing, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Configuration error - unreadable or invalid settings (sysexits.h EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;
