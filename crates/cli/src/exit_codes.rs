//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of the
//! shell contract — scripts rely on them.
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | io/data          | File and dataset codes                   |
//! | 10-19   | ai               | Planner/provider codes                   |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// File I/O error - missing or unreadable files.
pub const EXIT_IO_ERROR: u8 = 3;

/// Planner API key missing.
pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// Planner call failed (network, API error).
pub const EXIT_AI_CALL_FAILED: u8 = 12;
