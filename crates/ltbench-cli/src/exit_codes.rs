//! Exit codes for `ltbench`. Part of the CLI contract.

pub const SUCCESS: i32 = 0;
pub const COMMAND_FAILED: i32 = 1; // A step exited non-zero or was skipped
pub const CONFIG_ERROR: i32 = 2; // Bad arguments/config, or a child could not be spawned
