//=========================================================================
// Logging
//
// Everything in the crate logs through the `log` facade with a per
// subsystem target:
// - `pump`, `window`, `platform`
// - `fs_monitor`, `gl`, `app`
//
// This module only installs the `env_logger` backend.
//
//=========================================================================

mod init;

pub use init::{init_logging, LoggingConfig};
