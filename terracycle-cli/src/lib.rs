//! terracycle CLI library
//!
//! The `terracycle` binary is a thin wrapper over these modules; keeping
//! them in a library lets integration tests drive command handlers
//! directly.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
