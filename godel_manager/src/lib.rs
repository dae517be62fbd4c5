//! godel manager library
//!
//! Project discovery, the built-in default plugins and the command
//! implementations behind the `godel` binary.

pub mod commands;
pub mod defaults;
pub mod logging;
pub mod progress;
pub mod project;
