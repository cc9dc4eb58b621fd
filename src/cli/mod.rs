//! Command-line interface of the `deepl` binary.

/// CLI argument parsing with clap.
pub mod args;

/// Subcommand implementations.
pub mod commands;

/// Logging setup.
pub mod logging;

/// Aligned plain-text tables.
pub mod table;

pub use args::{Args, Command, DocumentCommand, GlossariesCommand};
pub use logging::init_logging;
