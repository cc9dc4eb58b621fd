//! Subcommand implementations.
//!
//! Handlers receive the translator built in `main` and write their output to
//! the given writer.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::cli::Command;
use crate::Translator;

/// Document upload, status and download.
pub mod document;

/// Glossary management.
pub mod glossaries;

/// Language listing.
pub mod languages;

/// Text translation.
pub mod translate;

/// Account usage.
pub mod usage;

pub async fn run(
    translator: &Translator,
    command: Command,
    verbose: u8,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Translate(args) => translate::run(translator, args, verbose, out).await,
        Command::Document { command } => document::run(translator, command, out).await,
        Command::Glossaries { command } => glossaries::run(translator, command, out).await,
        Command::Languages(args) => languages::run(translator, &args, verbose, out).await,
        Command::Usage => usage::run(translator, out).await,
    }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
