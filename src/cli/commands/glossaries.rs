use std::borrow::Cow;
use std::io::Write;

use anyhow::Result;

use super::write_json;
use crate::cli::args::EntriesFormat;
use crate::cli::table::Table;
use crate::cli::GlossariesCommand;
use crate::{GlossaryEntry, GlossaryInfo, Translator};

pub async fn run(
    translator: &Translator,
    command: GlossariesCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        GlossariesCommand::LanguagePairs => {
            let pairs = translator.glossary_language_pairs().await?;
            write_json(out, &pairs)
        }
        GlossariesCommand::Create {
            name,
            source_lang,
            target_lang,
            entries,
        } => {
            let glossary = translator
                .create_glossary(&name, &source_lang, &target_lang, &entries)
                .await?;
            write_json(out, &glossary)
        }
        GlossariesCommand::List => {
            let glossaries = translator.list_glossaries().await?;
            glossary_table(&glossaries)?.write_to(out)?;
            Ok(())
        }
        GlossariesCommand::Info { ids } => {
            let mut glossaries = Vec::with_capacity(ids.len());
            for id in &ids {
                glossaries.push(translator.glossary(id).await?);
            }
            write_json(out, &glossaries)
        }
        GlossariesCommand::Entries { id, format } => {
            let entries = translator.glossary_entries(&id).await?;
            write_entries(out, &entries, format)?;
            Ok(())
        }
        GlossariesCommand::Delete { ids } => {
            // Deleted ids are printed even if a later deletion fails.
            let mut result = Ok(());
            for id in &ids {
                if let Err(err) = translator.delete_glossary(id).await {
                    result = Err(err.into());
                    break;
                }
                writeln!(out, "{id}")?;
            }
            result
        }
    }
}

fn glossary_table(glossaries: &[GlossaryInfo]) -> Result<Table> {
    let mut table = Table::new(["ID", "NAME", "SOURCE", "TARGET", "ENTRIES", "READY", "CREATED"]);
    for glossary in glossaries {
        table.add_row([
            glossary.glossary_id.clone(),
            glossary.name.clone(),
            glossary.source_lang.clone(),
            glossary.target_lang.clone(),
            glossary.entry_count.to_string(),
            glossary.ready.to_string(),
            glossary.creation_time.clone(),
        ])?;
    }
    Ok(table)
}

fn write_entries(
    out: &mut impl Write,
    entries: &[GlossaryEntry],
    format: EntriesFormat,
) -> std::io::Result<()> {
    let separator = format.separator();
    for entry in entries {
        match format {
            EntriesFormat::Tsv => writeln!(out, "{}{separator}{}", entry.source, entry.target)?,
            EntriesFormat::Csv => writeln!(
                out,
                "{}{separator}{}",
                csv_field(&entry.source),
                csv_field(&entry.target)
            )?,
        }
    }
    Ok(())
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
