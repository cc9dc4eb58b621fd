use std::io::Write;

use anyhow::Result;

use crate::cli::args::LanguagesArgs;
use crate::{Language, LanguageType, Translator};

pub async fn run(
    translator: &Translator,
    args: &LanguagesArgs,
    verbose: u8,
    out: &mut impl Write,
) -> Result<()> {
    let language_type = args.resolved_type();
    let languages = translator.languages(language_type).await?;

    if verbose > 0 {
        let heading = match language_type {
            LanguageType::Source => "Source",
            LanguageType::Target => "Target",
        };
        writeln!(out, "{heading} languages available:")?;
    }
    write_languages(out, &languages)?;
    Ok(())
}

fn write_languages(out: &mut impl Write, languages: &[Language]) -> std::io::Result<()> {
    for language in languages {
        if language.supports_formality {
            writeln!(out, "{}: {} (supports formality)", language.code, language.name)?;
        } else {
            writeln!(out, "{}: {}", language.code, language.name)?;
        }
    }
    Ok(())
}
