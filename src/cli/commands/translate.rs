use std::io::Write;

use anyhow::Result;

use super::write_json;
use crate::cli::args::TranslateArgs;
use crate::{TranslateOptions, Translator};

pub async fn run(
    translator: &Translator,
    args: TranslateArgs,
    verbose: u8,
    out: &mut impl Write,
) -> Result<()> {
    let options = TranslateOptions {
        source_lang: args.source_lang,
        split_sentences: args.split_sentences,
        preserve_formatting: args.preserve_formatting.then_some(true),
        formality: args.formality,
        glossary_id: args.glossary_id,
        tag_handling: args.tag_handling,
        outline_detection: args.outline_detection,
        non_splitting_tags: args.non_splitting_tags,
        splitting_tags: args.splitting_tags,
        ignore_tags: args.ignore_tags,
    };

    let translations = translator
        .translate_text(&args.texts, &args.target_lang, &options)
        .await?;

    if args.json {
        return write_json(out, &translations);
    }
    for translation in &translations {
        if verbose > 0 {
            writeln!(
                out,
                "# Detected source language: {}",
                translation.detected_source_language
            )?;
        }
        writeln!(out, "{}", translation.text)?;
    }
    Ok(())
}
