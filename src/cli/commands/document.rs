use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use super::write_json;
use crate::cli::DocumentCommand;
use crate::{DocumentInfo, DocumentOptions, Translator};

#[derive(Debug, Serialize)]
struct UploadedDocument {
    document_path: PathBuf,
    #[serde(flatten)]
    info: DocumentInfo,
}

pub async fn run(
    translator: &Translator,
    command: DocumentCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        DocumentCommand::Upload {
            paths,
            target_lang,
            source_lang,
            formality,
            glossary_id,
        } => {
            let options = DocumentOptions {
                source_lang,
                formality,
                glossary_id,
                filename: None,
            };
            // Uploads that succeeded are still reported when a later one fails.
            let mut uploaded = Vec::with_capacity(paths.len());
            let mut failure = None;
            for path in paths {
                match translator.upload_document(&path, &target_lang, &options).await {
                    Ok(info) => uploaded.push(UploadedDocument {
                        document_path: path,
                        info,
                    }),
                    Err(err) => {
                        failure = Some(
                            anyhow::Error::new(err)
                                .context(format!("could not upload {}", path.display())),
                        );
                        break;
                    }
                }
            }
            write_json(out, &uploaded)?;
            failure.map_or(Ok(()), Err)
        }
        DocumentCommand::Status { documents } => {
            let mut statuses = Vec::with_capacity(documents.len());
            for document in &documents {
                statuses.push(translator.document_status(&document.id, &document.key).await?);
            }
            write_json(out, &statuses)
        }
        DocumentCommand::Download { document, output } => {
            let mut chunks = Box::pin(
                translator
                    .download_document(&document.id, &document.key)
                    .await?,
            );
            match output {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("could not create {}", path.display()))?;
                    while let Some(chunk) = chunks.next().await {
                        file.write_all(&chunk?).await?;
                    }
                    file.flush().await?;
                    tracing::info!(path = %path.display(), "document saved");
                }
                None => {
                    while let Some(chunk) = chunks.next().await {
                        out.write_all(&chunk?)?;
                    }
                    out.flush()?;
                }
            }
            Ok(())
        }
    }
}
