use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::StatusCode;

use crate::{
    decode::{decode_json, expect_status},
    endpoint::{path_segment, Endpoint},
    multipart::MultipartUpload,
    translate::require_lang,
    wire::DocumentKeyRequest,
    DeeplError, DocumentInfo, DocumentOptions, DocumentStatus, Result, Translator,
};

impl Translator {
    /// Uploads the file at `path` for translation into `target_lang`.
    ///
    /// The file is streamed from disk; a retried upload re-reads it from the
    /// start.
    pub async fn upload_document(
        &self,
        path: impl AsRef<Path>,
        target_lang: &str,
        options: &DocumentOptions,
    ) -> Result<DocumentInfo> {
        require_lang("target_lang", target_lang)?;

        let mut upload = MultipartUpload::new(path.as_ref(), "file");
        let filename = options
            .filename
            .clone()
            .unwrap_or_else(|| upload.filename().to_owned());
        if filename.is_empty() {
            return Err(DeeplError::InvalidOption {
                name: "filename",
                value: path.as_ref().display().to_string(),
            });
        }
        upload = upload
            .field("filename", filename)
            .field("target_lang", target_lang);
        if let Some(source_lang) = &options.source_lang {
            upload = upload.field("source_lang", source_lang.as_str());
        }
        if let Some(formality) = options.formality {
            upload = upload.field("formality", formality.as_str());
        }
        if let Some(glossary_id) = &options.glossary_id {
            upload = upload.field("glossary_id", glossary_id.as_str());
        }

        let content_type = upload.content_type();
        let endpoint =
            Endpoint::post("v2/document").with_stream(&content_type, Arc::new(upload))?;
        let response = self.dispatch(&endpoint).await?;
        decode_json(response, StatusCode::OK).await
    }

    pub async fn document_status(
        &self,
        document_id: &str,
        document_key: &str,
    ) -> Result<DocumentStatus> {
        let id = path_segment("document_id", document_id)?;
        let endpoint = Endpoint::post(format!("v2/document/{id}"))
            .with_json(&DocumentKeyRequest { document_key })?;
        let response = self.dispatch(&endpoint).await?;
        decode_json(response, StatusCode::OK).await
    }

    /// Streams the translated file.
    ///
    /// Only the request is retried; once bytes flow, a broken connection
    /// surfaces as an item error.
    pub async fn download_document(
        &self,
        document_id: &str,
        document_key: &str,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        let id = path_segment("document_id", document_id)?;
        let endpoint = Endpoint::post(format!("v2/document/{id}/result"))
            .with_json(&DocumentKeyRequest { document_key })?;
        let response = self.dispatch(&endpoint).await?;
        expect_status(&response, StatusCode::OK)?;
        Ok(response.bytes_stream().map_err(DeeplError::Transport))
    }
}
