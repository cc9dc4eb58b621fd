use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::StatusCode;

use crate::{
    decode::{decode_json, decode_text, encode_tsv, expect_status, parse_tsv},
    endpoint::{path_segment, Endpoint},
    translate::require_lang,
    wire::{CreateGlossaryRequest, GlossaryList, LanguagePairList},
    DeeplError, GlossaryEntry, GlossaryInfo, LanguagePair, Result, Translator,
};

impl Translator {
    pub async fn create_glossary(
        &self,
        name: &str,
        source_lang: &str,
        target_lang: &str,
        entries: &[GlossaryEntry],
    ) -> Result<GlossaryInfo> {
        if name.trim().is_empty() {
            return Err(DeeplError::InvalidOption {
                name: "name",
                value: name.to_owned(),
            });
        }
        require_lang("source_lang", source_lang)?;
        require_lang("target_lang", target_lang)?;
        if entries.is_empty() {
            return Err(DeeplError::InvalidOption {
                name: "entries",
                value: "at least one entry is required".to_owned(),
            });
        }

        let endpoint = Endpoint::post("v2/glossaries").with_json(&CreateGlossaryRequest {
            name,
            source_lang,
            target_lang,
            entries: encode_tsv(entries)?,
            entries_format: "tsv",
        })?;
        let response = self.dispatch(&endpoint).await?;
        decode_json(response, StatusCode::CREATED).await
    }

    pub async fn list_glossaries(&self) -> Result<Vec<GlossaryInfo>> {
        let response = self.dispatch(&Endpoint::get("v2/glossaries")).await?;
        let list: GlossaryList = decode_json(response, StatusCode::OK).await?;
        Ok(list.glossaries)
    }

    pub async fn glossary(&self, glossary_id: &str) -> Result<GlossaryInfo> {
        let id = path_segment("glossary_id", glossary_id)?;
        let response = self
            .dispatch(&Endpoint::get(format!("v2/glossaries/{id}")))
            .await?;
        decode_json(response, StatusCode::OK).await
    }

    pub async fn delete_glossary(&self, glossary_id: &str) -> Result<()> {
        let id = path_segment("glossary_id", glossary_id)?;
        let response = self
            .dispatch(&Endpoint::delete(format!("v2/glossaries/{id}")))
            .await?;
        expect_status(&response, StatusCode::NO_CONTENT)
    }

    pub async fn glossary_entries(&self, glossary_id: &str) -> Result<Vec<GlossaryEntry>> {
        let id = path_segment("glossary_id", glossary_id)?;
        let endpoint = Endpoint::get(format!("v2/glossaries/{id}/entries")).with_header(
            ACCEPT,
            HeaderValue::from_static("text/tab-separated-values"),
        );
        let response = self.dispatch(&endpoint).await?;
        let body = decode_text(response, StatusCode::OK).await?;
        parse_tsv(&body)
    }

    /// Language pairs glossaries can be created for.
    pub async fn glossary_language_pairs(&self) -> Result<Vec<LanguagePair>> {
        let response = self
            .dispatch(&Endpoint::get("v2/glossary-language-pairs"))
            .await?;
        let pairs: LanguagePairList = decode_json(response, StatusCode::OK).await?;
        Ok(pairs.supported_languages)
    }
}
