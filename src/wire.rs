use serde::{Deserialize, Serialize};

use crate::{GlossaryInfo, LanguagePair, Translation};

#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    pub translations: Vec<Translation>,
}

#[derive(Debug, Serialize)]
pub struct DocumentKeyRequest<'a> {
    pub document_key: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateGlossaryRequest<'a> {
    pub name: &'a str,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    pub entries: String,
    pub entries_format: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GlossaryList {
    pub glossaries: Vec<GlossaryInfo>,
}

#[derive(Debug, Deserialize)]
pub struct LanguagePairList {
    pub supported_languages: Vec<LanguagePair>,
}
