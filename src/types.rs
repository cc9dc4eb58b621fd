use serde::{Deserialize, Serialize};

/// One translated text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub detected_source_language: String,
    pub text: String,
}

/// Handle of an uploaded document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub document_key: String,
}

/// Progress of a document translation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub document_id: String,
    /// `queued`, `translating`, `done` or `error`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billed_characters: Option<u64>,
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DocumentStatus {
    pub fn is_done(&self) -> bool {
        self.status == "done"
    }
}

/// Account usage and limits. Document and team counters are only reported
/// for some plans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub character_count: u64,
    pub character_limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_document_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_document_limit: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    #[serde(rename = "language")]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub supports_formality: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryInfo {
    pub glossary_id: String,
    pub name: String,
    pub ready: bool,
    pub source_lang: String,
    pub target_lang: String,
    pub creation_time: String,
    pub entry_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
}

impl GlossaryEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
