use reqwest::StatusCode;

use crate::{
    decode::decode_json, endpoint::Endpoint, Language, LanguageType, Result, Translator, Usage,
};

impl Translator {
    /// Languages supported as translation source or target.
    pub async fn languages(&self, language_type: LanguageType) -> Result<Vec<Language>> {
        let endpoint = Endpoint::get(format!("v2/languages?type={}", language_type.as_str()));
        let response = self.dispatch(&endpoint).await?;
        decode_json(response, StatusCode::OK).await
    }

    /// Character and document usage of the current billing period.
    pub async fn usage(&self) -> Result<Usage> {
        let response = self.dispatch(&Endpoint::get("v2/usage")).await?;
        decode_json(response, StatusCode::OK).await
    }
}
