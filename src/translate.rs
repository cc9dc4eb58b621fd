use reqwest::StatusCode;

use crate::{
    decode::decode_json, endpoint::Endpoint, wire::TranslateResponse, DeeplError, Result,
    TranslateOptions, Translation, Translator,
};

impl Translator {
    /// Translates `texts` into `target_lang`.
    ///
    /// Results come back in the order of `texts`.
    pub async fn translate_text<S: AsRef<str>>(
        &self,
        texts: &[S],
        target_lang: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<Translation>> {
        if texts.is_empty() {
            return Err(DeeplError::InvalidOption {
                name: "text",
                value: "at least one text is required".to_owned(),
            });
        }
        require_lang("target_lang", target_lang)?;

        let endpoint =
            Endpoint::post("v2/translate").with_form(options.encode_form(texts, target_lang));
        let response = self.dispatch(&endpoint).await?;
        let decoded: TranslateResponse = decode_json(response, StatusCode::OK).await?;
        Ok(decoded.translations)
    }
}

pub(crate) fn require_lang(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DeeplError::InvalidOption {
            name,
            value: value.to_owned(),
        });
    }
    Ok(())
}
