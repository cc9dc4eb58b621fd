use std::io::Write;

use anyhow::Result;

use super::write_json;
use crate::Translator;

pub async fn run(translator: &Translator, out: &mut impl Write) -> Result<()> {
    let usage = translator.usage().await?;
    write_json(out, &usage)
}
