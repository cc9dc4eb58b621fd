use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::{classify::status_error, DeeplError, GlossaryEntry, Result};

/// Rejects any status other than `expected`.
///
/// The dispatcher only hands back 2xx responses, but endpoints document one
/// exact code (201 on create, 204 on delete) and anything else is an error.
pub(crate) fn expect_status(response: &reqwest::Response, expected: StatusCode) -> Result<()> {
    let status = response.status();
    if status == expected {
        Ok(())
    } else {
        Err(status_error(status))
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<T> {
    expect_status(&response, expected)?;
    let bytes = response.bytes().await.map_err(DeeplError::Transport)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| DeeplError::Decode(format!("invalid response JSON: {err}")))
}

pub(crate) async fn decode_text(response: reqwest::Response, expected: StatusCode) -> Result<String> {
    expect_status(&response, expected)?;
    response.text().await.map_err(DeeplError::Transport)
}

/// Encodes entries as `source<TAB>target` lines.
pub(crate) fn encode_tsv(entries: &[GlossaryEntry]) -> Result<String> {
    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        for (name, value) in [("source", &entry.source), ("target", &entry.target)] {
            if value.is_empty() || value.contains(['\t', '\n', '\r']) {
                return Err(DeeplError::InvalidOption {
                    name: "glossary entry",
                    value: format!("{name} {value:?}"),
                });
            }
        }
        lines.push(format!("{}\t{}", entry.source, entry.target));
    }
    Ok(lines.join("\n"))
}

pub(crate) fn parse_tsv(body: &str) -> Result<Vec<GlossaryEntry>> {
    body.lines()
        .map(|line| line.trim_end_matches('\r'))
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(index, line)| {
            let (source, target) = line.split_once('\t').ok_or_else(|| {
                DeeplError::Decode(format!(
                    "glossary entry on line {} has no tab separator",
                    index + 1
                ))
            })?;
            Ok(GlossaryEntry::new(source, target))
        })
        .collect()
}
